use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserSettings {
    /// Mirror of the user-facing error-logging toggle. Capture only runs
    /// while this is on and the installation is enrolled.
    error_logging: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            error_logging: false,
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn error_logging(&self) -> bool {
        self.data.read().unwrap().error_logging
    }

    pub fn set_error_logging(&self, enabled: bool) -> Result<()> {
        {
            let mut guard = self.data.write().unwrap();
            guard.error_logging = enabled;
            self.persist(&guard)?;
        }
        Ok(())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
