use std::{fs, path::PathBuf};

use anyhow::{Context, Result};

use super::record::EnrollmentRecord;

/// Durable home of the enrollment record, one JSON file per installation.
///
/// A missing or unreadable file yields a default (Unset) record; failure
/// to write is surfaced to the caller and is fatal to pipeline activation
/// for the session.
pub struct EnrollmentStore {
    path: PathBuf,
}

impl EnrollmentStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load(&self) -> EnrollmentRecord {
        if !self.path.exists() {
            return EnrollmentRecord::default();
        }
        match fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
            Err(_) => EnrollmentRecord::default(),
        }
    }

    pub fn save(&self, record: &EnrollmentRecord) -> Result<()> {
        let serialized = serde_json::to_string_pretty(record)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("failed to write enrollment state to {}", self.path.display()))
    }
}
