use std::{
    fs::{self, File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{anyhow, bail, Context, Result};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::models::{NewLogHeader, ReloadHeader, SurveyRecord};

static ROTATION_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^log\d+\.json$").expect("valid rotation file pattern"));

/// Derives the index for the next rotation file from a directory listing.
///
/// Pure and idempotent: a restart that re-scans the directory lands on the
/// same index the in-memory counter would have produced. Foreign files
/// (uuid.txt, settings.json, state.json) never match.
pub fn derive_next_index<'a>(names: impl IntoIterator<Item = &'a str>) -> usize {
    names
        .into_iter()
        .filter(|name| ROTATION_FILE.is_match(name))
        .count()
}

struct LogWriter {
    path: PathBuf,
    file: File,
    /// Records written to this rotation file since its creation,
    /// provenance header included.
    line_count: usize,
}

/// Append-only, rotating, line-counted JSON-lines files on local storage.
///
/// At most one file is open for append at a time; older rotation files are
/// immutable and eligible for upload. Append and rotate share one mutex so
/// no interleaved write can ever split a line.
pub struct LogStore {
    dir: PathBuf,
    rotation_threshold: usize,
    writer: Mutex<Option<LogWriter>>,
}

impl LogStore {
    pub fn new(dir: PathBuf, rotation_threshold: usize) -> Self {
        Self {
            dir,
            rotation_threshold,
            writer: Mutex::new(None),
        }
    }

    /// Create the next rotation file. Its first line records provenance:
    /// the participant id this log belongs to.
    pub fn open_new(&self, user_id: &str, feature_enabled: bool) -> Result<()> {
        let mut guard = self.writer.lock().unwrap();
        let index = derive_next_index_in(&self.dir)?;
        let path = self.dir.join(format!("log{index}.json"));
        let file = File::create(&path)
            .with_context(|| format!("failed to create log file {}", path.display()))?;

        let mut writer = LogWriter {
            path,
            file,
            line_count: 0,
        };
        write_line(
            &mut writer,
            &NewLogHeader {
                user: user_id.to_string(),
                revis: feature_enabled,
            },
        )?;

        info!("opened log file {} at index {index}", writer.path.display());
        *guard = Some(writer);
        Ok(())
    }

    /// Reopen the latest rotation file after a restart, recovering the
    /// line counter by scan and marking the session reload. Creates
    /// log0.json when the directory has no rotation files yet.
    pub fn open_existing(&self, feature_enabled: bool, elapsed: &str) -> Result<()> {
        let mut guard = self.writer.lock().unwrap();
        let next = derive_next_index_in(&self.dir)?;
        let index = next.checked_sub(1);

        let (path, existing_lines) = match index {
            Some(index) => {
                let path = self.dir.join(format!("log{index}.json"));
                let contents = fs::read_to_string(&path)
                    .with_context(|| format!("failed to read log file {}", path.display()))?;
                (path, contents.lines().count())
            }
            None => (self.dir.join("log0.json"), 0),
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to reopen log file {}", path.display()))?;

        let mut writer = LogWriter {
            path,
            file,
            line_count: existing_lines,
        };
        write_line(
            &mut writer,
            &ReloadHeader {
                reload: elapsed.to_string(),
                revis: feature_enabled,
            },
        )?;

        info!(
            "reopened log file {} with {} existing lines",
            writer.path.display(),
            existing_lines
        );
        *guard = Some(writer);
        Ok(())
    }

    /// Serialize one record and append it as a single line. Returns the
    /// line as written so callers can echo it to the live-tail output.
    pub fn append<T: Serialize>(&self, record: &T) -> Result<String> {
        let mut guard = self.writer.lock().unwrap();
        let writer = guard
            .as_mut()
            .ok_or_else(|| anyhow!("log store is not open"))?;
        write_line(writer, record)
    }

    /// Append a survey response to the current rotation file without
    /// advancing the flush counter.
    pub fn append_survey(&self, text: &str) -> Result<()> {
        let mut guard = self.writer.lock().unwrap();
        let writer = guard
            .as_mut()
            .ok_or_else(|| anyhow!("log store is not open"))?;
        let line = serde_json::to_string(&SurveyRecord {
            survey: text.to_string(),
        })?;
        writer
            .file
            .write_all(format!("{line}\n").as_bytes())
            .and_then(|()| writer.file.flush())
            .with_context(|| format!("failed to append to {}", writer.path.display()))
    }

    /// Close the full file and start the next one. Only called from the
    /// flush path so the flushed file is never the one being written.
    pub fn rotate(&self, user_id: &str, feature_enabled: bool) -> Result<()> {
        if !self.is_open() {
            bail!("cannot rotate a closed log store");
        }
        self.open_new(user_id, feature_enabled)
    }

    pub fn is_open(&self) -> bool {
        self.writer.lock().unwrap().is_some()
    }

    pub fn line_count(&self) -> usize {
        self.writer
            .lock()
            .unwrap()
            .as_ref()
            .map(|writer| writer.line_count)
            .unwrap_or(0)
    }

    pub fn needs_rotation(&self) -> bool {
        self.line_count() >= self.rotation_threshold
    }

    pub fn current_path(&self) -> Option<PathBuf> {
        self.writer
            .lock()
            .unwrap()
            .as_ref()
            .map(|writer| writer.path.clone())
    }

    /// Entire content of the current rotation file, for batched upload.
    pub fn read_current(&self) -> Result<String> {
        let path = self
            .current_path()
            .ok_or_else(|| anyhow!("log store is not open"))?;
        fs::read_to_string(&path)
            .with_context(|| format!("failed to read log file {}", path.display()))
    }

    pub fn close(&self) {
        *self.writer.lock().unwrap() = None;
    }
}

fn write_line<T: Serialize>(writer: &mut LogWriter, record: &T) -> Result<String> {
    let line = serde_json::to_string(record)?;
    writer
        .file
        .write_all(format!("{line}\n").as_bytes())
        .and_then(|()| writer.file.flush())
        .with_context(|| format!("failed to append to {}", writer.path.display()))?;
    writer.line_count += 1;
    Ok(line)
}

fn derive_next_index_in(dir: &Path) -> Result<usize> {
    let mut names = Vec::new();
    let entries = fs::read_dir(dir)
        .with_context(|| format!("failed to read log directory {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        if let Ok(name) = entry.file_name().into_string() {
            names.push(name);
        }
    }
    Ok(derive_next_index(names.iter().map(String::as_str)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SaveRecord;

    #[test]
    fn next_index_counts_only_rotation_files() {
        assert_eq!(derive_next_index(std::iter::empty::<&str>()), 0);
        assert_eq!(derive_next_index(["log0.json", "log1.json"]), 2);
        assert_eq!(
            derive_next_index(["log0.json", "uuid.txt", "settings.json", "state.json"]),
            1
        );
        assert_eq!(derive_next_index(["log.json", "mylog3.json", "log2.txt"]), 0);
    }

    #[test]
    fn open_new_writes_provenance_header() {
        let dir = tempfile::tempdir().unwrap();
        let store = LogStore::new(dir.path().to_path_buf(), 1000);
        store.open_new("abc123", true).unwrap();

        let contents = fs::read_to_string(dir.path().join("log0.json")).unwrap();
        assert_eq!(contents, "{\"user\":\"abc123\",\"revis\":true}\n");
        assert_eq!(store.line_count(), 1);
    }

    #[test]
    fn append_increments_counter_and_returns_line() {
        let dir = tempfile::tempdir().unwrap();
        let store = LogStore::new(dir.path().to_path_buf(), 1000);
        store.open_new("abc123", true).unwrap();

        let line = store
            .append(&SaveRecord {
                file: "cafebabe".into(),
                saved_at: "1.000".into(),
            })
            .unwrap();
        assert!(line.contains("cafebabe"));
        assert_eq!(store.line_count(), 2);

        let contents = fs::read_to_string(store.current_path().unwrap()).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn append_fails_when_closed() {
        let dir = tempfile::tempdir().unwrap();
        let store = LogStore::new(dir.path().to_path_buf(), 1000);
        assert!(store
            .append(&SaveRecord {
                file: "x".into(),
                saved_at: "0.000".into(),
            })
            .is_err());
    }

    #[test]
    fn reopen_recovers_counter_and_marks_reload() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = LogStore::new(dir.path().to_path_buf(), 1000);
            store.open_new("abc123", true).unwrap();
            store
                .append(&SaveRecord {
                    file: "cafebabe".into(),
                    saved_at: "1.000".into(),
                })
                .unwrap();
        }

        let store = LogStore::new(dir.path().to_path_buf(), 1000);
        store.open_existing(false, "42.000").unwrap();
        // 2 recovered lines + the reload marker
        assert_eq!(store.line_count(), 3);
        assert_eq!(store.current_path().unwrap(), dir.path().join("log0.json"));

        let contents = fs::read_to_string(dir.path().join("log0.json")).unwrap();
        let last = contents.lines().last().unwrap();
        assert_eq!(last, "{\"reload\":\"42.000\",\"revis\":false}");
    }

    #[test]
    fn reopen_with_empty_directory_starts_log0() {
        let dir = tempfile::tempdir().unwrap();
        let store = LogStore::new(dir.path().to_path_buf(), 1000);
        store.open_existing(true, "0.000").unwrap();
        assert_eq!(store.current_path().unwrap(), dir.path().join("log0.json"));
        assert_eq!(store.line_count(), 1);
    }

    #[test]
    fn rotation_moves_to_next_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = LogStore::new(dir.path().to_path_buf(), 1000);
        store.open_new("abc123", true).unwrap();
        store.rotate("abc123", true).unwrap();
        assert_eq!(store.current_path().unwrap(), dir.path().join("log1.json"));
        assert_eq!(store.line_count(), 1);
        assert!(dir.path().join("log0.json").exists());
    }

    #[test]
    fn survey_append_skips_the_counter() {
        let dir = tempfile::tempdir().unwrap();
        let store = LogStore::new(dir.path().to_path_buf(), 1000);
        store.open_new("abc123", true).unwrap();
        store.append_survey("loved it").unwrap();

        assert_eq!(store.line_count(), 1);
        let contents = fs::read_to_string(store.current_path().unwrap()).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains("\"survey\":\"loved it\""));
    }
}
