use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One error from the diagnostic set, de-identified.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorRecord {
    /// Compiler error code, or "Syntax" for codes outside the convention.
    pub code: String,
    /// Truncated hash of the diagnostic message.
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// First related-information message matching a known suggestion
    /// pattern, empty when none matched.
    pub hint: String,
    pub range: LineRange,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

/// One capture cycle's worth of diagnostics for the active document.
/// Every free-text field is hashed before it gets here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureEntry {
    pub file: String,
    pub workspace: String,
    pub seconds: String,
    pub revis: bool,
    pub length: u32,
    pub numfiles: usize,
    pub errors: Vec<ErrorRecord>,
}

/// Marks a document save while logging is active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveRecord {
    pub file: String,
    #[serde(rename = "savedAt")]
    pub saved_at: String,
}

/// First line of a freshly created rotation file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLogHeader {
    pub user: String,
    pub revis: bool,
}

/// First appended line when an existing rotation file is reopened after
/// a restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadHeader {
    pub reload: String,
    pub revis: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyRecord {
    pub survey: String,
}

/// Seconds since the enrollment anchor, fixed 3-decimal precision.
pub fn elapsed_stamp(start_secs: i64, now: DateTime<Utc>) -> String {
    let now_secs = now.timestamp_millis() as f64 / 1000.0;
    let elapsed = (now_secs - start_secs as f64).max(0.0);
    format!("{elapsed:.3}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn elapsed_stamp_has_three_decimals() {
        let now = Utc.timestamp_millis_opt(1_000_500).unwrap();
        assert_eq!(elapsed_stamp(0, now), "1000.500");
    }

    #[test]
    fn elapsed_stamp_never_goes_negative() {
        let now = Utc.timestamp_opt(100, 0).unwrap();
        assert_eq!(elapsed_stamp(200, now), "0.000");
    }

    #[test]
    fn error_record_omits_absent_source() {
        let record = ErrorRecord {
            code: "E0502".into(),
            msg: "deadbeef".into(),
            source: None,
            hint: String::new(),
            range: LineRange { start: 3, end: 3 },
        };
        let line = serde_json::to_string(&record).unwrap();
        assert!(!line.contains("source"));
    }

    #[test]
    fn save_record_uses_camel_case_key() {
        let record = SaveRecord {
            file: "cafebabe".into(),
            saved_at: "12.000".into(),
        };
        let line = serde_json::to_string(&record).unwrap();
        assert!(line.contains("\"savedAt\":\"12.000\""));
    }
}
