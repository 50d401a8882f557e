use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

/// Shape of a diagnostic's code field as reported by the editor.
///
/// Language servers attach codes in several shapes; only the structured
/// form carries a stable error-code string we can log. The capture
/// pipeline matches on this exhaustively instead of probing at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticCode {
    /// A structured code object with a string value, e.g. "E0502".
    Structured(String),
    /// A bare number or string attached directly to the diagnostic.
    Primitive(String),
    /// No code at all.
    Absent,
}

impl DiagnosticCode {
    pub fn structured_value(&self) -> Option<&str> {
        match self {
            DiagnosticCode::Structured(value) => Some(value),
            DiagnosticCode::Primitive(_) | DiagnosticCode::Absent => None,
        }
    }
}

/// A related-information message attached to a diagnostic, typically a
/// compiler suggestion pointing at another span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedInfo {
    pub message: String,
}

/// Point-in-time snapshot of one diagnostic as read from the host.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub source: Option<String>,
    pub message: String,
    pub range_start_line: u32,
    pub range_end_line: u32,
    pub related_information: Vec<RelatedInfo>,
}

/// Everything the pipeline needs to know about the active document,
/// read at event time.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    /// Editor-side identifier for the document (a path or URI). Only ever
    /// logged in hashed form.
    pub uri: String,
    pub language_id: String,
    pub line_count: u32,
    pub workspace_name: String,
}
