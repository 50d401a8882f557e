pub mod diagnostic;
pub mod record;

pub use diagnostic::{Diagnostic, DiagnosticCode, DocumentSnapshot, RelatedInfo, Severity};
pub use record::{
    elapsed_stamp, CaptureEntry, ErrorRecord, LineRange, NewLogHeader, ReloadHeader, SaveRecord,
    SurveyRecord,
};
