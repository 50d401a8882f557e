//! Consent-gated diagnostic telemetry core for the SALT study.
//!
//! The editor glue constructs a [`TelemetrySession`] at activation and
//! forwards diagnostic/save events into it; everything else (consent
//! gating, debouncing, de-identification, log rotation, batched upload)
//! happens in here.

pub mod capture;
pub mod config;
pub mod enrollment;
pub mod hash;
pub mod host;
pub mod logstore;
pub mod models;
pub mod session;
pub mod settings;
pub mod upload;
pub mod utils;

pub use capture::CapturePipeline;
pub use config::TelemetryConfig;
pub use enrollment::{EnrollmentController, EnrollmentRecord, ParticipationStatus};
pub use hash::hash_str;
pub use host::{EditorHost, TelemetryTransport};
pub use logstore::LogStore;
pub use models::{
    CaptureEntry, Diagnostic, DiagnosticCode, DocumentSnapshot, ErrorRecord, RelatedInfo, Severity,
};
pub use session::TelemetrySession;
pub use settings::SettingsStore;
pub use upload::UploadScheduler;
pub use utils::init_logging;
