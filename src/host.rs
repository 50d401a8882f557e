use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Diagnostic, DocumentSnapshot};

/// Capabilities the core needs from the embedding editor.
///
/// The editor glue implements this over its own APIs; the core never
/// touches the editor directly, which keeps every host interaction
/// mockable in tests.
#[async_trait]
pub trait EditorHost: Send + Sync {
    /// Point-in-time snapshot of the diagnostics for one document.
    fn diagnostics(&self, document_uri: &str) -> Vec<Diagnostic>;

    /// Count of workspace files matching a glob, used as a scope-size
    /// proxy. May suspend while the editor scans.
    async fn count_files_matching(&self, glob: &str) -> Result<usize>;

    /// Ask the front-end to render the consent form. The answer comes
    /// back through `TelemetrySession::handle_consent_response`.
    fn request_consent(&self);

    /// Redraw the inline error visualizations for a document.
    fn refresh_visualization(&self, document: &DocumentSnapshot);

    /// Surface a user-visible warning.
    fn show_warning(&self, message: &str);

    /// Echo one log line to the live-tail output channel.
    fn append_output(&self, line: &str);

    /// Whether the editor-global telemetry switch is on. Participants
    /// with it off get a one-time warning.
    fn telemetry_enabled(&self) -> bool;
}

/// Outbound side of the pipeline. Sends are fire-and-forget; delivery
/// and retry semantics belong to the transport, with at-least-once
/// coverage coming from periodic re-flush of accumulated content.
pub trait TelemetryTransport: Send + Sync {
    fn send_log_content(&self, payload: String);
}
