/// Tunable constants for the telemetry pipeline.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Flush the current log file to the transport every N appended lines.
    /// Started at 25; a later study revision widened this to 100.
    pub send_interval: usize,

    /// Rotate to a fresh log file once the line counter reaches this.
    pub rotation_threshold: usize,

    /// Quiet period after a diagnostics-change event before a capture
    /// cycle fires. Compiler re-checks arrive in bursts.
    pub capture_debounce_ms: u64,

    /// Faster debounce for refreshing the inline visualizations.
    pub visual_debounce_ms: u64,

    /// Only documents with this language id are captured.
    pub language_id: String,

    /// Glob counted as the workspace scope-size proxy.
    pub source_glob: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            send_interval: 25,
            rotation_threshold: 1000,
            capture_debounce_ms: 2000,
            visual_debounce_ms: 200,
            language_id: "rust".to_string(),
            source_glob: "**/*.rs".to_string(),
        }
    }
}
