use std::sync::Arc;

use anyhow::{anyhow, Result};
use log::info;

use crate::{
    enrollment::EnrollmentController,
    host::TelemetryTransport,
    logstore::LogStore,
};

/// Count-triggered batched transmission of accumulated log content.
///
/// Invoked after every successful append. Sends are fire-and-forget; a
/// dropped batch is covered by the next flush, which re-reads the whole
/// current file.
pub struct UploadScheduler {
    transport: Arc<dyn TelemetryTransport>,
    send_interval: usize,
}

impl UploadScheduler {
    pub fn new(transport: Arc<dyn TelemetryTransport>, send_interval: usize) -> Self {
        Self {
            transport,
            send_interval,
        }
    }

    /// Every `send_interval` appended lines, hand the current file to the
    /// transport as one batched event. When the rotation threshold has
    /// also been reached, rotate immediately after the flush, so the
    /// flushed file is never the one still being written.
    pub fn maybe_flush(&self, store: &LogStore, enrollment: &EnrollmentController) -> Result<()> {
        let count = store.line_count();
        if count == 0 || count % self.send_interval != 0 {
            return Ok(());
        }

        let payload = store.read_current()?;
        info!("flushing log content at {count} lines");
        self.transport.send_log_content(payload);

        if store.needs_rotation() {
            let user_id = enrollment
                .user_id()
                .ok_or_else(|| anyhow!("rotation requires an enrolled participant"))?;
            store.rotate(&user_id, enrollment.is_feature_currently_enabled())?;
        }
        Ok(())
    }
}
