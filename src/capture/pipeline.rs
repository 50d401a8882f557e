use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{anyhow, Result};
use chrono::Utc;
use serde::Serialize;

use crate::{
    config::TelemetryConfig,
    enrollment::EnrollmentController,
    hash::hash_str,
    host::EditorHost,
    logstore::LogStore,
    models::{
        elapsed_stamp, CaptureEntry, Diagnostic, DiagnosticCode, DocumentSnapshot, ErrorRecord,
        LineRange, SaveRecord, Severity,
    },
    settings::SettingsStore,
    upload::UploadScheduler,
};

use super::{debounce::Debouncer, hints::find_hint};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Bucket for structured codes outside the compiler's E-code convention;
/// lexer/parser errors lack stable codes of their own.
const SYNTAX_CODE: &str = "Syntax";

/// Turns diagnostic-change notifications into at most one sanitized log
/// entry per quiet period. Consults the enrollment gate on every trigger
/// and never bypasses it.
#[derive(Clone)]
pub struct CapturePipeline {
    host: Arc<dyn EditorHost>,
    enrollment: EnrollmentController,
    settings: Arc<SettingsStore>,
    store: Arc<LogStore>,
    uploader: Arc<UploadScheduler>,
    config: Arc<TelemetryConfig>,
    capture_debounce: Arc<Debouncer>,
    visual_debounce: Arc<Debouncer>,
    /// Set by the toggle command, consumed and reset by the next entry.
    vis_toggled: Arc<AtomicBool>,
    /// Suppresses repeated empty-error entries while a document sits in a
    /// compiling-clean state.
    clean_build_logged: Arc<AtomicBool>,
}

impl CapturePipeline {
    pub fn new(
        host: Arc<dyn EditorHost>,
        enrollment: EnrollmentController,
        settings: Arc<SettingsStore>,
        store: Arc<LogStore>,
        uploader: Arc<UploadScheduler>,
        config: Arc<TelemetryConfig>,
    ) -> Self {
        let capture_debounce = Arc::new(Debouncer::new(Duration::from_millis(
            config.capture_debounce_ms,
        )));
        let visual_debounce = Arc::new(Debouncer::new(Duration::from_millis(
            config.visual_debounce_ms,
        )));
        Self {
            host,
            enrollment,
            settings,
            store,
            uploader,
            config,
            capture_debounce,
            visual_debounce,
            vis_toggled: Arc::new(AtomicBool::new(false)),
            clean_build_logged: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Capture-now trigger for diagnostic-change events. Reschedules both
    /// debounce timers; the elapsed stamp is taken at notification time
    /// so a slow quiet period does not skew the entry.
    pub fn notify_diagnostics_changed(&self, document: DocumentSnapshot) {
        if document.language_id != self.config.language_id {
            return;
        }

        {
            let this = self.clone();
            let doc = document.clone();
            self.visual_debounce.schedule(async move {
                if this.enrollment.is_feature_currently_enabled() {
                    this.host.refresh_visualization(&doc);
                }
            });
        }

        if !self.logging_active() {
            return;
        }
        let Some(seconds) = self.elapsed_now() else {
            return;
        };

        let this = self.clone();
        self.capture_debounce.schedule(async move {
            if let Err(err) = this.run_capture_cycle(document, seconds).await {
                log_error!("capture cycle failed: {err:?}");
            }
        });
    }

    /// Switching editors redraws the visualizations right away; there is
    /// no diagnostics churn to wait out.
    pub fn notify_active_editor_changed(&self, document: &DocumentSnapshot) {
        if document.language_id != self.config.language_id {
            return;
        }
        if self.enrollment.is_feature_currently_enabled() {
            self.host.refresh_visualization(document);
        }
    }

    /// Save events are logged immediately; saves are already rare enough
    /// that no debounce is needed.
    pub fn notify_document_saved(&self, document: &DocumentSnapshot) -> Result<()> {
        if !self.logging_active() {
            return Ok(());
        }
        let Some(saved_at) = self.elapsed_now() else {
            return Ok(());
        };
        let record = SaveRecord {
            file: hash_str(&document.uri),
            saved_at,
        };
        self.append_and_flush(&record)
    }

    /// Marks that the user toggled a visualization; the next capture
    /// entry reports and clears it.
    pub fn toggle_visualization(&self) {
        self.vis_toggled.store(true, Ordering::SeqCst);
    }

    /// Clears pending debounce timers. Abandoned cycles emit nothing.
    pub fn shutdown(&self) {
        self.capture_debounce.cancel();
        self.visual_debounce.cancel();
    }

    async fn run_capture_cycle(&self, document: DocumentSnapshot, seconds: String) -> Result<()> {
        // the gate may have closed while the timer was pending
        if !self.logging_active() {
            return Ok(());
        }

        let diagnostics = self.host.diagnostics(&document.uri);
        let errors = match error_records(&diagnostics) {
            Ok(errors) => errors,
            Err(err) => {
                log_warn!("skipping capture cycle: {err}");
                return Ok(());
            }
        };

        if errors.is_empty() {
            // mark "returned to a clean build" once, then stay quiet
            // until errors reappear
            if self.clean_build_logged.swap(true, Ordering::SeqCst) {
                return Ok(());
            }
        } else {
            self.clean_build_logged.store(false, Ordering::SeqCst);
        }

        let numfiles = self
            .host
            .count_files_matching(&self.config.source_glob)
            .await?;

        let entry = CaptureEntry {
            file: hash_str(&document.uri),
            workspace: hash_str(&document.workspace_name),
            seconds,
            revis: self.vis_toggled.load(Ordering::SeqCst),
            length: document.line_count,
            numfiles,
            errors,
        };

        self.append_and_flush(&entry)?;
        self.vis_toggled.store(false, Ordering::SeqCst);
        log_info!(
            "captured {} errors for document {}",
            entry.errors.len(),
            entry.file
        );
        Ok(())
    }

    fn append_and_flush<T: Serialize>(&self, record: &T) -> Result<()> {
        let line = self.store.append(record)?;
        self.host.append_output(&line);
        self.uploader.maybe_flush(&self.store, &self.enrollment)
    }

    fn logging_active(&self) -> bool {
        self.settings.error_logging() && self.enrollment.is_accepted() && self.store.is_open()
    }

    fn elapsed_now(&self) -> Option<String> {
        let start = self.enrollment.enrollment_start()?;
        Some(elapsed_stamp(start, Utc::now()))
    }
}

/// De-identified error records for every Error-severity diagnostic.
///
/// A diagnostic without a structured code means the language server is
/// not configured the way we expect; the whole cycle is abandoned rather
/// than logging a partial picture.
fn error_records(diagnostics: &[Diagnostic]) -> Result<Vec<ErrorRecord>> {
    let mut records = Vec::new();
    for diag in diagnostics
        .iter()
        .filter(|diag| diag.severity == Severity::Error)
    {
        let value = match &diag.code {
            DiagnosticCode::Structured(value) => value.as_str(),
            DiagnosticCode::Primitive(raw) => {
                return Err(anyhow!("unsupported primitive diagnostic code {raw:?}"))
            }
            DiagnosticCode::Absent => {
                return Err(anyhow!("diagnostic carries no structured code"))
            }
        };

        let code = if value.starts_with('E') {
            value.to_string()
        } else {
            SYNTAX_CODE.to_string()
        };

        records.push(ErrorRecord {
            code,
            msg: hash_str(&diag.message),
            source: diag.source.clone(),
            hint: find_hint(&diag.related_information).unwrap_or_default(),
            range: LineRange {
                start: diag.range_start_line,
                end: diag.range_end_line,
            },
        });
    }
    Ok(records)
}
