use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use log::info;

use crate::{
    capture::CapturePipeline,
    config::TelemetryConfig,
    enrollment::{EnrollmentController, EnrollmentStore, ParticipationStatus},
    host::{EditorHost, TelemetryTransport},
    logstore::LogStore,
    models::{elapsed_stamp, DocumentSnapshot},
    settings::SettingsStore,
    upload::UploadScheduler,
};

const TELEMETRY_WARNING: &str = "Please enable telemetry to participate in the study. \
    Do this by going to Code > Settings > Settings and searching for 'telemetry'.";

/// One editor session's worth of telemetry state: enrollment, the open
/// log file, and the capture pipeline. Built at activation, torn down at
/// deactivation; there is no process-wide mutable state.
pub struct TelemetrySession {
    host: Arc<dyn EditorHost>,
    enrollment: EnrollmentController,
    settings: Arc<SettingsStore>,
    store: Arc<LogStore>,
    pipeline: CapturePipeline,
}

impl TelemetrySession {
    /// Wires up the session. A storage failure here is fatal: the
    /// pipeline stays inactive until the next activation.
    pub fn activate(
        host: Arc<dyn EditorHost>,
        transport: Arc<dyn TelemetryTransport>,
        storage_dir: PathBuf,
        config: TelemetryConfig,
    ) -> Result<Self> {
        fs::create_dir_all(&storage_dir).with_context(|| {
            format!(
                "failed to create storage directory {}",
                storage_dir.display()
            )
        })?;

        let settings = Arc::new(SettingsStore::new(storage_dir.join("settings.json"))?);
        let enrollment = EnrollmentController::new(
            EnrollmentStore::new(storage_dir.join("state.json")),
            settings.clone(),
            storage_dir.clone(),
        );

        if enrollment.participation() == ParticipationStatus::Unset {
            host.request_consent();
        }

        let now = Utc::now();
        enrollment.run_activation_checks(now.timestamp())?;

        let store = Arc::new(LogStore::new(
            storage_dir.clone(),
            config.rotation_threshold,
        ));

        if enrollment.is_accepted() && settings.error_logging() {
            let start = enrollment
                .enrollment_start()
                .ok_or_else(|| anyhow!("accepted enrollment is missing its start time"))?;
            store.open_existing(
                enrollment.is_feature_currently_enabled(),
                &elapsed_stamp(start, now),
            )?;
            if !host.telemetry_enabled() {
                host.show_warning(TELEMETRY_WARNING);
            }
            info!("error logging active for this session");
        }

        let config = Arc::new(config);
        let uploader = Arc::new(UploadScheduler::new(transport, config.send_interval));
        let pipeline = CapturePipeline::new(
            host.clone(),
            enrollment.clone(),
            settings.clone(),
            store.clone(),
            uploader,
            config,
        );

        Ok(Self {
            host,
            enrollment,
            settings,
            store,
            pipeline,
        })
    }

    /// Consent-form answer, delivered by the front-end.
    pub fn handle_consent_response(&self, accepted: bool) -> Result<()> {
        if accepted {
            let user_id = self.enrollment.accept_consent(Utc::now().timestamp())?;
            self.store
                .open_new(&user_id, self.enrollment.is_feature_currently_enabled())?;
            if !self.host.telemetry_enabled() {
                self.host.show_warning(TELEMETRY_WARNING);
            }
        } else {
            self.enrollment.decline_consent()?;
        }
        Ok(())
    }

    /// Survey answer, delivered by the front-end; appended to the current
    /// log so it travels with the next batch.
    pub fn record_survey_response(&self, text: &str) -> Result<()> {
        if !self.enrollment.is_accepted() {
            bail!("survey responses are only recorded for enrolled participants");
        }
        self.enrollment.mark_survey_submitted()?;
        self.store.append_survey(text)
    }

    pub fn notify_diagnostics_changed(&self, document: DocumentSnapshot) {
        self.pipeline.notify_diagnostics_changed(document);
    }

    pub fn notify_document_saved(&self, document: &DocumentSnapshot) -> Result<()> {
        self.pipeline.notify_document_saved(document)
    }

    pub fn notify_active_editor_changed(&self, document: &DocumentSnapshot) {
        self.pipeline.notify_active_editor_changed(document);
    }

    pub fn toggle_visualization(&self) {
        self.pipeline.toggle_visualization();
    }

    pub fn enrollment(&self) -> &EnrollmentController {
        &self.enrollment
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn is_accepted(&self) -> bool {
        self.enrollment.is_accepted()
    }

    pub fn is_study_arm_active(&self) -> bool {
        self.enrollment.is_study_arm_active()
    }

    pub fn is_feature_currently_enabled(&self) -> bool {
        self.enrollment.is_feature_currently_enabled()
    }

    /// Clears pending debounce timers and closes the log writer. Cleared
    /// cycles emit nothing; no partial line is ever written.
    pub fn deactivate(&self) {
        self.pipeline.shutdown();
        self.store.close();
        info!("telemetry session deactivated");
    }
}
