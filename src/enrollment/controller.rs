use std::{
    fs::OpenOptions,
    io::Write,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use anyhow::{bail, Context, Result};
use log::info;
use rand::Rng;
use uuid::Uuid;

use crate::settings::SettingsStore;

use super::record::{EnrollmentRecord, ParticipationStatus};
use super::store::EnrollmentStore;

/// Owns the enrollment record for the running session.
///
/// All mutations go through here so the persisted record, the logging
/// setting, and the session-scoped feature flag stay in step. Wall-clock
/// seconds are passed in by callers.
#[derive(Clone)]
pub struct EnrollmentController {
    record: Arc<Mutex<EnrollmentRecord>>,
    store: Arc<EnrollmentStore>,
    settings: Arc<SettingsStore>,
    storage_dir: PathBuf,
    /// Feature gate evaluated once per activation. A two-week boundary
    /// crossing mid-session takes effect at the next activation, matching
    /// the study design.
    feature_enabled: Arc<AtomicBool>,
}

impl EnrollmentController {
    pub fn new(
        store: EnrollmentStore,
        settings: Arc<SettingsStore>,
        storage_dir: PathBuf,
    ) -> Self {
        let record = store.load();
        Self {
            record: Arc::new(Mutex::new(record)),
            store: Arc::new(store),
            settings,
            storage_dir,
            feature_enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Expiry and feature-gate evaluation, run on every activation.
    pub fn run_activation_checks(&self, now: i64) -> Result<()> {
        let mut record = self.record.lock().unwrap();
        if record.expire_if_due(now) {
            info!("study year elapsed, resetting enrollment");
            self.store.save(&record)?;
            self.settings.set_error_logging(false)?;
            self.feature_enabled.store(true, Ordering::SeqCst);
            return Ok(());
        }
        self.feature_enabled
            .store(record.is_feature_enabled(now), Ordering::SeqCst);
        Ok(())
    }

    /// Consent accepted: as one unit, issue the participant id, flip the
    /// arm coin, anchor the enrollment clock, and enable logging.
    /// Returns the new participant id.
    pub fn accept_consent(&self, now: i64) -> Result<String> {
        let user_id = Uuid::new_v4().simple().to_string();
        let study_arm_active = rand::thread_rng().gen_bool(0.5);
        self.enroll_with(user_id.clone(), study_arm_active, now)?;
        Ok(user_id)
    }

    fn enroll_with(&self, user_id: String, study_arm_active: bool, now: i64) -> Result<()> {
        let mut record = self.record.lock().unwrap();
        if record.participation != ParticipationStatus::Unset {
            bail!("consent already answered for this installation");
        }

        record.enroll(user_id.clone(), study_arm_active, now);
        self.store.save(&record)?;
        self.append_issued_id(&user_id)?;
        self.settings.set_error_logging(true)?;
        self.feature_enabled
            .store(record.is_feature_enabled(now), Ordering::SeqCst);

        info!("enrolled participant {user_id} (arm active: {study_arm_active})");
        Ok(())
    }

    pub fn decline_consent(&self) -> Result<()> {
        let mut record = self.record.lock().unwrap();
        if record.participation != ParticipationStatus::Unset {
            bail!("consent already answered for this installation");
        }
        record.decline();
        self.store.save(&record)
    }

    pub fn mark_survey_submitted(&self) -> Result<()> {
        let mut record = self.record.lock().unwrap();
        record.survey_submitted = true;
        self.store.save(&record)
    }

    pub fn is_accepted(&self) -> bool {
        self.record.lock().unwrap().is_accepted()
    }

    pub fn participation(&self) -> ParticipationStatus {
        self.record.lock().unwrap().participation
    }

    pub fn is_study_arm_active(&self) -> bool {
        self.record.lock().unwrap().study_arm_active.unwrap_or(false)
    }

    pub fn is_feature_currently_enabled(&self) -> bool {
        self.feature_enabled.load(Ordering::SeqCst)
    }

    pub fn user_id(&self) -> Option<String> {
        self.record.lock().unwrap().user_id.clone()
    }

    pub fn enrollment_start(&self) -> Option<i64> {
        self.record.lock().unwrap().enrollment_start
    }

    pub fn survey_submitted(&self) -> bool {
        self.record.lock().unwrap().survey_submitted
    }

    /// Append-only issuance record kept next to the logs for easy lookup.
    fn append_issued_id(&self, user_id: &str) -> Result<()> {
        let path = self.storage_dir.join("uuid.txt");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        writeln!(file, "{user_id}")
            .with_context(|| format!("failed to append to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const DAY: i64 = 86_400;

    fn controller(dir: &TempDir) -> EnrollmentController {
        let settings =
            Arc::new(SettingsStore::new(dir.path().join("settings.json")).unwrap());
        EnrollmentController::new(
            EnrollmentStore::new(dir.path().join("state.json")),
            settings,
            dir.path().to_path_buf(),
        )
    }

    #[test]
    fn accept_issues_id_and_enables_logging() {
        let dir = tempfile::tempdir().unwrap();
        let ctrl = controller(&dir);

        let user_id = ctrl.accept_consent(100).unwrap();
        assert_eq!(user_id.len(), 32);
        assert!(user_id.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(ctrl.is_accepted());
        assert_eq!(ctrl.enrollment_start(), Some(100));

        let issued = fs::read_to_string(dir.path().join("uuid.txt")).unwrap();
        assert_eq!(issued.trim(), user_id);

        let settings = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        assert!(settings.error_logging());
    }

    #[test]
    fn accept_is_rejected_once_answered() {
        let dir = tempfile::tempdir().unwrap();
        let ctrl = controller(&dir);
        ctrl.accept_consent(100).unwrap();
        assert!(ctrl.accept_consent(200).is_err());

        let dir2 = tempfile::tempdir().unwrap();
        let declined = controller(&dir2);
        declined.decline_consent().unwrap();
        assert!(declined.accept_consent(200).is_err());
    }

    #[test]
    fn assignment_survives_repeated_activations() {
        let dir = tempfile::tempdir().unwrap();
        let first = controller(&dir);
        let user_id = first.accept_consent(100).unwrap();
        let arm = first.is_study_arm_active();

        for activation in 0..3 {
            let again = controller(&dir);
            again.run_activation_checks(100 + activation * DAY).unwrap();
            assert_eq!(again.user_id().as_deref(), Some(user_id.as_str()));
            assert_eq!(again.is_study_arm_active(), arm);
        }
    }

    #[test]
    fn suppressed_arm_gates_feature_until_two_weeks() {
        let dir = tempfile::tempdir().unwrap();
        let ctrl = controller(&dir);
        ctrl.enroll_with("a".repeat(32), false, 0).unwrap();

        ctrl.run_activation_checks(DAY).unwrap();
        assert!(!ctrl.is_feature_currently_enabled());

        ctrl.run_activation_checks(15 * DAY).unwrap();
        assert!(ctrl.is_feature_currently_enabled());
    }

    #[test]
    fn active_arm_keeps_feature_from_day_one() {
        let dir = tempfile::tempdir().unwrap();
        let ctrl = controller(&dir);
        ctrl.enroll_with("b".repeat(32), true, 0).unwrap();
        ctrl.run_activation_checks(1).unwrap();
        assert!(ctrl.is_feature_currently_enabled());
    }

    #[test]
    fn expiry_resets_enrollment_and_disables_logging() {
        let dir = tempfile::tempdir().unwrap();
        let ctrl = controller(&dir);
        ctrl.accept_consent(0).unwrap();

        ctrl.run_activation_checks(366 * DAY).unwrap();
        assert_eq!(ctrl.participation(), ParticipationStatus::Unset);
        assert!(ctrl.user_id().is_none());

        let settings = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        assert!(!settings.error_logging());

        // the reset is durable
        let reloaded = controller(&dir);
        assert_eq!(reloaded.participation(), ParticipationStatus::Unset);
    }
}
