use serde::{Deserialize, Serialize};

/// Seconds the suppressed arm goes without visualizations after enrolling.
pub const TWO_WEEKS_SECS: i64 = 1_209_600;

/// Length of the study period for one installation.
pub const YEAR_SECS: i64 = 31_536_000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ParticipationStatus {
    /// No answer yet; the consent prompt must be shown.
    Unset,
    Accepted,
    Declined,
}

impl Default for ParticipationStatus {
    fn default() -> Self {
        ParticipationStatus::Unset
    }
}

/// Consent and study-arm state for one installation.
///
/// `user_id`, `study_arm_active`, and `enrollment_start` are `Some` if and
/// only if `participation` is `Accepted`. Transitions are driven by the
/// consent response handler and the annual-expiry check; callers inject
/// `now` so time-gated logic stays testable.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentRecord {
    pub participation: ParticipationStatus,
    pub user_id: Option<String>,
    /// Coin-flip arm assignment: `true` keeps the visualization feature on
    /// from day one, `false` suppresses it for the first two weeks.
    /// Immutable once set.
    pub study_arm_active: Option<bool>,
    /// Unix seconds at acceptance; anchors all time-gated logic.
    pub enrollment_start: Option<i64>,
    #[serde(default)]
    pub survey_submitted: bool,
}

impl EnrollmentRecord {
    pub fn is_accepted(&self) -> bool {
        self.participation == ParticipationStatus::Accepted
    }

    /// Unset -> Accepted. Sets the identifying fields as one unit.
    pub fn enroll(&mut self, user_id: String, study_arm_active: bool, now: i64) {
        self.participation = ParticipationStatus::Accepted;
        self.user_id = Some(user_id);
        self.study_arm_active = Some(study_arm_active);
        self.enrollment_start = Some(now);
    }

    /// Unset -> Declined. Nothing else changes; capture stays inactive.
    pub fn decline(&mut self) {
        self.participation = ParticipationStatus::Declined;
    }

    /// Annual expiry: once the study year has passed, the record returns
    /// to a fresh Unset state. Returns true when the reset happened; the
    /// caller must also disable the logging setting.
    pub fn expire_if_due(&mut self, now: i64) -> bool {
        if !self.is_accepted() {
            return false;
        }
        match self.enrollment_start {
            Some(start) if now > start + YEAR_SECS => {
                *self = EnrollmentRecord::default();
                true
            }
            _ => false,
        }
    }

    /// Whether the visualization feature is enabled at `now`.
    ///
    /// Only the suppressed arm inside its first two weeks sees `false`;
    /// non-participants and the active arm always get the feature. The
    /// suppression clears on its own once the window passes, which keeps
    /// the arm assignment itself immutable. Telemetry capture is never
    /// gated by this.
    pub fn is_feature_enabled(&self, now: i64) -> bool {
        if !self.is_accepted() {
            return true;
        }
        match (self.study_arm_active, self.enrollment_start) {
            (Some(false), Some(start)) => now > start + TWO_WEEKS_SECS,
            _ => true,
        }
    }
}
