pub mod controller;
pub mod record;
pub mod store;

pub use controller::EnrollmentController;
pub use record::{EnrollmentRecord, ParticipationStatus, TWO_WEEKS_SECS, YEAR_SECS};
pub use store::EnrollmentStore;
