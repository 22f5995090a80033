//! Data models for `plan-tracker`

pub mod catalog;
pub mod course;
pub mod identity;
pub mod plan_map;
pub mod state;

pub use catalog::{CatalogCourse, Category, CheckboxCredit, CreditRequirements, DegreePlan};
pub use course::{CourseRecord, GradeStatus, NOT_APPROVED_GRADE, REGULARIZED_GRADE};
pub use identity::{PlanIdentity, UserIdentity};
pub use plan_map::PlanMap;
pub use state::{ApprovedCourse, NormalizedState};
