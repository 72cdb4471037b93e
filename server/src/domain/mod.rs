use std::sync::Arc;

pub mod eligibility;
pub mod permissions;

pub use eligibility::{check_cancellation, check_eligibility, CancellationError, EligibilityError};
pub use permissions::{enforce, Access, Actor, Decision, PermissionDenied, Policy};

/// Source of "now" for every time-dependent rule.
pub type SharedClock = Arc<dyn mockable::Clock + Send + Sync>;
