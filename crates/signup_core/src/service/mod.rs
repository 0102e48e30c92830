//! Services over the client ports, and the workflow that chains them.

pub mod goal;
pub mod registration;
pub mod signup;

pub use goal::GoalService;
pub use registration::RegistrationService;
pub use signup::{GoalLookup, LookupFailurePolicy, SignupOrchestrator, SignupOutcome, SignupStep};
