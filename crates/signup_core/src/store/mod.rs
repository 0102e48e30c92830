//! In-memory stand-ins for the two downstream systems.

pub mod goals;
pub mod registration;

pub use goals::MockGoalStore;
pub use registration::MockRegistrationStore;
