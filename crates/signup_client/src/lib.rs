//! Implementations of the `signup_core` client ports.
//!
//! `inprocess` calls the mock stores directly; `http` talks to the mock
//! endpoints served by `signup_server`. The workflow cannot tell them apart.

pub mod http;
pub mod inprocess;

pub use http::{HttpGoalClient, HttpRegistrationClient};
pub use inprocess::{InProcessGoalClient, InProcessRegistrationClient};
pub use signup_core::ports::{GoalClient, RegistrationClient};

pub type Result<T> = std::result::Result<T, signup_core::SignupError>;
