//! signup_core: the conference signup workflow.
//!
//! Domain types, the two in-memory downstream mocks with fault injection, the
//! resilience policy that guards the goal lookup, the services and workflow
//! on top of the client ports, and the operation registry.
//!
//! No HTTP here: `signup_client` implements the ports, `signup_server`
//! exposes the mocks and operations.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod fault;
pub mod odata;
pub mod ports;
pub mod resilience;
pub mod service;
pub mod store;
pub mod types;

pub use error::{Result, SignupError};
