//! signup_server: axum front end for the signup workflow.
//!
//! Serves the registration mock under `/registration`, the OData goal mock
//! under `/odata/v2` and the operation API under `/api`.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
