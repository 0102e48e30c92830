pub mod api;
pub mod goals;
pub mod registration;
