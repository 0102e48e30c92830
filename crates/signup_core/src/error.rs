use thiserror::Error;

use crate::fault::InjectedFault;
use crate::resilience::{Retryable, ResilienceError};

pub type Result<T> = std::result::Result<T, SignupError>;

#[derive(Debug, Error)]
pub enum SignupError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Injected faults, upstream 5xx responses, transport failures.
    #[error("transient failure: {0}")]
    Transient(String),

    /// A resilience policy gave up (timeout, retries exhausted, open circuit,
    /// rate limit).
    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl SignupError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::NotFound(_) => 404,
            Self::Transient(_) => 503,
            Self::Unavailable(_) => 503,
            Self::Internal(_) => 500,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Stable machine-readable code for error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NotFound(_) => "not_found",
            Self::Transient(_) => "transient",
            Self::Unavailable(_) => "unavailable",
            Self::Internal(_) => "internal",
        }
    }
}

impl Retryable for SignupError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }
}

impl From<InjectedFault> for SignupError {
    fn from(fault: InjectedFault) -> Self {
        Self::Transient(fault.to_string())
    }
}

impl From<ResilienceError<SignupError>> for SignupError {
    fn from(err: ResilienceError<SignupError>) -> Self {
        match err {
            ResilienceError::Rejected(inner) => inner,
            other => Self::Unavailable(other.to_string()),
        }
    }
}
