use chrono::NaiveDate;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid date range: since {since} is after until {until}")]
    InvalidDateRange { since: NaiveDate, until: NaiveDate },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Collaborator-facing failures. Feed fetch errors never reach this type:
/// they are recovered at the engine boundary as an empty snapshot. Only
/// failures the operator can act on (retry a sync, fix configuration) are
/// surfaced.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("sync source failure: {0}")]
    Source(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Whether the caller should offer a user-visible retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Source(_))
    }
}

impl From<ConfigError> for ApplicationError {
    fn from(value: ConfigError) -> Self {
        Self::Configuration(value.to_string())
    }
}
