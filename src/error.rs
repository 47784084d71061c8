//! Error taxonomy shared by every operation in the core.
//!
//! Each error carries a human-readable message plus a stable [`ErrorKind`]
//! so callers can branch programmatically instead of matching on text.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("{0}")]
    Validation(String),

    #[error("external service failure: {0}")]
    ExternalService(String),

    #[error("failed to commit staged changes: {0}")]
    Commit(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Stable, machine-readable error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Validation,
    ExternalService,
    Commit,
    Storage,
}

impl MarketError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::ExternalService(_) => ErrorKind::ExternalService,
            Self::Commit(_) => ErrorKind::Commit,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }
}

pub type Result<T> = std::result::Result<T, MarketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        assert_eq!(MarketError::not_found("product").kind(), ErrorKind::NotFound);
        assert_eq!(MarketError::validation("nope").kind(), ErrorKind::Validation);
        assert_eq!(
            MarketError::ExternalService("declined".into()).kind(),
            ErrorKind::ExternalService
        );
    }

    #[test]
    fn messages_stay_readable() {
        let err = MarketError::not_found("order");
        assert_eq!(err.to_string(), "order not found");
    }
}
