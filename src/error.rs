//! Error types for the migration orchestration core.
//!

use crate::auth::Tier;
use crate::config::ConfigurationError;
use crate::state_machine::errors::GuardError;
use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MigratorError {
    /// Missing or malformed arguments. Never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{entity} not found: {identifier}")]
    NotFound {
        entity: &'static str,
        identifier: String,
    },

    #[error("Operation '{operation}' requires {required_tier} access")]
    Unauthorized {
        operation: String,
        required_tier: Tier,
    },

    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Upstream error from {service}: {reason}")]
    Upstream { service: String, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MigratorError {
    /// Shorthand for a validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn repository_not_found(full_name: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Repository",
            identifier: full_name.into(),
        }
    }

    pub fn batch_not_found(batch_id: i64) -> Self {
        Self::NotFound {
            entity: "Batch",
            identifier: batch_id.to_string(),
        }
    }

    /// Check if this is a caller error (bad input, unknown entity, denied) rather than
    /// a failure of the store or an upstream service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::NotFound { .. }
                | Self::Unauthorized { .. }
                | Self::InvalidTransition(_)
        )
    }

    /// Store and upstream failures may succeed if the caller tries again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Upstream { .. })
    }
}

impl From<StoreError> for MigratorError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RepositoryNotFound(name) => Self::repository_not_found(name),
            StoreError::BatchNotFound(id) => Self::batch_not_found(id),
            other => Self::Store(other.to_string()),
        }
    }
}

impl From<GuardError> for MigratorError {
    fn from(err: GuardError) -> Self {
        Self::InvalidTransition(err.to_string())
    }
}

impl From<ConfigurationError> for MigratorError {
    fn from(err: ConfigurationError) -> Self {
        Self::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MigratorError>;
