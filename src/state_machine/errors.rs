use super::events::MigrationIntent;
use super::states::MigrationStatus;
use thiserror::Error;

/// Guard condition failures for repository status transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("Cannot apply {intent} to a repository in status {from}")]
    TransitionNotAllowed {
        from: MigrationStatus,
        intent: MigrationIntent,
    },

    #[error("Business rule violation: {rule}")]
    BusinessRuleViolation { rule: String },
}

pub type GuardResult<T> = Result<T, GuardError>;

/// Helper function to create transition rejections
pub fn transition_not_allowed(from: MigrationStatus, intent: MigrationIntent) -> GuardError {
    GuardError::TransitionNotAllowed { from, intent }
}

/// Helper function to create business rule violations
pub fn business_rule_violation(rule: impl Into<String>) -> GuardError {
    GuardError::BusinessRuleViolation { rule: rule.into() }
}
