//! # Authorization Gate
//!
//! Maps operation names to tiers and decides whether a caller may invoke them.

use super::permissions::{AuthorizationContext, Tier};
use crate::constants::operations;
use crate::error::{MigratorError, Result};
use tracing::{debug, warn};

/// Outcome of a gate check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    /// Caller holds the required permissions
    Allowed,
    /// No context was supplied; allowed for unauthenticated deployments, audited
    AllowedUnauthenticated,
    Denied { required_tier: Tier },
}

impl AuthDecision {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Self::Denied { .. })
    }
}

/// Tier an operation is bound to. Unknown names require Admin.
pub fn operation_tier(operation: &str) -> Tier {
    use operations::*;

    match operation {
        FIND_PILOT_CANDIDATES
        | ANALYZE_REPOSITORIES
        | CHECK_DEPENDENCIES
        | GET_COMPLEXITY_BREAKDOWN
        | GET_MIGRATION_STATUS
        | GET_MIGRATION_PROGRESS
        | LIST_BATCHES => Tier::Any,

        PLAN_WAVES | CREATE_BATCH | CONFIGURE_BATCH | SCHEDULE_BATCH => Tier::SelfService,

        START_MIGRATION
        | CANCEL_MIGRATION
        | RETRY_BATCH_FAILURES
        | UPDATE_REPOSITORY_STATUS
        | START_DISCOVERY
        | UPDATE_TEAM_MAPPING
        | UPDATE_USER_MAPPING
        | SEND_MANNEQUIN_INVITATIONS => Tier::Admin,

        _ => Tier::Admin,
    }
}

/// Stateless gate in front of every orchestrator operation
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationGate;

impl AuthorizationGate {
    pub fn new() -> Self {
        Self
    }

    /// Decide whether `context` may invoke `operation`.
    pub fn decide(&self, operation: &str, context: Option<&AuthorizationContext>) -> AuthDecision {
        let Some(context) = context else {
            return AuthDecision::AllowedUnauthenticated;
        };

        let required_tier = operation_tier(operation);
        if context.permissions.satisfies(required_tier) {
            AuthDecision::Allowed
        } else {
            AuthDecision::Denied { required_tier }
        }
    }

    /// Gate a call, logging the decision. Denials become `MigratorError::Unauthorized`.
    pub fn authorize(&self, operation: &str, context: Option<&AuthorizationContext>) -> Result<()> {
        match self.decide(operation, context) {
            AuthDecision::Allowed => {
                debug!(operation = %operation, "Operation authorized");
                Ok(())
            }
            AuthDecision::AllowedUnauthenticated => {
                warn!(
                    operation = %operation,
                    audit = true,
                    "Operation invoked without authorization context"
                );
                Ok(())
            }
            AuthDecision::Denied { required_tier } => {
                warn!(
                    operation = %operation,
                    required_tier = %required_tier,
                    user_login = context.map(|c| c.user_login.as_str()).unwrap_or_default(),
                    "Operation denied"
                );
                Err(MigratorError::Unauthorized {
                    operation: operation.to_string(),
                    required_tier,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Permissions;

    fn context(permissions: Permissions) -> AuthorizationContext {
        AuthorizationContext::new(7, "octocat", "custom", permissions)
    }

    #[test]
    fn test_catalogue_tiers() {
        assert_eq!(operation_tier("find_pilot_candidates"), Tier::Any);
        assert_eq!(operation_tier("get_migration_progress"), Tier::Any);
        assert_eq!(operation_tier("plan_waves"), Tier::SelfService);
        assert_eq!(operation_tier("schedule_batch"), Tier::SelfService);
        assert_eq!(operation_tier("start_migration"), Tier::Admin);
        assert_eq!(operation_tier("retry_batch_failures"), Tier::Admin);
    }

    #[test]
    fn test_unknown_operation_requires_admin() {
        assert_eq!(operation_tier("drop_everything"), Tier::Admin);
        let gate = AuthorizationGate::new();
        let decision = gate.decide("drop_everything", Some(&context(Permissions::self_service())));
        assert_eq!(
            decision,
            AuthDecision::Denied {
                required_tier: Tier::Admin
            }
        );
    }

    #[test]
    fn test_missing_context_is_allowed_but_flagged() {
        let gate = AuthorizationGate::new();
        assert_eq!(
            gate.decide("start_migration", None),
            AuthDecision::AllowedUnauthenticated
        );
        assert!(gate.authorize("start_migration", None).is_ok());
    }

    #[test]
    fn test_migrate_own_can_create_but_not_start() {
        let gate = AuthorizationGate::new();
        let caller = context(Permissions::self_service());

        assert!(gate.authorize("create_batch", Some(&caller)).is_ok());
        let err = gate.authorize("start_migration", Some(&caller)).unwrap_err();
        assert_eq!(
            err,
            MigratorError::Unauthorized {
                operation: "start_migration".to_string(),
                required_tier: Tier::Admin,
            }
        );
    }

    #[test]
    fn test_tier_label_is_not_authoritative() {
        let gate = AuthorizationGate::new();
        let mut caller = context(Permissions::read_only());
        caller.tier = "admin".to_string();
        assert!(!gate.decide("cancel_migration", Some(&caller)).is_allowed());
    }
}
