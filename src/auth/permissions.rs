//! # Caller Permissions
//!
//! Authorization context carried with every orchestrator call. The permission flags,
//! never the tier label, decide what a caller may do.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Authorization tier an operation is statically bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Read-only queries
    Any,
    /// Batch creation, configuration, scheduling and wave planning
    SelfService,
    /// Starting or cancelling migrations and other admin mutations
    Admin,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::SelfService => "self_service",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Independent capability flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub can_read: bool,
    pub can_migrate_own: bool,
    pub can_migrate_all: bool,
    pub can_manage_settings: bool,
}

impl Permissions {
    pub fn read_only() -> Self {
        Self {
            can_read: true,
            ..Self::default()
        }
    }

    pub fn self_service() -> Self {
        Self {
            can_read: true,
            can_migrate_own: true,
            ..Self::default()
        }
    }

    pub fn admin() -> Self {
        Self {
            can_read: true,
            can_migrate_own: true,
            can_migrate_all: true,
            can_manage_settings: true,
        }
    }

    /// Whether these flags satisfy `tier`.
    pub fn satisfies(&self, tier: Tier) -> bool {
        match tier {
            Tier::Any => true,
            Tier::SelfService => self.can_migrate_own || self.can_migrate_all,
            Tier::Admin => self.can_migrate_all,
        }
    }
}

/// Identity and permissions of the caller of an orchestrator operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationContext {
    pub user_id: i64,
    pub user_login: String,
    /// Display label only; not consulted for gating
    pub tier: String,
    pub permissions: Permissions,
}

impl AuthorizationContext {
    pub fn new(
        user_id: i64,
        user_login: impl Into<String>,
        tier: impl Into<String>,
        permissions: Permissions,
    ) -> Self {
        Self {
            user_id,
            user_login: user_login.into(),
            tier: tier.into(),
            permissions,
        }
    }
}
