//! Authorization for orchestrator operations: tiers, caller contexts, the gate, and
//! the session registry that resolves a front-end session to its context.

pub mod gate;
pub mod permissions;
pub mod registry;

pub use gate::{operation_tier, AuthDecision, AuthorizationGate};
pub use permissions::{AuthorizationContext, Permissions, Tier};
pub use registry::SessionRegistry;
