// Repository status state machine
//
// Pure transition logic for the migration lifecycle. The durable store re-checks the
// current status when a transition is written, so these guards are the only place
// that decides whether a transition is legal.

pub mod errors;
pub mod events;
pub mod guards;
pub mod states;

pub use errors::{GuardError, GuardResult};
pub use events::MigrationIntent;
pub use guards::{
    can_queue_for_migration, is_cancellable, is_retryable, queue_priority, TransitionGuard,
};
pub use states::MigrationStatus;
