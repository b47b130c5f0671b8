pub mod guard;
pub mod orchestrator;
pub mod sources;

pub use guard::{SyncGuard, SyncPhase, SyncRejection};
pub use orchestrator::{SessionContext, SyncError, SyncOrchestrator, SyncOutcome};
pub use sources::{snapshot_or_empty, AttributionSource, PerformanceSource, SourceError};
