pub mod connectivity;
pub mod orchestrator;
pub mod permission;
pub mod scheduler;
pub mod state;

pub use connectivity::{
    ConnectivityWatcher, DEFAULT_PROBE_ADDRESS, ProbeFuture, ReachabilityProbe,
    TcpReachabilityProbe, spawn_monitor,
};
pub use orchestrator::{
    DEFAULT_CHECKMARK_HOLD, OperationOutcome, OrchestratorBuilder,
    OrchestratorConfig, OrchestratorStores, UpdateOrchestrator,
};
pub use permission::{DEFAULT_PERMISSION_PHRASES, PermissionPolicy, PhrasePermissionPolicy};
pub use scheduler::{RefreshScheduler, TickFuture, period_from_seconds, spawn_settings_reload};
pub use state::{
    Effect, Event, IconState, MachineState, OperationKind, OrchestratorSnapshot,
    OrchestratorState, transition, visible_outdated,
};
