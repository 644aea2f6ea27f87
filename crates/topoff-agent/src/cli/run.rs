use std::sync::Arc;
use std::time::Duration;

use topoff_core::models::{CoreError, CoreErrorKind};
use topoff_core::orchestration::{
    ConnectivityWatcher, RefreshScheduler, TcpReachabilityProbe, UpdateOrchestrator,
    spawn_monitor, spawn_settings_reload,
};

const CONNECTIVITY_POLL: Duration = Duration::from_secs(30);
const SETTINGS_RELOAD: Duration = Duration::from_secs(60);

/// Resident mode: a launch check, periodic checks and a deferred check after reconnecting.
pub async fn run(orchestrator: UpdateOrchestrator) -> Result<(), CoreError> {
    let scheduler = Arc::new(RefreshScheduler::for_orchestrator(orchestrator.clone()));
    let interval = orchestrator.snapshot().settings.check_interval_seconds;
    scheduler.start(interval);
    tracing::info!(interval_seconds = interval, "agent started");

    let follower = scheduler.follow_interval(&orchestrator);
    let reloader = spawn_settings_reload(orchestrator.clone(), SETTINGS_RELOAD);

    let mut monitor = None;
    if !orchestrator.refresh().await {
        let watcher = Arc::new(ConnectivityWatcher::new());
        let deferred = orchestrator.clone();
        let runtime = tokio::runtime::Handle::current();
        watcher.arm(move || {
            tracing::info!("network is back; running the deferred check");
            runtime.spawn(async move {
                deferred.refresh().await;
            });
        });
        monitor = Some(spawn_monitor(
            watcher,
            Arc::new(TcpReachabilityProbe::default()),
            CONNECTIVITY_POLL,
        ));
    }

    let stopped = tokio::signal::ctrl_c().await;

    follower.abort();
    reloader.abort();
    if let Some(monitor) = monitor {
        monitor.abort();
    }
    scheduler.stop();

    stopped.map_err(|error| {
        CoreError::new(
            CoreErrorKind::Internal,
            format!("failed to listen for shutdown signal: {error}"),
        )
    })?;
    tracing::info!("agent stopped");
    Ok(())
}
