use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::orchestration::UpdateOrchestrator;

pub type TickFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

type TickFn = Arc<dyn Fn() -> TickFuture + Send + Sync>;

/// Converts a persisted interval into a timer period. Zero, negative and non-finite
/// values mean manual-only checking.
pub fn period_from_seconds(seconds: f64) -> Option<Duration> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(seconds).ok()
}

/// Fires a refresh every period. Must be started from within a tokio runtime.
pub struct RefreshScheduler {
    tick: TickFn,
    timer: Mutex<Option<ScheduledTimer>>,
}

struct ScheduledTimer {
    period: Duration,
    handle: JoinHandle<()>,
}

impl RefreshScheduler {
    pub fn new<F, Fut>(tick: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            tick: Arc::new(move || -> TickFuture { Box::pin(tick()) }),
            timer: Mutex::new(None),
        }
    }

    pub fn for_orchestrator(orchestrator: UpdateOrchestrator) -> Self {
        Self::new(move || {
            let orchestrator = orchestrator.clone();
            async move {
                orchestrator.refresh().await;
            }
        })
    }

    pub fn start(&self, interval_seconds: f64) {
        self.reschedule(interval_seconds);
    }

    /// Cancels the current timer and, unless the interval disables checking, arms a new one
    /// whose first tick is one full period away.
    pub fn reschedule(&self, interval_seconds: f64) {
        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = timer.take() {
            previous.handle.abort();
        }

        let Some(period) = period_from_seconds(interval_seconds) else {
            tracing::info!(interval_seconds, "periodic checks disabled");
            return;
        };

        let tick = self.tick.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                // Detached so that rescheduling never aborts a refresh midway.
                tokio::spawn(tick());
            }
        });
        tracing::debug!(period_secs = period.as_secs_f64(), "refresh timer armed");
        *timer = Some(ScheduledTimer { period, handle });
    }

    pub fn stop(&self) {
        if let Some(previous) = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            previous.handle.abort();
        }
    }

    /// Reschedules whenever the orchestrator's check interval changes.
    pub fn follow_interval(self: &Arc<Self>, orchestrator: &UpdateOrchestrator) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        let mut snapshots = orchestrator.subscribe();
        tokio::spawn(async move {
            let mut current = snapshots.borrow_and_update().settings.check_interval_seconds;
            while snapshots.changed().await.is_ok() {
                let interval = snapshots.borrow_and_update().settings.check_interval_seconds;
                if interval != current {
                    tracing::info!(interval_seconds = interval, "check interval changed");
                    scheduler.reschedule(interval);
                    current = interval;
                }
            }
        })
    }

    pub fn period(&self) -> Option<Duration> {
        self.timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|timer| timer.period)
    }
}

/// Reloads persisted settings every `period`, so that `topoff settings` run from another
/// process reaches a resident orchestrator.
pub fn spawn_settings_reload(orchestrator: UpdateOrchestrator, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            // Failures are logged by the orchestrator; the next tick retries.
            let _ = orchestrator.reload_settings();
        }
    })
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
