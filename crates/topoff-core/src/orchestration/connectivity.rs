use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::task::JoinHandle;

type ReconnectCallback = Box<dyn FnOnce() + Send>;

/// Tracks reachability and runs a one-shot callback on the first disconnected to connected
/// transition after it is armed. Starts out disconnected.
#[derive(Default)]
pub struct ConnectivityWatcher {
    state: Mutex<WatcherState>,
}

#[derive(Default)]
struct WatcherState {
    connected: bool,
    callback: Option<ReconnectCallback>,
    fired: bool,
}

impl ConnectivityWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the reconnect callback. Returns `false` once the latch has already fired.
    pub fn arm(&self, callback: impl FnOnce() + Send + 'static) -> bool {
        let mut state = self.lock_state();
        if state.fired {
            return false;
        }
        state.callback = Some(Box::new(callback));
        true
    }

    pub fn is_armed(&self) -> bool {
        self.lock_state().callback.is_some()
    }

    pub fn is_connected(&self) -> bool {
        self.lock_state().connected
    }

    /// Feeds one reachability sample. Returns `true` when this sample fired the callback.
    pub fn observe(&self, connected: bool) -> bool {
        let callback = {
            let mut state = self.lock_state();
            let restored = !state.connected && connected;
            state.connected = connected;
            if !restored || state.fired {
                None
            } else {
                let callback = state.callback.take();
                state.fired = callback.is_some();
                callback
            }
        };

        match callback {
            Some(callback) => {
                tracing::info!("network connectivity restored; running deferred check");
                callback();
                true
            }
            None => false,
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, WatcherState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub type ProbeFuture<'a> = Pin<Box<dyn Future<Output = bool> + Send + 'a>>;

pub trait ReachabilityProbe: Send + Sync {
    fn probe(&self) -> ProbeFuture<'_>;
}

pub const DEFAULT_PROBE_ADDRESS: &str = "github.com:443";
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Reachable when a TCP connection to `address` opens within `timeout`.
#[derive(Clone, Debug)]
pub struct TcpReachabilityProbe {
    address: String,
    timeout: Duration,
}

impl TcpReachabilityProbe {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            timeout,
        }
    }
}

impl Default for TcpReachabilityProbe {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_ADDRESS, DEFAULT_PROBE_TIMEOUT)
    }
}

impl ReachabilityProbe for TcpReachabilityProbe {
    fn probe(&self) -> ProbeFuture<'_> {
        Box::pin(async move {
            matches!(
                tokio::time::timeout(self.timeout, TcpStream::connect(self.address.as_str())).await,
                Ok(Ok(_))
            )
        })
    }
}

/// Samples `probe` every `poll_interval` and feeds the result to `watcher`.
pub fn spawn_monitor(
    watcher: Arc<ConnectivityWatcher>,
    probe: Arc<dyn ReachabilityProbe>,
    poll_interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let connected = probe.probe().await;
            watcher.observe(connected);
            tokio::time::sleep(poll_interval).await;
        }
    })
}
