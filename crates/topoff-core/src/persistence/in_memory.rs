use std::sync::{Mutex, MutexGuard};

use crate::models::{AppSettings, CoreError, CoreErrorKind, UpdateResult};
use crate::persistence::{HistoryStore, PersistenceResult, SettingsStore};

/// Volatile store for tests and for running without a database file.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoredState>,
}

#[derive(Default)]
struct StoredState {
    settings: AppSettings,
    history: Vec<UpdateResult>,
    history_writes: usize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(settings: AppSettings, history: Vec<UpdateResult>) -> Self {
        Self {
            state: Mutex::new(StoredState {
                settings,
                history,
                history_writes: 0,
            }),
        }
    }

    /// Number of `save_history` calls so far.
    pub fn history_writes(&self) -> usize {
        self.lock_state().map(|state| state.history_writes).unwrap_or(0)
    }

    fn lock_state(&self) -> PersistenceResult<MutexGuard<'_, StoredState>> {
        self.state.lock().map_err(|_| {
            CoreError::new(CoreErrorKind::Internal, "in-memory store mutex poisoned")
        })
    }

    fn update_settings(&self, apply: impl FnOnce(&mut AppSettings)) -> PersistenceResult<()> {
        let mut state = self.lock_state()?;
        apply(&mut state.settings);
        Ok(())
    }
}

impl SettingsStore for InMemoryStore {
    fn load_settings(&self) -> PersistenceResult<AppSettings> {
        Ok(self.lock_state()?.settings.clone())
    }

    fn set_launch_at_login(&self, enabled: bool) -> PersistenceResult<()> {
        self.update_settings(|settings| settings.launch_at_login = enabled)
    }

    fn set_check_interval(&self, seconds: f64) -> PersistenceResult<()> {
        self.update_settings(|settings| settings.check_interval_seconds = seconds)
    }

    fn set_auto_cleanup(&self, enabled: bool) -> PersistenceResult<()> {
        self.update_settings(|settings| settings.auto_cleanup = enabled)
    }

    fn set_greedy_mode(&self, enabled: bool) -> PersistenceResult<()> {
        self.update_settings(|settings| settings.greedy_mode = enabled)
    }
}

impl HistoryStore for InMemoryStore {
    fn load_history(&self) -> PersistenceResult<Vec<UpdateResult>> {
        Ok(self.lock_state()?.history.clone())
    }

    fn save_history(&self, entries: &[UpdateResult]) -> PersistenceResult<()> {
        let mut state = self.lock_state()?;
        state.history = entries.to_vec();
        state.history_writes += 1;
        Ok(())
    }
}
