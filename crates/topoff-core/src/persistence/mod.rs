mod in_memory;

pub use in_memory::InMemoryStore;

use crate::models::{AppSettings, CoreError, UpdateResult};

pub type PersistenceResult<T> = Result<T, CoreError>;

pub trait MigrationStore: Send + Sync {
    fn current_version(&self) -> PersistenceResult<i64>;

    fn apply_migration(&self, target_version: i64) -> PersistenceResult<()>;
}

/// Process-wide user preferences. Missing keys read as [`AppSettings::default`] values.
pub trait SettingsStore: Send + Sync {
    fn load_settings(&self) -> PersistenceResult<AppSettings>;

    fn set_launch_at_login(&self, enabled: bool) -> PersistenceResult<()>;

    fn set_check_interval(&self, seconds: f64) -> PersistenceResult<()>;

    fn set_auto_cleanup(&self, enabled: bool) -> PersistenceResult<()>;

    fn set_greedy_mode(&self, enabled: bool) -> PersistenceResult<()>;
}

/// Update history, newest first. `save_history` replaces whatever was stored before.
pub trait HistoryStore: Send + Sync {
    fn load_history(&self) -> PersistenceResult<Vec<UpdateResult>>;

    fn save_history(&self, entries: &[UpdateResult]) -> PersistenceResult<()>;
}
