use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OptionalExtension, params};

use crate::models::{
    AppSettings, CoreError, CoreErrorKind, HISTORY_CAPACITY, UpdateResult, UpgradedPackage,
};
use crate::persistence::{HistoryStore, MigrationStore, PersistenceResult, SettingsStore};
use crate::sqlite::migrations::{SqliteMigration, current_schema_version, migration, migrations};

const MIGRATIONS_TABLE: &str = "topoff_schema_migrations";

const KEY_LAUNCH_AT_LOGIN: &str = "launch_at_login";
const KEY_CHECK_INTERVAL: &str = "check_interval_seconds";
const KEY_AUTO_CLEANUP: &str = "auto_cleanup";
const KEY_GREEDY_MODE: &str = "greedy_mode";

/// Settings and history backed by one SQLite file. Each call opens its own connection, so
/// the store is cheap to share across threads.
pub struct SqliteStore {
    database_path: PathBuf,
}

impl SqliteStore {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
        }
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn planned_migrations(&self, from_version: i64) -> Vec<&'static SqliteMigration> {
        migrations()
            .iter()
            .filter(|entry| entry.version > from_version)
            .collect()
    }

    pub fn migrate_to_latest(&self) -> PersistenceResult<()> {
        self.apply_migration(current_schema_version())
    }

    fn with_connection<T>(
        &self,
        operation_name: &str,
        operation: impl FnOnce(&mut Connection) -> rusqlite::Result<T>,
    ) -> PersistenceResult<T> {
        let mut connection = open_connection(&self.database_path)
            .map_err(|error| storage_error(operation_name, error))?;
        operation(&mut connection).map_err(|error| storage_error(operation_name, error))
    }

    fn write_setting(&self, operation_name: &str, key: &str, value: String) -> PersistenceResult<()> {
        self.with_connection(operation_name, |connection| {
            ensure_schema_ready(connection)?;
            connection.execute(
                "
INSERT INTO app_settings (key, value)
VALUES (?1, ?2)
ON CONFLICT(key) DO UPDATE SET
    value = excluded.value
",
                params![key, value],
            )?;
            Ok(())
        })
    }
}

impl MigrationStore for SqliteStore {
    fn current_version(&self) -> PersistenceResult<i64> {
        self.with_connection("current_version", |connection| {
            ensure_migrations_table(connection)?;
            read_current_version(connection)
        })
    }

    fn apply_migration(&self, target_version: i64) -> PersistenceResult<()> {
        if target_version < 0 || target_version > current_schema_version() {
            return Err(storage_error_text(
                "apply_migration",
                format!("invalid migration target version '{target_version}'"),
            ));
        }

        self.with_connection("apply_migration", |connection| {
            ensure_migrations_table(connection)?;
            let current_version = read_current_version(connection)?;

            if target_version == current_version {
                // Tables may be missing even though the version row exists; every
                // CREATE is IF NOT EXISTS.
                for version in 1..=target_version {
                    connection.execute_batch(defined_migration(version)?.up_sql)?;
                }
                return Ok(());
            }

            if target_version > current_version {
                for version in (current_version + 1)..=target_version {
                    apply_up_migration(connection, defined_migration(version)?)?;
                }
            } else {
                for version in ((target_version + 1)..=current_version).rev() {
                    apply_down_migration(connection, defined_migration(version)?)?;
                }
            }

            Ok(())
        })
    }
}

impl SettingsStore for SqliteStore {
    fn load_settings(&self) -> PersistenceResult<AppSettings> {
        self.with_connection("load_settings", |connection| {
            ensure_schema_ready(connection)?;
            let defaults = AppSettings::default();
            let mut statement = connection.prepare("SELECT value FROM app_settings WHERE key = ?1")?;
            let mut read = |key: &str| -> rusqlite::Result<Option<String>> {
                statement
                    .query_row([key], |row| row.get::<_, String>(0))
                    .optional()
            };

            Ok(AppSettings {
                launch_at_login: read(KEY_LAUNCH_AT_LOGIN)?
                    .map(|value| sqlite_to_bool(&value))
                    .unwrap_or(defaults.launch_at_login),
                check_interval_seconds: read(KEY_CHECK_INTERVAL)?
                    .and_then(|value| value.trim().parse::<f64>().ok())
                    .unwrap_or(defaults.check_interval_seconds),
                auto_cleanup: read(KEY_AUTO_CLEANUP)?
                    .map(|value| sqlite_to_bool(&value))
                    .unwrap_or(defaults.auto_cleanup),
                greedy_mode: read(KEY_GREEDY_MODE)?
                    .map(|value| sqlite_to_bool(&value))
                    .unwrap_or(defaults.greedy_mode),
            })
        })
    }

    fn set_launch_at_login(&self, enabled: bool) -> PersistenceResult<()> {
        self.write_setting("set_launch_at_login", KEY_LAUNCH_AT_LOGIN, bool_to_sqlite(enabled))
    }

    fn set_check_interval(&self, seconds: f64) -> PersistenceResult<()> {
        if !seconds.is_finite() {
            return Err(storage_error_text(
                "set_check_interval",
                format!("check interval must be finite, got '{seconds}'"),
            ));
        }
        self.write_setting("set_check_interval", KEY_CHECK_INTERVAL, seconds.to_string())
    }

    fn set_auto_cleanup(&self, enabled: bool) -> PersistenceResult<()> {
        self.write_setting("set_auto_cleanup", KEY_AUTO_CLEANUP, bool_to_sqlite(enabled))
    }

    fn set_greedy_mode(&self, enabled: bool) -> PersistenceResult<()> {
        self.write_setting("set_greedy_mode", KEY_GREEDY_MODE, bool_to_sqlite(enabled))
    }
}

impl HistoryStore for SqliteStore {
    fn load_history(&self) -> PersistenceResult<Vec<UpdateResult>> {
        self.with_connection("load_history", |connection| {
            ensure_schema_ready(connection)?;
            let mut statement = connection.prepare(
                "
SELECT packages_json, recorded_at_unix, recorded_at_nanos
FROM update_history
ORDER BY position ASC
LIMIT ?1
",
            )?;

            let rows = statement.query_map([HISTORY_CAPACITY as i64], |row| {
                let packages_json: String = row.get(0)?;
                let packages: Vec<UpgradedPackage> = serde_json::from_str(&packages_json)
                    .map_err(|error| {
                        rusqlite::Error::FromSqlConversionFailure(
                            0,
                            rusqlite::types::Type::Text,
                            Box::new(error),
                        )
                    })?;
                Ok(UpdateResult::new(
                    packages,
                    unix_to_system_time(row.get(1)?, row.get(2)?),
                ))
            })?;

            rows.collect()
        })
    }

    fn save_history(&self, entries: &[UpdateResult]) -> PersistenceResult<()> {
        self.with_connection("save_history", |connection| {
            ensure_schema_ready(connection)?;
            let transaction = connection.transaction()?;
            transaction.execute("DELETE FROM update_history", [])?;
            {
                let mut statement = transaction.prepare(
                    "
INSERT INTO update_history (position, packages_json, recorded_at_unix, recorded_at_nanos)
VALUES (?1, ?2, ?3, ?4)
",
                )?;
                for (position, entry) in entries
                    .iter()
                    .filter(|entry| !entry.is_empty())
                    .take(HISTORY_CAPACITY)
                    .enumerate()
                {
                    let packages_json = serde_json::to_string(&entry.packages)
                        .map_err(|error| rusqlite::Error::ToSqlConversionFailure(Box::new(error)))?;
                    let (secs, nanos) = system_time_to_unix(entry.timestamp);
                    statement.execute(params![position as i64, packages_json, secs, nanos])?;
                }
            }
            transaction.commit()?;
            Ok(())
        })
    }
}

fn open_connection(database_path: &Path) -> rusqlite::Result<Connection> {
    if let Some(parent) = database_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|error| rusqlite::Error::ToSqlConversionFailure(Box::new(error)))?;
    }
    Connection::open(database_path)
}

fn ensure_migrations_table(connection: &Connection) -> rusqlite::Result<()> {
    connection.execute_batch(&format!(
        "
CREATE TABLE IF NOT EXISTS {MIGRATIONS_TABLE} (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at_unix INTEGER NOT NULL
);
"
    ))?;
    Ok(())
}

fn ensure_schema_ready(connection: &Connection) -> rusqlite::Result<()> {
    ensure_migrations_table(connection)?;
    let version = read_current_version(connection)?;
    if version < current_schema_version() {
        return Err(storage_error_sqlite(
            "database schema is not up to date; apply migrations before reading settings or history",
        ));
    }
    Ok(())
}

fn read_current_version(connection: &Connection) -> rusqlite::Result<i64> {
    connection.query_row(
        &format!("SELECT COALESCE(MAX(version), 0) FROM {MIGRATIONS_TABLE}"),
        [],
        |row| row.get(0),
    )
}

fn defined_migration(version: i64) -> rusqlite::Result<&'static SqliteMigration> {
    migration(version).ok_or_else(|| {
        storage_error_sqlite(&format!("migration version '{version}' is not defined"))
    })
}

fn apply_up_migration(
    connection: &mut Connection,
    migration: &SqliteMigration,
) -> rusqlite::Result<()> {
    let transaction = connection.transaction()?;
    transaction.execute_batch(migration.up_sql)?;
    transaction.execute(
        &format!(
            "INSERT INTO {MIGRATIONS_TABLE} (version, name, applied_at_unix)
             VALUES (?1, ?2, strftime('%s', 'now'))"
        ),
        (migration.version, migration.name),
    )?;
    transaction.commit()?;
    Ok(())
}

fn apply_down_migration(
    connection: &mut Connection,
    migration: &SqliteMigration,
) -> rusqlite::Result<()> {
    let transaction = connection.transaction()?;
    transaction.execute_batch(migration.down_sql)?;
    transaction.execute(
        &format!("DELETE FROM {MIGRATIONS_TABLE} WHERE version = ?1"),
        [migration.version],
    )?;
    transaction.commit()?;
    Ok(())
}

fn bool_to_sqlite(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

fn sqlite_to_bool(value: &str) -> bool {
    value.trim() == "1"
}

fn system_time_to_unix(timestamp: SystemTime) -> (i64, i64) {
    let elapsed = timestamp.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
    (elapsed.as_secs() as i64, i64::from(elapsed.subsec_nanos()))
}

fn unix_to_system_time(secs: i64, nanos: i64) -> SystemTime {
    let secs = u64::try_from(secs).unwrap_or(0);
    let nanos = u32::try_from(nanos).unwrap_or(0).min(999_999_999);
    UNIX_EPOCH + Duration::new(secs, nanos)
}

fn storage_error(operation: &str, error: rusqlite::Error) -> CoreError {
    storage_error_text(operation, error.to_string())
}

fn storage_error_sqlite(message: &str) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(std::io::Error::other(message.to_string())))
}

fn storage_error_text(operation: &str, message: impl AsRef<str>) -> CoreError {
    CoreError::new(
        CoreErrorKind::StorageFailure,
        format!("sqlite store '{operation}' failed: {}", message.as_ref()),
    )
}
