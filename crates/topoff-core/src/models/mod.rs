pub mod error;
pub mod history;
pub mod operation;
pub mod package;
pub mod settings;

pub use error::{CoreError, CoreErrorKind};
pub use history::{CleanupResult, HISTORY_CAPACITY, UpdateHistory, UpdateResult};
pub use operation::BrewOperation;
pub use package::{OutdatedPackage, UNKNOWN_VERSION, UpgradedPackage};
pub use settings::{AppSettings, DEFAULT_CHECK_INTERVAL_SECONDS};
