use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Subcommand;
use topoff_core::collaborators::{Collaborators, ConfirmationPrompt, DenyElevation};
use topoff_core::execution::TokioProcessExecutor;
use topoff_core::models::{CoreError, CoreErrorKind};
use topoff_core::orchestration::{OrchestratorConfig, OrchestratorStores, UpdateOrchestrator};
use topoff_core::sqlite::SqliteStore;

use crate::host::{LaunchAgentRegistrar, TerminalNotifier, TerminalPrompt};

mod history;
mod operations;
mod run;
mod settings;
mod version;

#[derive(Subcommand)]
pub enum Commands {
    /// Stay resident, checking for updates on the configured interval
    Run,

    /// Check for outdated packages once
    Check,

    /// Upgrade every outdated package, or a single one
    Upgrade {
        /// Package to upgrade (all outdated packages if omitted)
        package: Option<String>,

        /// Include casks that update themselves
        #[arg(long)]
        greedy: bool,
    },

    /// Remove old versions and caches
    Cleanup,

    /// Show recent upgrades
    History {
        /// Forget all recorded upgrades
        #[arg(long)]
        clear: bool,
    },

    /// Show or change preferences
    Settings {
        /// Seconds between automatic checks (0 disables them)
        #[arg(long, value_name = "SECS")]
        interval: Option<f64>,

        /// Clean up after upgrading everything
        #[arg(long, value_name = "BOOL")]
        auto_cleanup: Option<bool>,

        /// Upgrade self-updating casks too
        #[arg(long, value_name = "BOOL")]
        greedy: Option<bool>,

        /// Start the agent when you log in
        #[arg(long, value_name = "BOOL")]
        launch_at_login: Option<bool>,
    },

    /// Look for a newer TopOff release
    VersionCheck,
}

/// `$HOME/Library/Application Support/TopOff/topoff.sqlite3`
pub fn default_database_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join("Library")
            .join("Application Support")
            .join("TopOff")
            .join("topoff.sqlite3"),
    )
}

pub async fn execute(
    command: Commands,
    db_path: PathBuf,
    brew: Option<PathBuf>,
) -> Result<(), CoreError> {
    let orchestrator = move || -> Result<UpdateOrchestrator, CoreError> {
        build_orchestrator(open_store(&db_path)?, brew)
    };

    match command {
        Commands::Run => run::run(orchestrator()?).await,
        Commands::Check => operations::check(&orchestrator()?).await,
        Commands::Upgrade { package, greedy } => {
            operations::upgrade(&orchestrator()?, package.as_deref(), greedy).await
        }
        Commands::Cleanup => operations::cleanup(&orchestrator()?).await,
        Commands::History { clear } => history::run(&orchestrator()?, clear),
        Commands::Settings {
            interval,
            auto_cleanup,
            greedy,
            launch_at_login,
        } => settings::run(
            &orchestrator()?,
            settings::SettingsChanges {
                interval,
                auto_cleanup,
                greedy,
                launch_at_login,
            },
        ),
        Commands::VersionCheck => version::run().await,
    }
}

fn open_store(db_path: &Path) -> Result<Arc<SqliteStore>, CoreError> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).map_err(|error| {
            CoreError::new(
                CoreErrorKind::StorageFailure,
                format!("failed to create '{}': {error}", parent.display()),
            )
        })?;
    }

    let store = SqliteStore::new(db_path);
    store.migrate_to_latest()?;
    tracing::debug!(path = %db_path.display(), "database ready");
    Ok(Arc::new(store))
}

fn build_orchestrator(
    store: Arc<SqliteStore>,
    brew: Option<PathBuf>,
) -> Result<UpdateOrchestrator, CoreError> {
    let confirmation: Arc<dyn ConfirmationPrompt> = if std::io::stdin().is_terminal() {
        Arc::new(TerminalPrompt)
    } else {
        Arc::new(DenyElevation)
    };

    let collaborators = Collaborators {
        notifications: Arc::new(TerminalNotifier),
        confirmation,
        launch_at_login: Arc::new(LaunchAgentRegistrar::for_current_user()?),
    };

    let config = OrchestratorConfig {
        brew_path: brew,
        ..OrchestratorConfig::default()
    };

    Ok(UpdateOrchestrator::builder(Arc::new(TokioProcessExecutor))
        .config(config)
        .stores(OrchestratorStores::shared(store))
        .collaborators(collaborators)
        .build())
}
