use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use tokio::sync::watch;

use crate::brew::{
    BREW_CANDIDATE_PATHS, BrewCommands, REFRESH_TIMEOUT, locate_brew, parse_cleanup_output,
    parse_outdated_packages, parse_upgraded_packages, upgrading_status,
};
use crate::collaborators::Collaborators;
use crate::execution::{
    CommandRunner, ExecutionResult, OutputLineSink, PrivilegedCommandRunner, ProcessExecutor,
    ProcessSpawnRequest,
};
use crate::models::{
    CleanupResult, CoreError, CoreErrorKind, OutdatedPackage, UpdateHistory, UpdateResult,
    UpgradedPackage,
};
use crate::orchestration::permission::{PermissionPolicy, PhrasePermissionPolicy};
use crate::orchestration::state::{
    Effect, Event, OperationKind, OrchestratorSnapshot, OrchestratorState, transition,
};
use crate::persistence::{HistoryStore, InMemoryStore, SettingsStore};

pub const DEFAULT_CHECKMARK_HOLD: Duration = Duration::from_secs(1);

#[derive(Clone, Debug, PartialEq)]
pub struct OrchestratorConfig {
    /// Overrides discovery under the known installation prefixes.
    pub brew_path: Option<PathBuf>,
    /// `PATH` inherited by brew, after the installation prefixes.
    pub inherited_path: Option<String>,
    pub checkmark_hold: Duration,
    pub refresh_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            brew_path: None,
            inherited_path: std::env::var("PATH").ok(),
            checkmark_hold: DEFAULT_CHECKMARK_HOLD,
            refresh_timeout: REFRESH_TIMEOUT,
        }
    }
}

#[derive(Clone)]
pub struct OrchestratorStores {
    pub settings: Arc<dyn SettingsStore>,
    pub history: Arc<dyn HistoryStore>,
}

impl OrchestratorStores {
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: SettingsStore + HistoryStore + 'static,
    {
        Self {
            settings: store.clone(),
            history: store,
        }
    }
}

impl Default for OrchestratorStores {
    fn default() -> Self {
        Self::shared(Arc::new(InMemoryStore::new()))
    }
}

/// How a gated operation ended.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OperationOutcome<T> {
    /// Another operation was running; nothing happened.
    Skipped,
    Completed(T),
    Failed(CoreError),
}

impl<T> OperationOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

pub struct OrchestratorBuilder {
    executor: Arc<dyn ProcessExecutor>,
    privileged: Option<PrivilegedCommandRunner>,
    config: OrchestratorConfig,
    stores: OrchestratorStores,
    collaborators: Collaborators,
    permission_policy: Arc<dyn PermissionPolicy>,
}

impl OrchestratorBuilder {
    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn stores(mut self, stores: OrchestratorStores) -> Self {
        self.stores = stores;
        self
    }

    pub fn collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = collaborators;
        self
    }

    pub fn permission_policy(mut self, policy: Arc<dyn PermissionPolicy>) -> Self {
        self.permission_policy = policy;
        self
    }

    pub fn privileged_runner(mut self, runner: PrivilegedCommandRunner) -> Self {
        self.privileged = Some(runner);
        self
    }

    /// Loads persisted settings and history. Unreadable stores fall back to defaults.
    pub fn build(self) -> UpdateOrchestrator {
        let settings = self.stores.settings.load_settings().unwrap_or_else(|error| {
            tracing::error!(message = %error.message, "failed to load settings; using defaults");
            Default::default()
        });
        let history = self.stores.history.load_history().unwrap_or_else(|error| {
            tracing::error!(message = %error.message, "failed to load update history");
            Vec::new()
        });

        let state = OrchestratorState {
            settings,
            history: UpdateHistory::from_entries(history),
            ..OrchestratorState::default()
        };
        let (snapshots, _) = watch::channel(state.snapshot());

        let privileged = self
            .privileged
            .unwrap_or_else(|| PrivilegedCommandRunner::new(self.executor.clone()));

        UpdateOrchestrator {
            inner: Arc::new(Inner {
                runner: CommandRunner::new(self.executor),
                privileged,
                config: self.config,
                stores: self.stores,
                collaborators: self.collaborators,
                permission_policy: self.permission_policy,
                state: Arc::new(Mutex::new(state)),
                snapshots: Arc::new(snapshots),
                missing_brew_reported: AtomicBool::new(false),
            }),
        }
    }
}

/// Owns outdated/skipped packages, last results, history and the icon state machine, and
/// sequences brew operations one at a time.
///
/// Cloning is cheap and every clone drives the same state. Operations that win the running
/// gate run to completion on their own task even if the caller stops awaiting them.
#[derive(Clone)]
pub struct UpdateOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    runner: CommandRunner,
    privileged: PrivilegedCommandRunner,
    config: OrchestratorConfig,
    stores: OrchestratorStores,
    collaborators: Collaborators,
    permission_policy: Arc<dyn PermissionPolicy>,
    state: Arc<Mutex<OrchestratorState>>,
    snapshots: Arc<watch::Sender<OrchestratorSnapshot>>,
    missing_brew_reported: AtomicBool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Privilege {
    User,
    Elevated,
}

#[derive(Clone, Debug)]
enum UpgradeTarget {
    All { greedy: bool },
    Package(String),
}

impl UpgradeTarget {
    fn package(&self) -> Option<&str> {
        match self {
            Self::All { .. } => None,
            Self::Package(name) => Some(name),
        }
    }
}

impl UpdateOrchestrator {
    pub fn builder(executor: Arc<dyn ProcessExecutor>) -> OrchestratorBuilder {
        OrchestratorBuilder {
            executor,
            privileged: None,
            config: OrchestratorConfig::default(),
            stores: OrchestratorStores::default(),
            collaborators: Collaborators::default(),
            permission_policy: Arc::new(PhrasePermissionPolicy::default()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<OrchestratorSnapshot> {
        self.inner.snapshots.subscribe()
    }

    pub fn snapshot(&self) -> OrchestratorSnapshot {
        self.inner.with_state(|state| state.snapshot())
    }

    pub fn is_running(&self) -> bool {
        self.inner.with_state(|state| state.machine.is_running())
    }

    /// Fetches brew metadata and the outdated list. Returns `false` when the request was
    /// dropped or the refresh failed; failures are logged, not surfaced.
    pub async fn refresh(&self) -> bool {
        if !self.inner.begin(OperationKind::Refresh) {
            return false;
        }
        let inner = self.inner.clone();
        tokio::spawn(async move { inner.refresh().await })
            .await
            .unwrap_or_else(|error| {
                self.inner.abandoned(OperationKind::Refresh, &error);
                false
            })
    }

    pub async fn update_all(&self, greedy: bool) -> OperationOutcome<UpdateResult> {
        if !self.inner.begin(OperationKind::UpdateAll) {
            return OperationOutcome::Skipped;
        }
        let inner = self.inner.clone();
        tokio::spawn(async move { inner.update_all(greedy).await })
            .await
            .unwrap_or_else(|error| {
                OperationOutcome::Failed(self.inner.abandoned(OperationKind::UpdateAll, &error))
            })
    }

    /// Completes with `None` when brew reports nothing for `name` and the last refresh did
    /// not list it as outdated; history is left untouched in that case.
    pub async fn upgrade_package(&self, name: &str) -> OperationOutcome<Option<UpgradedPackage>> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return OperationOutcome::Failed(CoreError::new(
                CoreErrorKind::InvalidInput,
                "package name must not be empty",
            ));
        }
        if !self.inner.begin(OperationKind::UpgradePackage) {
            return OperationOutcome::Skipped;
        }
        let inner = self.inner.clone();
        tokio::spawn(async move { inner.upgrade_package(name).await })
            .await
            .unwrap_or_else(|error| {
                OperationOutcome::Failed(
                    self.inner.abandoned(OperationKind::UpgradePackage, &error),
                )
            })
    }

    pub async fn run_cleanup(&self) -> OperationOutcome<CleanupResult> {
        if !self.inner.begin(OperationKind::Cleanup) {
            return OperationOutcome::Skipped;
        }
        let inner = self.inner.clone();
        tokio::spawn(async move { inner.run_cleanup().await })
            .await
            .unwrap_or_else(|error| {
                OperationOutcome::Failed(self.inner.abandoned(OperationKind::Cleanup, &error))
            })
    }

    /// Hides `name` from the visible outdated list until the next refresh. Returns `false`
    /// when it was already skipped.
    pub fn skip_package(&self, name: &str) -> bool {
        self.inner.update(|state| {
            let inserted = state.skipped_packages.insert(name.to_string());
            let has_visible_updates = state.has_visible_updates();
            apply(
                state,
                Event::VisibleChanged {
                    has_visible_updates,
                },
            );
            inserted
        })
    }

    pub fn clear_history(&self) -> Result<(), CoreError> {
        self.inner.update(|state| state.history.clear());
        self.inner.stores.history.save_history(&[]).inspect_err(|error| {
            tracing::error!(message = %error.message, "failed to persist cleared history");
        })
    }

    /// Re-reads persisted settings, picking up changes written by another process.
    /// Returns whether anything changed; subscribers are only notified in that case.
    pub fn reload_settings(&self) -> Result<bool, CoreError> {
        let settings = self.inner.stores.settings.load_settings().inspect_err(|error| {
            tracing::warn!(message = %error.message, "failed to reload settings");
        })?;
        if self.inner.with_state(|state| state.settings == settings) {
            return Ok(false);
        }
        tracing::info!(
            interval_seconds = settings.check_interval_seconds,
            "persisted settings changed"
        );
        self.inner.update(|state| state.settings = settings);
        Ok(true)
    }

    pub fn set_check_interval(&self, seconds: f64) -> Result<(), CoreError> {
        if !seconds.is_finite() {
            return Err(CoreError::new(
                CoreErrorKind::InvalidInput,
                format!("check interval must be finite, got '{seconds}'"),
            ));
        }
        self.inner
            .update(|state| state.settings.check_interval_seconds = seconds);
        self.inner
            .persist_setting("check_interval_seconds", |store| store.set_check_interval(seconds))
    }

    pub fn set_auto_cleanup(&self, enabled: bool) -> Result<(), CoreError> {
        self.inner.update(|state| state.settings.auto_cleanup = enabled);
        self.inner
            .persist_setting("auto_cleanup", |store| store.set_auto_cleanup(enabled))
    }

    pub fn set_greedy_mode(&self, enabled: bool) -> Result<(), CoreError> {
        self.inner.update(|state| state.settings.greedy_mode = enabled);
        self.inner
            .persist_setting("greedy_mode", |store| store.set_greedy_mode(enabled))
    }

    /// Persists the flag, then asks the registrar to follow it. Registrar failures are logged only.
    pub fn set_launch_at_login(&self, enabled: bool) -> Result<(), CoreError> {
        self.inner
            .update(|state| state.settings.launch_at_login = enabled);
        self.inner
            .persist_setting("launch_at_login", |store| store.set_launch_at_login(enabled))?;

        let registrar = &self.inner.collaborators.launch_at_login;
        let registered = if enabled {
            registrar.register()
        } else {
            registrar.unregister()
        };
        if let Err(error) = registered {
            tracing::warn!(
                enabled,
                kind = ?error.kind,
                message = %error.message,
                "launch-at-login registration failed"
            );
        }
        Ok(())
    }
}

impl Inner {
    fn with_state<T>(&self, read: impl FnOnce(&OrchestratorState) -> T) -> T {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        read(&state)
    }

    /// Mutates state under the lock and publishes a fresh snapshot.
    fn update<T>(&self, mutate: impl FnOnce(&mut OrchestratorState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let value = mutate(&mut state);
        self.snapshots.send_replace(state.snapshot());
        value
    }

    /// Atomic check-and-set of the running gate.
    fn begin(&self, kind: OperationKind) -> bool {
        let started = self.update(|state| {
            apply(state, Event::Requested(kind)).contains(&Effect::Start(kind))
        });
        if !started {
            tracing::debug!(operation = ?kind, "operation already running; request dropped");
        }
        started
    }

    fn abandoned(&self, kind: OperationKind, error: &tokio::task::JoinError) -> CoreError {
        tracing::error!(operation = ?kind, error = %error, "operation task ended abnormally");
        self.update(|state| {
            state.status_message = None;
            apply(state, Event::OperationFailed);
        });
        CoreError::new(
            CoreErrorKind::Internal,
            format!("{kind:?} task ended abnormally: {error}"),
        )
    }

    async fn refresh(&self) -> bool {
        match self.fetch_outdated().await {
            Ok(packages) => {
                let count = packages.len();
                self.update(|state| {
                    state.outdated_packages = packages;
                    state.skipped_packages.clear();
                    let has_visible_updates = state.has_visible_updates();
                    apply(
                        state,
                        Event::RefreshSucceeded {
                            has_visible_updates,
                        },
                    );
                });
                tracing::info!(outdated = count, "refresh finished");
                true
            }
            Err(error) => {
                tracing::warn!(
                    kind = ?error.kind,
                    message = %error.message,
                    "refresh failed"
                );
                if error.kind == CoreErrorKind::ExecutableNotFound {
                    self.surface_failure(&error);
                }
                self.update(|state| apply(state, Event::RefreshFailed));
                false
            }
        }
    }

    async fn fetch_outdated(&self) -> ExecutionResult<Vec<OutdatedPackage>> {
        let commands = self.brew_commands()?;
        self.runner
            .run(commands.update().timeout(self.config.refresh_timeout))
            .await?;
        let output = self.runner.run(commands.list_outdated()).await?;
        Ok(parse_outdated_packages(&output))
    }

    async fn update_all(&self, greedy: bool) -> OperationOutcome<UpdateResult> {
        let output = match self.run_upgrade(UpgradeTarget::All { greedy }).await {
            Ok(output) => output,
            Err(error) => return OperationOutcome::Failed(self.fail(error)),
        };

        let result = UpdateResult::new(parse_upgraded_packages(&output), SystemTime::now());
        let history = self.update(|state| {
            state.outdated_packages.clear();
            state.skipped_packages.clear();
            state.status_message = None;
            state.last_update_result = Some(result.clone());
            state
                .history
                .record(result.clone())
                .then(|| state.history.entries().to_vec())
        });
        if let Some(entries) = history {
            self.persist_history(&entries);
        }

        if self.with_state(|state| state.settings.auto_cleanup) {
            self.cleanup_best_effort().await;
        }

        let message = if result.is_empty() {
            "Everything is up to date!".to_string()
        } else {
            format!("{} package(s) upgraded", result.count())
        };
        tracing::info!(upgraded = result.count(), greedy, "upgrade finished");
        self.celebrate(&message).await;
        OperationOutcome::Completed(result)
    }

    async fn upgrade_package(&self, name: String) -> OperationOutcome<Option<UpgradedPackage>> {
        let output = match self.run_upgrade(UpgradeTarget::Package(name.clone())).await {
            Ok(output) => output,
            Err(error) => return OperationOutcome::Failed(self.fail(error)),
        };

        let parsed = parse_upgraded_packages(&output);
        let now = SystemTime::now();
        let (upgraded, history) = self.update(|state| {
            let upgraded = resolve_upgraded(&name, parsed, &state.outdated_packages);
            state.outdated_packages.retain(|package| package.name != name);
            state.skipped_packages.remove(&name);
            state.status_message = None;

            // Nothing was reported or expected: brew had nothing to do.
            let Some(upgraded) = upgraded else {
                return (None, None);
            };

            let previous = state.last_update_result.as_ref().map(|result| result.timestamp);
            let mut result = state
                .last_update_result
                .take()
                .unwrap_or_else(|| UpdateResult::new(Vec::new(), now));
            result.merge(upgraded.clone());
            result.timestamp = now;

            let recorded = state.history.replace_or_record(previous, result.clone());
            state.last_update_result = Some(result);
            (
                Some(upgraded),
                recorded.then(|| state.history.entries().to_vec()),
            )
        });
        if let Some(entries) = history {
            self.persist_history(&entries);
        }

        let message = if upgraded.is_some() {
            format!("{name} upgraded")
        } else {
            format!("{name} is already up to date")
        };
        tracing::info!(package = %name, upgraded = upgraded.is_some(), "package upgrade finished");
        self.celebrate(&message).await;
        OperationOutcome::Completed(upgraded)
    }

    async fn run_cleanup(&self) -> OperationOutcome<CleanupResult> {
        let outcome = match self.cleanup_once().await {
            Ok(result) => {
                tracing::info!(freed = %result.freed_space, "cleanup finished");
                OperationOutcome::Completed(result)
            }
            Err(error) => {
                tracing::warn!(
                    kind = ?error.kind,
                    message = %error.message,
                    "cleanup failed"
                );
                self.surface_failure(&error);
                OperationOutcome::Failed(error)
            }
        };
        self.update(|state| apply(state, Event::CleanupFinished));
        outcome
    }

    async fn cleanup_best_effort(&self) {
        if let Err(error) = self.cleanup_once().await {
            tracing::warn!(
                kind = ?error.kind,
                message = %error.message,
                "post-upgrade cleanup failed"
            );
        }
    }

    async fn cleanup_once(&self) -> ExecutionResult<CleanupResult> {
        let commands = self.brew_commands()?;
        let output = self.runner.run(commands.cleanup()).await?;
        let result = CleanupResult {
            freed_space: parse_cleanup_output(&output),
            timestamp: SystemTime::now(),
        };
        self.update(|state| state.last_cleanup_result = Some(result.clone()));
        Ok(result)
    }

    /// Runs the upgrade as the current user and, when the failure reads like a permission
    /// problem and the user agrees, once more through the administrator prompt.
    async fn run_upgrade(&self, target: UpgradeTarget) -> ExecutionResult<String> {
        let error = match self.run_sequence(Privilege::User, &target).await {
            Ok(output) => return Ok(output),
            Err(error) => error,
        };

        if error.kind != CoreErrorKind::CommandFailed
            || !self.permission_policy.is_permission_error(&error.message)
        {
            return Err(error);
        }

        tracing::info!(
            package = target.package().unwrap_or("*"),
            "upgrade failed with a permission error; asking to retry with administrator privileges"
        );
        if !self.confirm_elevation(target.package()).await {
            tracing::info!("elevated retry declined");
            return Err(error);
        }

        self.run_sequence(Privilege::Elevated, &target).await
    }

    async fn run_sequence(
        &self,
        privilege: Privilege,
        target: &UpgradeTarget,
    ) -> ExecutionResult<String> {
        let commands = self.brew_commands()?;
        let steps = match target {
            UpgradeTarget::All { greedy } => vec![
                commands.update().timeout(self.config.refresh_timeout),
                commands.upgrade_all(*greedy),
            ],
            UpgradeTarget::Package(name) => vec![commands.upgrade_package(name)],
        };

        let mut output = String::new();
        for request in steps {
            output = self.run_step(privilege, request).await?;
        }
        Ok(output)
    }

    async fn run_step(
        &self,
        privilege: Privilege,
        request: ProcessSpawnRequest,
    ) -> ExecutionResult<String> {
        let sink = self.status_sink();
        match privilege {
            Privilege::User => self.runner.run_streaming(request, sink).await,
            Privilege::Elevated => self.privileged.run_streaming(request, sink).await,
        }
    }

    fn status_sink(&self) -> OutputLineSink {
        let snapshots = self.snapshots.clone();
        let state = self.state.clone();
        Arc::new(move |line: &str| {
            if let Some(status) = upgrading_status(line) {
                let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
                state.status_message = Some(status);
                snapshots.send_replace(state.snapshot());
            }
        })
    }

    async fn confirm_elevation(&self, package: Option<&str>) -> bool {
        let prompt = self.collaborators.confirmation.clone();
        let package = package.map(str::to_string);
        tokio::task::spawn_blocking(move || prompt.confirm_elevation(package.as_deref()))
            .await
            .unwrap_or_else(|error| {
                tracing::error!(error = %error, "confirmation prompt failed");
                false
            })
    }

    async fn celebrate(&self, message: &str) {
        let effects = self.update(|state| {
            state.status_message = None;
            let has_visible_updates = state.has_visible_updates();
            apply(
                state,
                Event::UpgradeSucceeded {
                    has_visible_updates,
                },
            )
        });
        self.collaborators.notifications.notify(true, message);

        if effects.contains(&Effect::HoldCheckmark) {
            tokio::time::sleep(self.config.checkmark_hold).await;
        }
        self.update(|state| apply(state, Event::CheckmarkElapsed));
    }

    fn fail(&self, error: CoreError) -> CoreError {
        tracing::error!(
            operation = ?error.operation,
            kind = ?error.kind,
            message = %error.message,
            "upgrade failed"
        );
        self.update(|state| {
            state.status_message = None;
            apply(state, Event::OperationFailed);
        });
        self.surface_failure(&error);
        error
    }

    /// Notifies the user; a missing brew executable is only reported the first time.
    fn surface_failure(&self, error: &CoreError) {
        if error.kind == CoreErrorKind::ExecutableNotFound
            && self.missing_brew_reported.swap(true, Ordering::SeqCst)
        {
            tracing::debug!("brew still missing; notification already shown");
            return;
        }
        self.collaborators
            .notifications
            .notify(false, &error.description());
    }

    fn brew_commands(&self) -> ExecutionResult<BrewCommands> {
        let brew = match &self.config.brew_path {
            Some(path) => path.clone(),
            None => locate_brew(BREW_CANDIDATE_PATHS).ok_or_else(CoreError::executable_not_found)?,
        };
        Ok(BrewCommands::new(brew, self.config.inherited_path.as_deref()))
    }

    fn persist_history(&self, entries: &[UpdateResult]) {
        if let Err(error) = self.stores.history.save_history(entries) {
            tracing::error!(message = %error.message, "failed to persist update history");
        }
    }

    fn persist_setting(
        &self,
        key: &'static str,
        write: impl FnOnce(&dyn SettingsStore) -> Result<(), CoreError>,
    ) -> Result<(), CoreError> {
        write(self.stores.settings.as_ref()).inspect_err(|error| {
            tracing::error!(key, message = %error.message, "failed to persist setting");
        })
    }
}

fn apply(state: &mut OrchestratorState, event: Event) -> Vec<Effect> {
    let (machine, effects) = transition(state.machine, event);
    state.machine = machine;
    effects
}

/// Picks the entry for `name` from the parsed output, preferring real versions; falls back
/// to the versions from the last refresh. `None` when neither source knows the package.
fn resolve_upgraded(
    name: &str,
    parsed: Vec<UpgradedPackage>,
    outdated: &[OutdatedPackage],
) -> Option<UpgradedPackage> {
    let known = outdated
        .iter()
        .find(|package| package.name == name)
        .map(UpgradedPackage::from);
    match parsed.into_iter().find(|package| package.name == name) {
        Some(package) if package.has_versions() => Some(package),
        Some(package) => Some(known.unwrap_or(package)),
        None => known,
    }
}

#[cfg(test)]
mod tests {
    use super::resolve_upgraded;
    use crate::models::{OutdatedPackage, UpgradedPackage};

    fn outdated(name: &str) -> OutdatedPackage {
        OutdatedPackage {
            name: name.to_string(),
            current_version: "1.21".to_string(),
            latest_version: "1.24".to_string(),
        }
    }

    #[test]
    fn parsed_versions_win_over_refresh_versions() {
        let parsed = vec![UpgradedPackage::new("wget", "1.22", "1.24")];
        assert_eq!(
            resolve_upgraded("wget", parsed, &[outdated("wget")]),
            Some(UpgradedPackage::new("wget", "1.22", "1.24"))
        );
    }

    #[test]
    fn unversioned_output_uses_refresh_versions() {
        let parsed = vec![UpgradedPackage::unversioned("wget")];
        assert_eq!(
            resolve_upgraded("wget", parsed, &[outdated("wget")]),
            Some(UpgradedPackage::new("wget", "1.21", "1.24"))
        );
    }

    #[test]
    fn bare_upgrade_line_is_kept_unversioned() {
        let parsed = vec![UpgradedPackage::unversioned("node")];
        assert_eq!(
            resolve_upgraded("node", parsed, &[outdated("wget")]),
            Some(UpgradedPackage::unversioned("node"))
        );
    }

    #[test]
    fn package_unknown_to_output_and_refresh_resolves_to_nothing() {
        assert_eq!(
            resolve_upgraded("node", Vec::new(), &[outdated("wget")]),
            None
        );
    }
}
