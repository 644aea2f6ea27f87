use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::Notify;

use topoff_core::collaborators::{
    Collaborators, ConfirmationPrompt, LaunchAtLoginRegistrar, NotificationSink,
};
use topoff_core::execution::{
    ExecutionResult, OutputLineSink, ProcessExecutor, ProcessExitStatus, ProcessOutput,
    ProcessSpawnRequest, ProcessWaitFuture, RunningProcess,
};
use topoff_core::models::{
    AppSettings, CoreError, CoreErrorKind, UpdateResult, UpgradedPackage,
};
use topoff_core::orchestration::{
    IconState, OperationOutcome, OrchestratorConfig, OrchestratorStores, UpdateOrchestrator,
};
use topoff_core::persistence::{HistoryStore, InMemoryStore, SettingsStore};

const BREW: &str = "/opt/homebrew/bin/brew";
const MISSING_BREW: &str = "/nonexistent/homebrew/bin/brew";

const OUTDATED_FIXTURE: &str = include_str!("fixtures/brew/outdated_verbose.txt");
const UPGRADE_FIXTURE: &str = include_str!("fixtures/brew/upgrade_all.txt");
const CLEANUP_FIXTURE: &str = include_str!("fixtures/brew/cleanup.txt");
const PERMISSION_FIXTURE: &str = include_str!("fixtures/brew/permission_denied.txt");

#[derive(Clone)]
struct Reply {
    exit_code: i32,
    output: String,
    gate: Option<Arc<Notify>>,
}

impl Reply {
    fn ok(output: &str) -> Self {
        Self {
            exit_code: 0,
            output: output.to_string(),
            gate: None,
        }
    }

    fn fail(output: &str) -> Self {
        Self {
            exit_code: 1,
            output: output.to_string(),
            gate: None,
        }
    }

    fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

/// Answers brew subcommands (keyed by first argument) and osascript (keyed `osascript`).
/// A route with several queued replies consumes them in order; the last one repeats.
#[derive(Default)]
struct ScriptedExecutor {
    routes: Mutex<HashMap<&'static str, VecDeque<Reply>>>,
    spawned: Mutex<Vec<ProcessSpawnRequest>>,
}

impl ScriptedExecutor {
    fn new() -> Self {
        Self::default()
    }

    fn route(self, key: &'static str, reply: Reply) -> Self {
        self.routes
            .lock()
            .unwrap()
            .entry(key)
            .or_default()
            .push_back(reply);
        self
    }

    fn spawned(&self) -> Vec<ProcessSpawnRequest> {
        self.spawned.lock().unwrap().clone()
    }

    fn spawned_keys(&self) -> Vec<String> {
        self.spawned().iter().map(route_key).collect()
    }

    fn next_reply(&self, key: &str) -> Reply {
        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap_or_else(|| Reply::ok("")),
            None => Reply::ok(""),
        }
    }
}

fn route_key(request: &ProcessSpawnRequest) -> String {
    let program = request.command.program.to_string_lossy();
    if program.ends_with("osascript") {
        "osascript".to_string()
    } else {
        request.command.args.first().cloned().unwrap_or_default()
    }
}

impl ProcessExecutor for ScriptedExecutor {
    fn spawn(&self, request: ProcessSpawnRequest) -> ExecutionResult<Box<dyn RunningProcess>> {
        self.spawned.lock().unwrap().push(request.clone());

        if request.command.program == PathBuf::from(MISSING_BREW) {
            return Err(CoreError {
                operation: Some(request.operation),
                kind: CoreErrorKind::ExecutableNotFound,
                message: "No such file or directory".to_string(),
            });
        }

        let reply = self.next_reply(&route_key(&request));
        Ok(Box::new(ScriptedProcess { reply }))
    }
}

struct ScriptedProcess {
    reply: Reply,
}

impl RunningProcess for ScriptedProcess {
    fn pid(&self) -> Option<u32> {
        Some(4242)
    }

    fn wait(self: Box<Self>, lines: Option<OutputLineSink>) -> ProcessWaitFuture {
        let reply = self.reply;
        Box::pin(async move {
            if let Some(sink) = &lines {
                for line in reply.output.lines() {
                    sink(line);
                }
            }
            if let Some(gate) = &reply.gate {
                gate.notified().await;
            }
            let now = SystemTime::now();
            Ok(ProcessOutput {
                status: ProcessExitStatus::ExitCode(reply.exit_code),
                output: reply.output,
                started_at: now,
                finished_at: now,
            })
        })
    }
}

#[derive(Default)]
struct RecordingNotifier {
    events: Mutex<Vec<(bool, String)>>,
}

impl RecordingNotifier {
    fn events(&self) -> Vec<(bool, String)> {
        self.events.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, success: bool, message: &str) {
        self.events.lock().unwrap().push((success, message.to_string()));
    }
}

struct ScriptedPrompt {
    answer: bool,
    calls: Mutex<Vec<Option<String>>>,
}

impl ConfirmationPrompt for ScriptedPrompt {
    fn confirm_elevation(&self, package: Option<&str>) -> bool {
        self.calls.lock().unwrap().push(package.map(str::to_string));
        self.answer
    }
}

#[derive(Default)]
struct RecordingRegistrar {
    fail: bool,
    calls: Mutex<Vec<&'static str>>,
}

impl LaunchAtLoginRegistrar for RecordingRegistrar {
    fn register(&self) -> Result<(), CoreError> {
        self.calls.lock().unwrap().push("register");
        if self.fail {
            return Err(CoreError::new(CoreErrorKind::Internal, "registration refused"));
        }
        Ok(())
    }

    fn unregister(&self) -> Result<(), CoreError> {
        self.calls.lock().unwrap().push("unregister");
        Ok(())
    }
}

struct Harness {
    orchestrator: UpdateOrchestrator,
    executor: Arc<ScriptedExecutor>,
    notifier: Arc<RecordingNotifier>,
    prompt: Arc<ScriptedPrompt>,
    registrar: Arc<RecordingRegistrar>,
    store: Arc<InMemoryStore>,
}

struct HarnessOptions {
    brew: &'static str,
    confirm: bool,
    registrar_fails: bool,
    store: InMemoryStore,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            brew: BREW,
            confirm: false,
            registrar_fails: false,
            store: InMemoryStore::new(),
        }
    }
}

fn config(brew: &str) -> OrchestratorConfig {
    OrchestratorConfig {
        brew_path: Some(PathBuf::from(brew)),
        inherited_path: Some("/usr/bin:/bin".to_string()),
        checkmark_hold: Duration::from_millis(5),
        refresh_timeout: Duration::from_secs(30),
    }
}

fn harness_with(executor: ScriptedExecutor, options: HarnessOptions) -> Harness {
    let executor = Arc::new(executor);
    let notifier = Arc::new(RecordingNotifier::default());
    let prompt = Arc::new(ScriptedPrompt {
        answer: options.confirm,
        calls: Mutex::new(Vec::new()),
    });
    let registrar = Arc::new(RecordingRegistrar {
        fail: options.registrar_fails,
        calls: Mutex::new(Vec::new()),
    });
    let store = Arc::new(options.store);

    let orchestrator = UpdateOrchestrator::builder(executor.clone())
        .config(config(options.brew))
        .stores(OrchestratorStores::shared(store.clone()))
        .collaborators(Collaborators {
            notifications: notifier.clone(),
            confirmation: prompt.clone(),
            launch_at_login: registrar.clone(),
        })
        .build();

    Harness {
        orchestrator,
        executor,
        notifier,
        prompt,
        registrar,
        store,
    }
}

fn harness(executor: ScriptedExecutor) -> Harness {
    harness_with(executor, HarnessOptions::default())
}

fn names(packages: &[topoff_core::models::OutdatedPackage]) -> Vec<&str> {
    packages.iter().map(|package| package.name.as_str()).collect()
}

#[tokio::test]
async fn refresh_lists_outdated_packages_and_sets_icon() {
    let h = harness(ScriptedExecutor::new().route("outdated", Reply::ok(OUTDATED_FIXTURE)));

    assert!(h.orchestrator.refresh().await);

    let snapshot = h.orchestrator.snapshot();
    assert_eq!(
        names(&snapshot.outdated_packages),
        vec!["wget", "node", "python@3.12"]
    );
    assert_eq!(snapshot.icon, IconState::UpdatesAvailable);
    assert!(!snapshot.is_running);

    let spawned = h.executor.spawned();
    assert_eq!(h.executor.spawned_keys(), vec!["update", "outdated"]);
    assert_eq!(spawned[1].command.args, vec!["outdated", "--verbose"]);
    assert_eq!(spawned[0].timeout, Some(Duration::from_secs(30)));
    assert_eq!(
        spawned[0].command.env.get("PATH").map(String::as_str),
        Some("/opt/homebrew/bin:/usr/local/bin:/usr/bin:/bin")
    );
}

#[tokio::test]
async fn refresh_failure_is_absorbed_and_resets_icon() {
    let h = harness(
        ScriptedExecutor::new()
            .route("outdated", Reply::ok(OUTDATED_FIXTURE))
            .route("update", Reply::ok(""))
            .route("update", Reply::fail("fatal: unable to access 'https://github.com/'")),
    );

    assert!(h.orchestrator.refresh().await);
    assert_eq!(h.orchestrator.snapshot().icon, IconState::UpdatesAvailable);

    assert!(!h.orchestrator.refresh().await);
    let snapshot = h.orchestrator.snapshot();
    assert_eq!(snapshot.icon, IconState::UpToDate);
    assert!(!snapshot.is_running);
    assert!(h.notifier.events().is_empty());
}

#[tokio::test]
async fn requests_while_running_are_dropped_without_side_effects() {
    let gate = Arc::new(Notify::new());
    let h = harness(
        ScriptedExecutor::new()
            .route("update", Reply::ok("").gated(gate.clone()))
            .route("outdated", Reply::ok(OUTDATED_FIXTURE)),
    );
    let mut snapshots = h.orchestrator.subscribe();

    let first = tokio::spawn({
        let orchestrator = h.orchestrator.clone();
        async move { orchestrator.refresh().await }
    });
    snapshots
        .wait_for(|snapshot| snapshot.is_running)
        .await
        .unwrap();

    let before = h.orchestrator.snapshot();
    assert!(!h.orchestrator.refresh().await);
    assert_eq!(
        h.orchestrator.update_all(false).await,
        OperationOutcome::Skipped
    );
    assert_eq!(
        h.orchestrator.upgrade_package("wget").await,
        OperationOutcome::Skipped
    );
    assert_eq!(h.orchestrator.run_cleanup().await, OperationOutcome::Skipped);

    let during = h.orchestrator.snapshot();
    assert_eq!(during.icon, IconState::Checking);
    assert_eq!(during.outdated_packages, before.outdated_packages);

    gate.notify_one();
    assert!(first.await.unwrap());
    assert_eq!(h.executor.spawned_keys(), vec!["update", "outdated"]);
    assert_eq!(h.orchestrator.snapshot().outdated_packages.len(), 3);
}

#[tokio::test]
async fn skipping_hides_packages_without_touching_outdated_list() {
    let h = harness(ScriptedExecutor::new().route("outdated", Reply::ok(OUTDATED_FIXTURE)));
    assert!(h.orchestrator.refresh().await);

    assert!(h.orchestrator.skip_package("node"));
    assert!(!h.orchestrator.skip_package("node"));

    let snapshot = h.orchestrator.snapshot();
    assert_eq!(snapshot.outdated_packages.len(), 3);
    assert_eq!(
        names(&snapshot.visible_outdated_packages),
        vec!["wget", "python@3.12"]
    );
    for package in &snapshot.outdated_packages {
        assert!(
            snapshot.visible_outdated_packages.contains(package)
                || snapshot.skipped_packages.contains(&package.name)
        );
    }

    h.orchestrator.skip_package("wget");
    h.orchestrator.skip_package("python@3.12");
    assert_eq!(h.orchestrator.snapshot().icon, IconState::UpToDate);
    assert!(h.executor.spawned_keys().len() == 2);

    // The next refresh starts from a clean skip list.
    assert!(h.orchestrator.refresh().await);
    let snapshot = h.orchestrator.snapshot();
    assert!(snapshot.skipped_packages.is_empty());
    assert_eq!(snapshot.icon, IconState::UpdatesAvailable);
}

#[tokio::test]
async fn update_all_records_history_cleans_up_and_notifies() {
    let h = harness(
        ScriptedExecutor::new()
            .route("outdated", Reply::ok(OUTDATED_FIXTURE))
            .route("upgrade", Reply::ok(UPGRADE_FIXTURE))
            .route("cleanup", Reply::ok(CLEANUP_FIXTURE)),
    );
    assert!(h.orchestrator.refresh().await);
    h.orchestrator.skip_package("node");

    let OperationOutcome::Completed(result) = h.orchestrator.update_all(false).await else {
        panic!("update_all should complete");
    };

    assert_eq!(result.count(), 3);
    assert_eq!(
        result.packages[0],
        UpgradedPackage::new("wget", "1.21.3", "1.24.5")
    );
    assert_eq!(
        h.executor.spawned_keys(),
        vec!["update", "outdated", "update", "upgrade", "cleanup"]
    );

    let snapshot = h.orchestrator.snapshot();
    assert!(snapshot.outdated_packages.is_empty());
    assert!(snapshot.skipped_packages.is_empty());
    assert_eq!(snapshot.icon, IconState::UpToDate);
    assert!(!snapshot.is_running);
    assert_eq!(snapshot.status_message, None);
    assert_eq!(snapshot.last_update_result.as_ref(), Some(&result));
    assert_eq!(snapshot.history, vec![result.clone()]);
    assert_eq!(
        snapshot
            .last_cleanup_result
            .map(|cleanup| cleanup.freed_space),
        Some("401.7MB".to_string())
    );

    assert_eq!(h.store.load_history().unwrap(), vec![result]);
    assert_eq!(
        h.notifier.events(),
        vec![(true, "3 package(s) upgraded".to_string())]
    );
}

#[tokio::test]
async fn empty_upgrade_is_not_recorded_in_history() {
    let h = harness(ScriptedExecutor::new().route("upgrade", Reply::ok("")));

    let outcome = h.orchestrator.update_all(false).await;
    assert!(matches!(&outcome, OperationOutcome::Completed(result) if result.is_empty()));

    let snapshot = h.orchestrator.snapshot();
    assert!(snapshot.history.is_empty());
    assert!(snapshot.last_update_result.is_some());
    assert_eq!(h.store.history_writes(), 0);
    assert_eq!(
        h.notifier.events(),
        vec![(true, "Everything is up to date!".to_string())]
    );
}

#[tokio::test]
async fn greedy_upgrade_without_auto_cleanup() {
    let store = InMemoryStore::with_state(
        AppSettings {
            auto_cleanup: false,
            ..AppSettings::default()
        },
        Vec::new(),
    );
    let h = harness_with(
        ScriptedExecutor::new().route("upgrade", Reply::ok(UPGRADE_FIXTURE)),
        HarnessOptions {
            store,
            ..HarnessOptions::default()
        },
    );

    assert!(h.orchestrator.update_all(true).await.is_completed());

    let spawned = h.executor.spawned();
    assert_eq!(h.executor.spawned_keys(), vec!["update", "upgrade"]);
    assert_eq!(spawned[1].command.args, vec!["upgrade", "--greedy"]);
    assert!(spawned[1].timeout.is_none());
    assert!(h.orchestrator.snapshot().last_cleanup_result.is_none());
}

#[tokio::test(start_paused = true)]
async fn upgrade_streams_status_and_holds_checkmark() {
    let gate = Arc::new(Notify::new());
    let h = harness(
        ScriptedExecutor::new()
            .route("upgrade", Reply::ok(UPGRADE_FIXTURE).gated(gate.clone())),
    );
    let mut snapshots = h.orchestrator.subscribe();

    let upgrade = tokio::spawn({
        let orchestrator = h.orchestrator.clone();
        async move { orchestrator.update_all(false).await }
    });

    let streaming = snapshots
        .wait_for(|snapshot| snapshot.status_message.as_deref() == Some("Upgrading python@3.12"))
        .await
        .unwrap()
        .clone();
    assert_eq!(streaming.icon, IconState::Updating);
    assert!(streaming.is_running);

    gate.notify_one();
    let checkmark = snapshots
        .wait_for(|snapshot| snapshot.icon == IconState::Checkmark)
        .await
        .unwrap()
        .clone();
    assert!(checkmark.is_running);
    assert_eq!(checkmark.status_message, None);

    assert!(upgrade.await.unwrap().is_completed());
    assert_eq!(h.orchestrator.snapshot().icon, IconState::UpToDate);
}

#[tokio::test]
async fn permission_failure_retries_whole_sequence_elevated_after_confirmation() {
    let h = harness_with(
        ScriptedExecutor::new()
            .route("upgrade", Reply::fail(PERMISSION_FIXTURE))
            .route("osascript", Reply::ok(UPGRADE_FIXTURE)),
        HarnessOptions {
            confirm: true,
            ..HarnessOptions::default()
        },
    );

    let outcome = h.orchestrator.update_all(false).await;
    let OperationOutcome::Completed(result) = outcome else {
        panic!("elevated retry should complete, got {outcome:?}");
    };
    assert_eq!(result.count(), 3);

    assert_eq!(*h.prompt.calls.lock().unwrap(), vec![None]);
    assert_eq!(
        h.executor.spawned_keys(),
        vec!["update", "upgrade", "osascript", "osascript", "cleanup"]
    );

    let spawned = h.executor.spawned();
    assert_eq!(spawned[2].command.args[0], "-e");
    assert!(spawned[2].command.args[1].contains("'update'"));
    assert!(spawned[3].command.args[1].contains("'upgrade'"));
    assert!(spawned[3].command.args[1].ends_with("with administrator privileges"));
}

#[tokio::test]
async fn declined_elevation_surfaces_the_unprivileged_failure() {
    let h = harness(
        ScriptedExecutor::new()
            .route("outdated", Reply::ok(OUTDATED_FIXTURE))
            .route("upgrade", Reply::fail(PERMISSION_FIXTURE)),
    );
    assert!(h.orchestrator.refresh().await);

    let outcome = h.orchestrator.upgrade_package("wget").await;
    let OperationOutcome::Failed(error) = outcome else {
        panic!("declined elevation should fail, got {outcome:?}");
    };
    assert_eq!(error.kind, CoreErrorKind::CommandFailed);

    assert_eq!(
        *h.prompt.calls.lock().unwrap(),
        vec![Some("wget".to_string())]
    );
    assert!(!h.executor.spawned_keys().contains(&"osascript".to_string()));

    let snapshot = h.orchestrator.snapshot();
    assert_eq!(snapshot.icon, IconState::UpdatesAvailable);
    assert!(!snapshot.is_running);
    assert_eq!(snapshot.outdated_packages.len(), 3);

    let events = h.notifier.events();
    assert_eq!(events.len(), 1);
    assert!(!events[0].0);
    assert!(events[0].1.starts_with("Brew command failed:"));
    assert!(events[0].1.contains("Permission denied"));
}

#[tokio::test]
async fn cancelled_elevation_is_terminal() {
    let h = harness_with(
        ScriptedExecutor::new()
            .route("upgrade", Reply::fail(PERMISSION_FIXTURE))
            .route(
                "osascript",
                Reply::fail("0:58: execution error: User canceled. (-128)"),
            ),
        HarnessOptions {
            confirm: true,
            ..HarnessOptions::default()
        },
    );

    let outcome = h.orchestrator.update_all(false).await;
    let OperationOutcome::Failed(error) = outcome else {
        panic!("cancelled elevation should fail, got {outcome:?}");
    };
    assert_eq!(error.kind, CoreErrorKind::UserCancelledElevation);

    let keys = h.executor.spawned_keys();
    assert_eq!(keys.iter().filter(|key| *key == "osascript").count(), 1);
    assert_eq!(h.prompt.calls.lock().unwrap().len(), 1);
    assert_eq!(
        h.notifier.events(),
        vec![(
            false,
            "Administrator authentication was cancelled.".to_string()
        )]
    );
    assert_eq!(h.orchestrator.snapshot().icon, IconState::UpToDate);
}

#[tokio::test]
async fn non_permission_failure_never_prompts() {
    let h = harness_with(
        ScriptedExecutor::new().route("upgrade", Reply::fail("Error: disk full")),
        HarnessOptions {
            confirm: true,
            ..HarnessOptions::default()
        },
    );

    let outcome = h.orchestrator.update_all(false).await;
    assert!(matches!(outcome, OperationOutcome::Failed(ref error) if error.kind == CoreErrorKind::CommandFailed));
    assert!(h.prompt.calls.lock().unwrap().is_empty());
    assert_eq!(
        h.notifier.events(),
        vec![(false, "Brew command failed: Error: disk full".to_string())]
    );
}

#[tokio::test]
async fn single_package_upgrades_merge_into_one_history_entry() {
    let h = harness(
        ScriptedExecutor::new()
            .route("outdated", Reply::ok(OUTDATED_FIXTURE))
            .route("upgrade", Reply::ok("==> Upgrading node\nnode 20.1.0 -> 22.0.0\n"))
            .route("upgrade", Reply::ok("==> Upgrading wget\n")),
    );
    assert!(h.orchestrator.refresh().await);
    h.orchestrator.skip_package("node");

    let outcome = h.orchestrator.upgrade_package("node").await;
    assert_eq!(
        outcome,
        OperationOutcome::Completed(Some(UpgradedPackage::new("node", "20.1.0", "22.0.0")))
    );
    let snapshot = h.orchestrator.snapshot();
    assert_eq!(names(&snapshot.outdated_packages), vec!["wget", "python@3.12"]);
    assert!(snapshot.skipped_packages.is_empty());
    assert_eq!(snapshot.icon, IconState::UpdatesAvailable);
    assert_eq!(snapshot.history.len(), 1);

    // No version transition in the output: versions come from the last refresh.
    let outcome = h.orchestrator.upgrade_package("wget").await;
    assert_eq!(
        outcome,
        OperationOutcome::Completed(Some(UpgradedPackage::new("wget", "1.21.3", "1.24.5")))
    );

    let snapshot = h.orchestrator.snapshot();
    let last = snapshot.last_update_result.clone().unwrap();
    assert_eq!(last.count(), 2);
    assert_eq!(snapshot.history.len(), 1);
    assert_eq!(snapshot.history[0], last);
    assert_eq!(h.store.load_history().unwrap(), vec![last]);
    assert_eq!(
        h.notifier.events(),
        vec![
            (true, "node upgraded".to_string()),
            (true, "wget upgraded".to_string())
        ]
    );
}

#[tokio::test]
async fn already_current_package_leaves_history_untouched() {
    let h = harness(
        ScriptedExecutor::new()
            .route("upgrade", Reply::ok("Warning: wget 1.24 already installed\n")),
    );

    let outcome = h.orchestrator.upgrade_package("wget").await;
    assert_eq!(outcome, OperationOutcome::Completed(None));

    let snapshot = h.orchestrator.snapshot();
    assert!(snapshot.last_update_result.is_none());
    assert!(snapshot.history.is_empty());
    assert!(h.store.load_history().unwrap().is_empty());
    assert_eq!(h.store.history_writes(), 0);
    assert_eq!(snapshot.icon, IconState::UpToDate);
    assert!(!snapshot.is_running);
    assert_eq!(
        h.notifier.events(),
        vec![(true, "wget is already up to date".to_string())]
    );
}

#[tokio::test]
async fn empty_package_name_is_rejected_before_the_gate() {
    let h = harness(ScriptedExecutor::new());

    let outcome = h.orchestrator.upgrade_package("  ").await;
    assert!(matches!(outcome, OperationOutcome::Failed(ref error) if error.kind == CoreErrorKind::InvalidInput));
    assert!(h.executor.spawned().is_empty());
    assert!(!h.orchestrator.is_running());
}

#[tokio::test]
async fn standalone_cleanup_records_freed_space_and_keeps_icon() {
    let h = harness(
        ScriptedExecutor::new()
            .route("outdated", Reply::ok(OUTDATED_FIXTURE))
            .route("cleanup", Reply::ok(CLEANUP_FIXTURE))
            .route("cleanup", Reply::fail("Error: cleanup lock held")),
    );
    assert!(h.orchestrator.refresh().await);

    let outcome = h.orchestrator.run_cleanup().await;
    let OperationOutcome::Completed(cleanup) = outcome else {
        panic!("cleanup should complete, got {outcome:?}");
    };
    assert_eq!(cleanup.freed_space, "401.7MB");
    assert_eq!(h.orchestrator.snapshot().icon, IconState::UpdatesAvailable);

    assert!(!h.orchestrator.run_cleanup().await.is_completed());
    let snapshot = h.orchestrator.snapshot();
    assert!(!snapshot.is_running);
    assert_eq!(snapshot.outdated_packages.len(), 3);
    assert_eq!(
        snapshot.last_cleanup_result.map(|cleanup| cleanup.freed_space),
        Some("401.7MB".to_string())
    );
    assert_eq!(h.notifier.events().len(), 1);
}

#[tokio::test]
async fn missing_brew_is_reported_once() {
    let h = harness_with(
        ScriptedExecutor::new(),
        HarnessOptions {
            brew: MISSING_BREW,
            ..HarnessOptions::default()
        },
    );

    assert!(!h.orchestrator.refresh().await);
    let outcome = h.orchestrator.update_all(false).await;
    assert!(matches!(outcome, OperationOutcome::Failed(ref error) if error.kind == CoreErrorKind::ExecutableNotFound));
    assert!(!h.orchestrator.run_cleanup().await.is_completed());

    assert_eq!(
        h.notifier.events(),
        vec![(
            false,
            "Homebrew not found. Please install Homebrew first.".to_string()
        )]
    );
    assert!(!h.orchestrator.is_running());
}

#[tokio::test]
async fn persisted_history_loads_at_startup_and_clears() {
    let stored = UpdateResult::new(
        vec![UpgradedPackage::new("git", "2.44.0", "2.45.0")],
        UNIX_EPOCH + Duration::from_secs(1_700_000_000),
    );
    let empty = UpdateResult::new(Vec::new(), UNIX_EPOCH);
    let h = harness_with(
        ScriptedExecutor::new(),
        HarnessOptions {
            store: InMemoryStore::with_state(AppSettings::default(), vec![stored.clone(), empty]),
            ..HarnessOptions::default()
        },
    );

    assert_eq!(h.orchestrator.snapshot().history, vec![stored]);

    h.orchestrator.clear_history().unwrap();
    assert!(h.orchestrator.snapshot().history.is_empty());
    assert!(h.store.load_history().unwrap().is_empty());
}

#[tokio::test]
async fn settings_mutators_persist_and_drive_registrar() {
    let h = harness_with(
        ScriptedExecutor::new(),
        HarnessOptions {
            registrar_fails: true,
            ..HarnessOptions::default()
        },
    );
    let mut snapshots = h.orchestrator.subscribe();

    h.orchestrator.set_check_interval(14_400.0).unwrap();
    h.orchestrator.set_auto_cleanup(false).unwrap();
    h.orchestrator.set_greedy_mode(true).unwrap();
    h.orchestrator.set_launch_at_login(true).unwrap();
    h.orchestrator.set_launch_at_login(false).unwrap();

    assert!(h.orchestrator.set_check_interval(f64::NAN).is_err());

    let expected = AppSettings {
        launch_at_login: false,
        check_interval_seconds: 14_400.0,
        auto_cleanup: false,
        greedy_mode: true,
    };
    assert_eq!(h.store.load_settings().unwrap(), expected);
    assert!(snapshots.has_changed().unwrap());
    assert_eq!(snapshots.borrow_and_update().settings, expected);
    assert_eq!(
        *h.registrar.calls.lock().unwrap(),
        vec!["register", "unregister"]
    );
}
