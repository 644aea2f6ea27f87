use std::collections::BTreeSet;

use crate::models::{
    AppSettings, CleanupResult, OutdatedPackage, UpdateHistory, UpdateResult,
};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum IconState {
    #[default]
    UpToDate,
    Checking,
    UpdatesAvailable,
    Updating,
    Checkmark,
}

impl IconState {
    pub fn resting(has_visible_updates: bool) -> Self {
        if has_visible_updates {
            Self::UpdatesAvailable
        } else {
            Self::UpToDate
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum OperationKind {
    Refresh,
    UpdateAll,
    UpgradePackage,
    Cleanup,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MachineState {
    pub icon: IconState,
    pub running: Option<OperationKind>,
    pub has_visible_updates: bool,
}

impl MachineState {
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Event {
    Requested(OperationKind),
    RefreshSucceeded { has_visible_updates: bool },
    RefreshFailed,
    UpgradeSucceeded { has_visible_updates: bool },
    CheckmarkElapsed,
    OperationFailed,
    CleanupFinished,
    VisibleChanged { has_visible_updates: bool },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Effect {
    /// The request won the running gate; the caller must now perform it.
    Start(OperationKind),
    /// The request lost the running gate and is dropped.
    Ignored(OperationKind),
    /// Hold the checkmark, then feed [`Event::CheckmarkElapsed`].
    HoldCheckmark,
}

/// Pure; the orchestrator calls it under its state lock so the running-gate check-and-set is atomic.
pub fn transition(state: MachineState, event: Event) -> (MachineState, Vec<Effect>) {
    match event {
        Event::Requested(kind) => {
            if state.is_running() {
                return (state, vec![Effect::Ignored(kind)]);
            }
            let icon = match kind {
                OperationKind::Refresh => IconState::Checking,
                OperationKind::UpdateAll | OperationKind::UpgradePackage => IconState::Updating,
                OperationKind::Cleanup => state.icon,
            };
            (
                MachineState {
                    icon,
                    running: Some(kind),
                    ..state
                },
                vec![Effect::Start(kind)],
            )
        }
        Event::RefreshSucceeded {
            has_visible_updates,
        } => (
            MachineState {
                icon: IconState::resting(has_visible_updates),
                running: None,
                has_visible_updates,
            },
            Vec::new(),
        ),
        Event::RefreshFailed => (
            MachineState {
                icon: IconState::UpToDate,
                running: None,
                ..state
            },
            Vec::new(),
        ),
        Event::UpgradeSucceeded {
            has_visible_updates,
        } => (
            MachineState {
                icon: IconState::Checkmark,
                has_visible_updates,
                ..state
            },
            vec![Effect::HoldCheckmark],
        ),
        Event::CheckmarkElapsed | Event::OperationFailed => (
            MachineState {
                icon: IconState::resting(state.has_visible_updates),
                running: None,
                ..state
            },
            Vec::new(),
        ),
        Event::CleanupFinished => (
            MachineState {
                running: None,
                ..state
            },
            Vec::new(),
        ),
        Event::VisibleChanged {
            has_visible_updates,
        } => {
            let icon = match state.icon {
                IconState::UpToDate | IconState::UpdatesAvailable => {
                    IconState::resting(has_visible_updates)
                }
                other => other,
            };
            (
                MachineState {
                    icon,
                    has_visible_updates,
                    ..state
                },
                Vec::new(),
            )
        }
    }
}

/// Everything the orchestrator owns; mutated only under its lock.
#[derive(Clone, Debug, Default)]
pub struct OrchestratorState {
    pub machine: MachineState,
    pub status_message: Option<String>,
    pub outdated_packages: Vec<OutdatedPackage>,
    pub skipped_packages: BTreeSet<String>,
    pub settings: AppSettings,
    pub last_update_result: Option<UpdateResult>,
    pub last_cleanup_result: Option<CleanupResult>,
    pub history: UpdateHistory,
}

impl OrchestratorState {
    pub fn visible_outdated_packages(&self) -> Vec<OutdatedPackage> {
        visible_outdated(&self.outdated_packages, &self.skipped_packages)
    }

    pub fn has_visible_updates(&self) -> bool {
        self.outdated_packages
            .iter()
            .any(|package| !self.skipped_packages.contains(&package.name))
    }

    pub fn snapshot(&self) -> OrchestratorSnapshot {
        OrchestratorSnapshot {
            icon: self.machine.icon,
            is_running: self.machine.is_running(),
            status_message: self.status_message.clone(),
            outdated_packages: self.outdated_packages.clone(),
            visible_outdated_packages: self.visible_outdated_packages(),
            skipped_packages: self.skipped_packages.iter().cloned().collect(),
            settings: self.settings.clone(),
            last_update_result: self.last_update_result.clone(),
            last_cleanup_result: self.last_cleanup_result.clone(),
            history: self.history.entries().to_vec(),
        }
    }
}

pub fn visible_outdated(
    outdated: &[OutdatedPackage],
    skipped: &BTreeSet<String>,
) -> Vec<OutdatedPackage> {
    outdated
        .iter()
        .filter(|package| !skipped.contains(&package.name))
        .cloned()
        .collect()
}

/// Observable view handed to subscribers after every state change.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OrchestratorSnapshot {
    pub icon: IconState,
    pub is_running: bool,
    pub status_message: Option<String>,
    pub outdated_packages: Vec<OutdatedPackage>,
    pub visible_outdated_packages: Vec<OutdatedPackage>,
    pub skipped_packages: Vec<String>,
    pub settings: AppSettings,
    pub last_update_result: Option<UpdateResult>,
    pub last_cleanup_result: Option<CleanupResult>,
    pub history: Vec<UpdateResult>,
}
