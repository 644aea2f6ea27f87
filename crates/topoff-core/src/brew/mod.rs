pub mod parse;

pub use parse::{
    dedupe_outdated, parse_cleanup_output, parse_outdated_packages, parse_upgraded_packages,
    upgrading_status,
};

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::execution::{CommandSpec, ProcessSpawnRequest};
use crate::models::BrewOperation;

/// Apple Silicon prefix first, then the Intel prefix.
pub const BREW_CANDIDATE_PATHS: &[&str] = &["/opt/homebrew/bin/brew", "/usr/local/bin/brew"];

/// Prepended to `PATH` so brew can find its own dependencies.
pub const BREW_PATH_PREFIXES: &[&str] = &["/opt/homebrew/bin", "/usr/local/bin"];

/// Bound on `brew update`; the orchestrator's configurable refresh timeout defaults to it.
pub const REFRESH_TIMEOUT: Duration = Duration::from_secs(300);
const LIST_TIMEOUT: Duration = Duration::from_secs(120);
const CLEANUP_TIMEOUT: Duration = Duration::from_secs(600);

pub fn locate_brew<P: AsRef<Path>>(candidates: &[P]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(AsRef::as_ref)
        .find(|candidate| candidate.is_file())
        .map(Path::to_path_buf)
}

pub fn augmented_path(inherited: Option<&str>, prefixes: &[&str]) -> String {
    let mut segments: Vec<&str> = prefixes.to_vec();
    if let Some(inherited) = inherited.filter(|value| !value.is_empty()) {
        segments.push(inherited);
    }
    segments.join(":")
}

pub fn brew_update_request(brew: &Path) -> ProcessSpawnRequest {
    ProcessSpawnRequest::new(BrewOperation::Refresh, CommandSpec::new(brew).arg("update"))
        .timeout(REFRESH_TIMEOUT)
}

pub fn brew_list_outdated_request(brew: &Path) -> ProcessSpawnRequest {
    ProcessSpawnRequest::new(
        BrewOperation::ListOutdated,
        CommandSpec::new(brew).args(["outdated", "--verbose"]),
    )
    .timeout(LIST_TIMEOUT)
}

/// Upgrades carry no timeout: a started upgrade has no defined partial-abort contract.
pub fn brew_upgrade_all_request(brew: &Path, greedy: bool) -> ProcessSpawnRequest {
    let mut command = CommandSpec::new(brew).arg("upgrade");
    if greedy {
        command = command.arg("--greedy");
    }
    ProcessSpawnRequest::new(BrewOperation::UpgradeAll, command)
}

pub fn brew_upgrade_package_request(brew: &Path, package: &str) -> ProcessSpawnRequest {
    ProcessSpawnRequest::new(
        BrewOperation::UpgradePackage,
        CommandSpec::new(brew).args(["upgrade", package]),
    )
}

pub fn brew_cleanup_request(brew: &Path) -> ProcessSpawnRequest {
    ProcessSpawnRequest::new(BrewOperation::Cleanup, CommandSpec::new(brew).arg("cleanup"))
        .timeout(CLEANUP_TIMEOUT)
}

/// Builds brew requests bound to one executable and one augmented `PATH`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BrewCommands {
    brew: PathBuf,
    path_value: String,
}

impl BrewCommands {
    pub fn new(brew: impl Into<PathBuf>, inherited_path: Option<&str>) -> Self {
        Self {
            brew: brew.into(),
            path_value: augmented_path(inherited_path, BREW_PATH_PREFIXES),
        }
    }

    pub fn brew_path(&self) -> &Path {
        &self.brew
    }

    pub fn update(&self) -> ProcessSpawnRequest {
        self.configure(brew_update_request(&self.brew))
    }

    pub fn list_outdated(&self) -> ProcessSpawnRequest {
        self.configure(brew_list_outdated_request(&self.brew))
    }

    pub fn upgrade_all(&self, greedy: bool) -> ProcessSpawnRequest {
        self.configure(brew_upgrade_all_request(&self.brew, greedy))
    }

    pub fn upgrade_package(&self, package: &str) -> ProcessSpawnRequest {
        self.configure(brew_upgrade_package_request(&self.brew, package))
    }

    pub fn cleanup(&self) -> ProcessSpawnRequest {
        self.configure(brew_cleanup_request(&self.brew))
    }

    fn configure(&self, mut request: ProcessSpawnRequest) -> ProcessSpawnRequest {
        // Login items and launch agents start with a stripped-down PATH.
        request.command = request.command.env("PATH", self.path_value.clone());
        request
    }
}
