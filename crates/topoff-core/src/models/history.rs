use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::models::UpgradedPackage;

pub const HISTORY_CAPACITY: usize = 20;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct UpdateResult {
    pub packages: Vec<UpgradedPackage>,
    pub timestamp: SystemTime,
}

impl UpdateResult {
    pub fn new(packages: Vec<UpgradedPackage>, timestamp: SystemTime) -> Self {
        Self {
            packages,
            timestamp,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn count(&self) -> usize {
        self.packages.len()
    }

    /// Replaces the entry with the same name in place, or appends a new one.
    pub fn merge(&mut self, package: UpgradedPackage) {
        match self
            .packages
            .iter_mut()
            .find(|existing| existing.name == package.name)
        {
            Some(existing) => *existing = package,
            None => self.packages.push(package),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CleanupResult {
    pub freed_space: String,
    pub timestamp: SystemTime,
}

/// Newest-first list of non-empty update results, capped at [`HISTORY_CAPACITY`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UpdateHistory {
    entries: Vec<UpdateResult>,
}

impl UpdateHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = UpdateResult>) -> Self {
        let mut entries: Vec<UpdateResult> =
            entries.into_iter().filter(|entry| !entry.is_empty()).collect();
        entries.truncate(HISTORY_CAPACITY);
        Self { entries }
    }

    pub fn entries(&self) -> &[UpdateResult] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `false` (and leaves the history untouched) for an empty result.
    pub fn record(&mut self, result: UpdateResult) -> bool {
        if result.is_empty() {
            return false;
        }
        self.entries.insert(0, result);
        self.entries.truncate(HISTORY_CAPACITY);
        true
    }

    /// Swaps the newest entry for `result` when that entry was recorded at `previous`;
    /// otherwise records `result` as a new entry.
    pub fn replace_or_record(&mut self, previous: Option<SystemTime>, result: UpdateResult) -> bool {
        if result.is_empty() {
            return false;
        }
        match (previous, self.entries.first_mut()) {
            (Some(previous), Some(newest)) if newest.timestamp == previous => {
                *newest = result;
                true
            }
            _ => self.record(result),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
