use serde::{Deserialize, Serialize};

/// Placeholder recorded when the package manager output omits a version.
pub const UNKNOWN_VERSION: &str = "unknown";

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct OutdatedPackage {
    pub name: String,
    pub current_version: String,
    pub latest_version: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct UpgradedPackage {
    pub name: String,
    pub old_version: String,
    pub new_version: String,
}

impl UpgradedPackage {
    pub fn new(
        name: impl Into<String>,
        old_version: impl Into<String>,
        new_version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            old_version: old_version.into(),
            new_version: new_version.into(),
        }
    }

    /// A package named by the output without a version transition.
    pub fn unversioned(name: impl Into<String>) -> Self {
        Self::new(name, UNKNOWN_VERSION, UNKNOWN_VERSION)
    }

    pub fn has_versions(&self) -> bool {
        self.old_version != UNKNOWN_VERSION || self.new_version != UNKNOWN_VERSION
    }
}

impl From<&OutdatedPackage> for UpgradedPackage {
    fn from(package: &OutdatedPackage) -> Self {
        Self::new(
            package.name.clone(),
            package.current_version.clone(),
            package.latest_version.clone(),
        )
    }
}
