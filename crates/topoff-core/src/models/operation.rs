#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum BrewOperation {
    Refresh,
    ListOutdated,
    UpgradeAll,
    UpgradePackage,
    Cleanup,
}

impl BrewOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Refresh => "refresh",
            Self::ListOutdated => "list_outdated",
            Self::UpgradeAll => "upgrade_all",
            Self::UpgradePackage => "upgrade_package",
            Self::Cleanup => "cleanup",
        }
    }
}
