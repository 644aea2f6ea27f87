pub const DEFAULT_CHECK_INTERVAL_SECONDS: f64 = 3600.0;

/// Persisted user preferences.
#[derive(Clone, Debug, PartialEq)]
pub struct AppSettings {
    pub launch_at_login: bool,
    /// Zero or negative disables periodic checks.
    pub check_interval_seconds: f64,
    pub auto_cleanup: bool,
    pub greedy_mode: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            launch_at_login: false,
            check_interval_seconds: DEFAULT_CHECK_INTERVAL_SECONDS,
            auto_cleanup: true,
            greedy_mode: false,
        }
    }
}
