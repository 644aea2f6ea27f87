use std::sync::Arc;

use crate::models::CoreError;

pub trait NotificationSink: Send + Sync {
    fn notify(&self, success: bool, message: &str);
}

/// Synchronous yes/no prompt shown before retrying with administrator privileges.
///
/// `package` is `None` for an upgrade of everything. The orchestrator calls this from a
/// blocking worker thread.
pub trait ConfirmationPrompt: Send + Sync {
    fn confirm_elevation(&self, package: Option<&str>) -> bool;
}

pub trait LaunchAtLoginRegistrar: Send + Sync {
    fn register(&self) -> Result<(), CoreError>;

    fn unregister(&self) -> Result<(), CoreError>;
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AppUpdateInfo {
    pub latest_version: String,
    pub download_url: String,
}

pub trait AppVersionCheck: Send + Sync {
    /// `Ok(None)` when the running version is already the newest.
    fn check_for_update(&self, current_version: &str) -> Result<Option<AppUpdateInfo>, CoreError>;
}

/// Strips a leading `v`/`V` from a release tag.
pub fn normalize_tag(tag: &str) -> &str {
    let tag = tag.trim();
    tag.strip_prefix(['v', 'V']).unwrap_or(tag)
}

/// Compares dot-separated numeric versions. Missing components count as zero and
/// non-numeric components are ignored.
pub fn is_newer_version(candidate: &str, current: &str) -> bool {
    let candidate = numeric_components(normalize_tag(candidate));
    let current = numeric_components(normalize_tag(current));
    let width = candidate.len().max(current.len());

    for index in 0..width {
        let left = candidate.get(index).copied().unwrap_or(0);
        let right = current.get(index).copied().unwrap_or(0);
        if left != right {
            return left > right;
        }
    }
    false
}

fn numeric_components(version: &str) -> Vec<u64> {
    version
        .split('.')
        .filter_map(|component| component.trim().parse::<u64>().ok())
        .collect()
}

pub struct LoggingNotificationSink;

impl NotificationSink for LoggingNotificationSink {
    fn notify(&self, success: bool, message: &str) {
        if success {
            tracing::info!(text = message, "update notification");
        } else {
            tracing::warn!(text = message, "update failure notification");
        }
    }
}

/// Declines every elevation request.
pub struct DenyElevation;

impl ConfirmationPrompt for DenyElevation {
    fn confirm_elevation(&self, _package: Option<&str>) -> bool {
        false
    }
}

pub struct NoopRegistrar;

impl LaunchAtLoginRegistrar for NoopRegistrar {
    fn register(&self) -> Result<(), CoreError> {
        Ok(())
    }

    fn unregister(&self) -> Result<(), CoreError> {
        Ok(())
    }
}

/// The set of outbound collaborators handed to the orchestrator.
#[derive(Clone)]
pub struct Collaborators {
    pub notifications: Arc<dyn NotificationSink>,
    pub confirmation: Arc<dyn ConfirmationPrompt>,
    pub launch_at_login: Arc<dyn LaunchAtLoginRegistrar>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            notifications: Arc::new(LoggingNotificationSink),
            confirmation: Arc::new(DenyElevation),
            launch_at_login: Arc::new(NoopRegistrar),
        }
    }
}
