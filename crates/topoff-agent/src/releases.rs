use std::time::Duration;

use serde::Deserialize;
use topoff_core::collaborators::{AppUpdateInfo, AppVersionCheck, is_newer_version, normalize_tag};
use topoff_core::models::{CoreError, CoreErrorKind};

const LATEST_RELEASE_URL: &str = "https://api.github.com/repos/ihazgithub/TopOff/releases/latest";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct LatestRelease {
    tag_name: String,
    html_url: String,
}

/// Asks the GitHub releases API for the newest published version.
pub struct GitHubReleaseCheck {
    url: String,
}

impl GitHubReleaseCheck {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Default for GitHubReleaseCheck {
    fn default() -> Self {
        Self::new(LATEST_RELEASE_URL)
    }
}

impl AppVersionCheck for GitHubReleaseCheck {
    fn check_for_update(&self, current_version: &str) -> Result<Option<AppUpdateInfo>, CoreError> {
        let response = match ureq::get(&self.url)
            .set("Accept", "application/vnd.github+json")
            .set("User-Agent", concat!("topoff/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .call()
        {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => {
                tracing::debug!(status, "release lookup returned a non-success status");
                return Ok(None);
            }
            Err(error) => {
                return Err(CoreError::new(
                    CoreErrorKind::Internal,
                    format!("release lookup failed: {error}"),
                ));
            }
        };
        if response.status() != 200 {
            return Ok(None);
        }

        let body = response.into_string().map_err(|error| {
            CoreError::new(
                CoreErrorKind::Internal,
                format!("failed to read release response: {error}"),
            )
        })?;
        Ok(newer_release(&body, current_version))
    }
}

/// `None` for malformed bodies and for releases that are not newer than `current_version`.
fn newer_release(body: &str, current_version: &str) -> Option<AppUpdateInfo> {
    let release: LatestRelease = serde_json::from_str(body)
        .inspect_err(|error| tracing::debug!(error = %error, "unexpected release payload"))
        .ok()?;
    let latest_version = normalize_tag(&release.tag_name).to_string();

    is_newer_version(&latest_version, current_version).then(|| AppUpdateInfo {
        latest_version,
        download_url: release.html_url,
    })
}
