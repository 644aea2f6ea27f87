use topoff_core::collaborators::AppVersionCheck;
use topoff_core::models::{CoreError, CoreErrorKind};

use crate::releases::GitHubReleaseCheck;

pub async fn run() -> Result<(), CoreError> {
    let current = env!("CARGO_PKG_VERSION");
    let checked = tokio::task::spawn_blocking(move || {
        GitHubReleaseCheck::default().check_for_update(current)
    })
    .await
    .map_err(|error| {
        CoreError::new(
            CoreErrorKind::Internal,
            format!("version check task failed: {error}"),
        )
    })??;

    match checked {
        Some(update) => println!(
            "TopOff {} is available (you have {current}): {}",
            update.latest_version, update.download_url
        ),
        None => println!("TopOff {current} is the latest version"),
    }
    Ok(())
}
