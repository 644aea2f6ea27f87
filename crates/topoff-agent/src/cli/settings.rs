use topoff_core::models::{AppSettings, CoreError};
use topoff_core::orchestration::UpdateOrchestrator;

#[derive(Clone, Copy, Debug, Default)]
pub struct SettingsChanges {
    pub interval: Option<f64>,
    pub auto_cleanup: Option<bool>,
    pub greedy: Option<bool>,
    pub launch_at_login: Option<bool>,
}

/// Applies any requested changes, then prints the resulting settings.
pub fn run(orchestrator: &UpdateOrchestrator, changes: SettingsChanges) -> Result<(), CoreError> {
    if let Some(seconds) = changes.interval {
        orchestrator.set_check_interval(seconds)?;
    }
    if let Some(enabled) = changes.auto_cleanup {
        orchestrator.set_auto_cleanup(enabled)?;
    }
    if let Some(enabled) = changes.greedy {
        orchestrator.set_greedy_mode(enabled)?;
    }
    if let Some(enabled) = changes.launch_at_login {
        orchestrator.set_launch_at_login(enabled)?;
    }

    print_settings(&orchestrator.snapshot().settings);
    Ok(())
}

fn print_settings(settings: &AppSettings) {
    println!("check interval   {}", describe_interval(settings.check_interval_seconds));
    println!("auto cleanup     {}", settings.auto_cleanup);
    println!("greedy upgrades  {}", settings.greedy_mode);
    println!("launch at login  {}", settings.launch_at_login);
}

fn describe_interval(seconds: f64) -> String {
    if seconds <= 0.0 {
        return "manual only".to_string();
    }
    if seconds >= 3600.0 && seconds % 3600.0 == 0.0 {
        return format!("every {} hour(s)", seconds / 3600.0);
    }
    format!("every {seconds} second(s)")
}
