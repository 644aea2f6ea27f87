use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use topoff_core::collaborators::{
    ConfirmationPrompt, LaunchAtLoginRegistrar, LoggingNotificationSink, NotificationSink,
};
use topoff_core::models::{CoreError, CoreErrorKind};

pub const LAUNCH_AGENT_LABEL: &str = "com.topoff.agent";

/// Prints outcomes to the terminal and mirrors them into the log.
pub struct TerminalNotifier;

impl NotificationSink for TerminalNotifier {
    fn notify(&self, success: bool, message: &str) {
        LoggingNotificationSink.notify(success, message);
        if success {
            println!("TopOff: {message}");
        } else {
            eprintln!("TopOff: {message}");
        }
    }
}

/// Asks on stdin before retrying with administrator privileges.
pub struct TerminalPrompt;

impl ConfirmationPrompt for TerminalPrompt {
    fn confirm_elevation(&self, package: Option<&str>) -> bool {
        let subject = match package {
            Some(name) => format!("Upgrading {name}"),
            None => "Upgrading everything".to_string(),
        };
        let question =
            format!("{subject} needs administrator privileges. Retry as admin? [y/N] ");

        let mut stdout = std::io::stdout();
        if write!(stdout, "{question}").and_then(|()| stdout.flush()).is_err() {
            return false;
        }

        let mut answer = String::new();
        match std::io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_affirmative(&answer),
            Err(error) => {
                tracing::warn!(error = %error, "could not read elevation answer");
                false
            }
        }
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Registers the agent as a per-user launchd job by writing a property list.
#[derive(Clone, Debug)]
pub struct LaunchAgentRegistrar {
    plist_path: PathBuf,
    program: PathBuf,
}

impl LaunchAgentRegistrar {
    pub fn new(launch_agents_dir: impl AsRef<Path>, program: impl Into<PathBuf>) -> Self {
        Self {
            plist_path: launch_agents_dir
                .as_ref()
                .join(format!("{LAUNCH_AGENT_LABEL}.plist")),
            program: program.into(),
        }
    }

    /// `~/Library/LaunchAgents`, running the current executable.
    pub fn for_current_user() -> Result<Self, CoreError> {
        let home = std::env::var_os("HOME")
            .ok_or_else(|| CoreError::new(CoreErrorKind::Internal, "HOME is not set"))?;
        let program = std::env::current_exe().map_err(|error| {
            CoreError::new(
                CoreErrorKind::Internal,
                format!("could not resolve the agent executable: {error}"),
            )
        })?;
        Ok(Self::new(
            PathBuf::from(home).join("Library").join("LaunchAgents"),
            program,
        ))
    }

    pub fn plist_path(&self) -> &Path {
        &self.plist_path
    }

    fn plist(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{LAUNCH_AGENT_LABEL}</string>
    <key>ProgramArguments</key>
    <array>
        <string>{}</string>
        <string>run</string>
    </array>
    <key>RunAtLoad</key>
    <true/>
</dict>
</plist>
"#,
            xml_escape(&self.program.to_string_lossy())
        )
    }
}

impl LaunchAtLoginRegistrar for LaunchAgentRegistrar {
    fn register(&self) -> Result<(), CoreError> {
        if let Some(parent) = self.plist_path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| io_failure("create", parent, error))?;
        }
        std::fs::write(&self.plist_path, self.plist())
            .map_err(|error| io_failure("write", &self.plist_path, error))?;
        tracing::info!(path = %self.plist_path().display(), "launch agent registered");
        Ok(())
    }

    fn unregister(&self) -> Result<(), CoreError> {
        match std::fs::remove_file(&self.plist_path) {
            Ok(()) => {
                tracing::info!(path = %self.plist_path().display(), "launch agent removed");
                Ok(())
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(io_failure("remove", &self.plist_path, error)),
        }
    }
}

fn io_failure(action: &str, path: &Path, error: std::io::Error) -> CoreError {
    CoreError::new(
        CoreErrorKind::Internal,
        format!("failed to {action} '{}': {error}", path.display()),
    )
}

fn xml_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
