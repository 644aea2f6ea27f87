use std::path::PathBuf;
use std::sync::Arc;

use crate::execution::{
    CommandSpec, ExecutionResult, OutputLineSink, ProcessExecutor, ProcessExitStatus,
    ProcessSpawnRequest, collect_output, spawn_validated,
};
use crate::models::CoreError;

pub const OSASCRIPT_PATH: &str = "/usr/bin/osascript";

const CANCELLATION_MARKERS: &[&str] = &["user canceled", "user cancelled", "(-128)"];

/// Runs a command through the macOS administrator authentication prompt.
///
/// The prompt is the only suspension point the user can cancel; cancellation is reported as
/// [`crate::models::CoreErrorKind::UserCancelledElevation`] and is never retried here.
#[derive(Clone)]
pub struct PrivilegedCommandRunner {
    executor: Arc<dyn ProcessExecutor>,
    osascript: PathBuf,
}

impl PrivilegedCommandRunner {
    pub fn new(executor: Arc<dyn ProcessExecutor>) -> Self {
        Self::with_osascript(executor, OSASCRIPT_PATH)
    }

    pub fn with_osascript(executor: Arc<dyn ProcessExecutor>, osascript: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            osascript: osascript.into(),
        }
    }

    pub async fn run(&self, request: ProcessSpawnRequest) -> ExecutionResult<String> {
        self.execute(request, None).await
    }

    /// The elevated command's output only becomes available once it exits, so `lines`
    /// receives the whole output at that point rather than incrementally.
    pub async fn run_streaming(
        &self,
        request: ProcessSpawnRequest,
        lines: OutputLineSink,
    ) -> ExecutionResult<String> {
        self.execute(request, Some(lines)).await
    }

    async fn execute(
        &self,
        request: ProcessSpawnRequest,
        lines: Option<OutputLineSink>,
    ) -> ExecutionResult<String> {
        request.validate()?;
        let operation = request.operation;

        // The authentication prompt waits on the user, so the elevated request carries no timeout.
        let elevated = ProcessSpawnRequest::new(
            operation,
            CommandSpec::new(&self.osascript)
                .arg("-e")
                .arg(elevation_script(&request.command)),
        );

        let process = spawn_validated(self.executor.as_ref(), elevated)
            .map_err(|error| error.attributed(operation))?;
        let output = process
            .wait(None)
            .await
            .map_err(|error| error.attributed(operation))?;

        if matches!(output.status, ProcessExitStatus::ExitCode(code) if code != 0)
            && is_cancellation(&output.output)
        {
            tracing::info!(
                operation = operation.as_str(),
                "administrator authentication prompt was dismissed"
            );
            return Err(CoreError::user_cancelled(operation));
        }

        let text = collect_output(operation, output)?;
        if let Some(sink) = lines {
            for line in text.lines() {
                sink(line);
            }
        }
        Ok(text)
    }
}

/// AppleScript that runs `command` with administrator privileges. Environment overrides are
/// applied through `/usr/bin/env` because `do shell script` starts from a minimal environment.
pub fn elevation_script(command: &CommandSpec) -> String {
    let mut words = Vec::with_capacity(command.args.len() + command.env.len() + 2);
    if !command.env.is_empty() {
        words.push(shell_quote("/usr/bin/env"));
        for (key, value) in &command.env {
            words.push(shell_quote(&format!("{key}={value}")));
        }
    }
    words.push(shell_quote(&command.program.to_string_lossy()));
    words.extend(command.args.iter().map(|arg| shell_quote(arg)));

    format!(
        "do shell script \"{}\" with administrator privileges",
        applescript_escape(&words.join(" "))
    )
}

fn is_cancellation(output: &str) -> bool {
    let lowered = output.to_ascii_lowercase();
    CANCELLATION_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

fn shell_quote(word: &str) -> String {
    format!("'{}'", word.replace('\'', r"'\''"))
}

fn applescript_escape(text: &str) -> String {
    text.replace('\\', r"\\").replace('"', "\\\"")
}
