pub mod privileged;
pub mod runner;
pub mod tokio_process;

pub use privileged::{OSASCRIPT_PATH, PrivilegedCommandRunner, elevation_script};
pub use runner::CommandRunner;
pub use tokio_process::TokioProcessExecutor;

use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::models::{BrewOperation, CoreError, CoreErrorKind};

pub type ExecutionResult<T> = Result<T, CoreError>;

pub type ProcessWaitFuture = Pin<Box<dyn Future<Output = ExecutionResult<ProcessOutput>> + Send>>;

/// Receives each output line (stdout or stderr, without the trailing newline) as it is produced.
///
/// Invoked from the reader task, so implementations must return quickly and tolerate being
/// called while the orchestrator is mid-operation.
pub type OutputLineSink = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn validate(&self, operation: BrewOperation) -> ExecutionResult<()> {
        if self.program.as_os_str().is_empty() {
            return Err(invalid_input(
                operation,
                "command program path must not be empty",
            ));
        }

        if self
            .args
            .iter()
            .any(|arg| arg.is_empty() || arg.contains('\0'))
        {
            return Err(invalid_input(
                operation,
                "command args must be non-empty and must not contain NUL bytes",
            ));
        }

        if self
            .env
            .iter()
            .any(|(key, value)| key.is_empty() || key.contains('\0') || value.contains('\0'))
        {
            return Err(invalid_input(
                operation,
                "environment keys and values must be non-empty and must not contain NUL bytes",
            ));
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProcessSpawnRequest {
    pub operation: BrewOperation,
    pub command: CommandSpec,
    pub timeout: Option<Duration>,
    pub requested_at: SystemTime,
}

impl ProcessSpawnRequest {
    pub fn new(operation: BrewOperation, command: CommandSpec) -> Self {
        Self {
            operation,
            command,
            timeout: None,
            requested_at: SystemTime::now(),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> ExecutionResult<()> {
        self.command.validate(self.operation)?;

        if let Some(timeout) = self.timeout
            && timeout.is_zero()
        {
            return Err(invalid_input(
                self.operation,
                "timeout must be greater than zero when provided",
            ));
        }

        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProcessExitStatus {
    ExitCode(i32),
    Terminated,
}

/// Result of a finished process. `output` interleaves stdout and stderr line by line in
/// arrival order; the relative order of the two streams is not guaranteed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProcessOutput {
    pub status: ProcessExitStatus,
    pub output: String,
    pub started_at: SystemTime,
    pub finished_at: SystemTime,
}

pub trait RunningProcess: Send + Sync {
    fn pid(&self) -> Option<u32>;

    fn wait(self: Box<Self>, lines: Option<OutputLineSink>) -> ProcessWaitFuture;
}

pub trait ProcessExecutor: Send + Sync {
    fn spawn(&self, request: ProcessSpawnRequest) -> ExecutionResult<Box<dyn RunningProcess>>;
}

pub fn spawn_validated(
    executor: &dyn ProcessExecutor,
    request: ProcessSpawnRequest,
) -> ExecutionResult<Box<dyn RunningProcess>> {
    request.validate()?;
    executor.spawn(request)
}

/// Maps a finished process to its output on exit code zero, or to `CommandFailed`
/// carrying the complete combined output otherwise.
pub(crate) fn collect_output(
    operation: BrewOperation,
    output: ProcessOutput,
) -> ExecutionResult<String> {
    match output.status {
        ProcessExitStatus::ExitCode(0) => Ok(output.output),
        ProcessExitStatus::ExitCode(code) => {
            tracing::debug!(
                operation = operation.as_str(),
                exit_code = code,
                "brew command exited with non-zero status"
            );
            Err(CoreError::command_failed(operation, output.output))
        }
        ProcessExitStatus::Terminated => Err(CoreError {
            operation: Some(operation),
            kind: CoreErrorKind::ProcessFailure,
            message: "process was terminated by signal".to_string(),
        }),
    }
}

fn invalid_input(operation: BrewOperation, message: &str) -> CoreError {
    CoreError {
        operation: Some(operation),
        kind: CoreErrorKind::InvalidInput,
        message: message.to_string(),
    }
}
