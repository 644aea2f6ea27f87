use std::sync::Arc;

use crate::execution::{
    ExecutionResult, OutputLineSink, ProcessExecutor, ProcessSpawnRequest, collect_output,
    spawn_validated,
};

/// Runs package-manager subcommands as the current user.
#[derive(Clone)]
pub struct CommandRunner {
    executor: Arc<dyn ProcessExecutor>,
}

impl CommandRunner {
    pub fn new(executor: Arc<dyn ProcessExecutor>) -> Self {
        Self { executor }
    }

    pub async fn run(&self, request: ProcessSpawnRequest) -> ExecutionResult<String> {
        self.execute(request, None).await
    }

    /// Like [`CommandRunner::run`], also handing every output line to `lines` as it arrives.
    /// The complete buffered output is still returned at the end.
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
        let operation = request.operation;
        let process = spawn_validated(self.executor.as_ref(), request)
            .map_err(|error| error.attributed(operation))?;
        let output = process
            .wait(lines)
            .await
            .map_err(|error| error.attributed(operation))?;
        collect_output(operation, output)
    }
}
