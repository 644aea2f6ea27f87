use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

use crate::execution::{
    ExecutionResult, OutputLineSink, ProcessExecutor, ProcessExitStatus, ProcessOutput,
    ProcessSpawnRequest, ProcessWaitFuture, RunningProcess,
};
use crate::models::{BrewOperation, CoreError, CoreErrorKind};

pub struct TokioProcessExecutor;

impl ProcessExecutor for TokioProcessExecutor {
    fn spawn(&self, request: ProcessSpawnRequest) -> ExecutionResult<Box<dyn RunningProcess>> {
        let mut cmd = tokio::process::Command::new(&request.command.program);
        cmd.args(&request.command.args);

        for (key, value) in &request.command.env {
            cmd.env(key, value);
        }

        cmd.stdin(std::process::Stdio::null());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|error| {
            let kind = if error.kind() == std::io::ErrorKind::NotFound {
                CoreErrorKind::ExecutableNotFound
            } else {
                CoreErrorKind::ProcessFailure
            };
            CoreError {
                operation: Some(request.operation),
                kind,
                message: format!(
                    "failed to spawn '{}': {error}",
                    request.command.program.display()
                ),
            }
        })?;

        let pid = child.id();
        let started_at = SystemTime::now();

        Ok(Box::new(TokioRunningProcess {
            child: Mutex::new(Some(child)),
            pid,
            started_at,
            timeout: request.timeout,
            operation: request.operation,
        }))
    }
}

struct TokioRunningProcess {
    child: Mutex<Option<tokio::process::Child>>,
    pid: Option<u32>,
    started_at: SystemTime,
    timeout: Option<Duration>,
    operation: BrewOperation,
}

impl RunningProcess for TokioRunningProcess {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn wait(self: Box<Self>, lines: Option<OutputLineSink>) -> ProcessWaitFuture {
        let child = self.child.into_inner().ok().flatten();
        let timeout = self.timeout;
        let started_at = self.started_at;
        let operation = self.operation;
        let pid = self.pid;

        Box::pin(async move {
            let mut child = child.ok_or_else(|| {
                process_failure(operation, "child process already consumed".to_string())
            })?;

            let combined = Arc::new(Mutex::new(String::new()));
            let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
            let mut readers = Vec::with_capacity(2);
            if let Some(stdout) = child.stdout.take() {
                readers.push(tokio::spawn(forward_lines(
                    stdout,
                    combined.clone(),
                    line_tx.clone(),
                )));
            }
            if let Some(stderr) = child.stderr.take() {
                readers.push(tokio::spawn(forward_lines(
                    stderr,
                    combined.clone(),
                    line_tx.clone(),
                )));
            }
            drop(line_tx);

            // Only the sink runs here; the buffer is filled by the readers.
            let collector = tokio::spawn(async move {
                while let Some(line) = line_rx.recv().await {
                    if let Some(sink) = &lines {
                        sink(&line);
                    }
                }
            });

            let wait_err = |error: std::io::Error| {
                process_failure(operation, format!("failed to wait for process: {error}"))
            };

            let status = if let Some(timeout_duration) = timeout {
                match tokio::time::timeout(timeout_duration, child.wait()).await {
                    Ok(result) => result.map_err(wait_err)?,
                    Err(_) => {
                        kill_process_group(pid);
                        let _ = tokio::time::timeout(Duration::from_secs(1), child.wait()).await;
                        for reader in &readers {
                            reader.abort();
                        }
                        collector.abort();
                        return Err(CoreError {
                            operation: Some(operation),
                            kind: CoreErrorKind::Timeout,
                            message: format!(
                                "process timed out after {}ms",
                                timeout_duration.as_millis()
                            ),
                        });
                    }
                }
            } else {
                child.wait().await.map_err(wait_err)?
            };

            // Descendants that inherit stdout/stderr would keep the pipes open forever, so the
            // readers get a short bounded window after exit.
            let read_deadline = tokio::time::Instant::now() + Duration::from_millis(250);
            for reader in &mut readers {
                if tokio::time::timeout_at(read_deadline, reader).await.is_err() {
                    tracing::debug!(
                        operation = operation.as_str(),
                        "output pipes still open after exit; keeping output read so far"
                    );
                    break;
                }
            }
            for reader in &readers {
                reader.abort();
            }

            // Aborted readers drop their senders, so the sink drains and finishes.
            let _ = collector.await;

            let output =
                std::mem::take(&mut *combined.lock().unwrap_or_else(PoisonError::into_inner));
            let finished_at = SystemTime::now();

            let status = match status.code() {
                Some(code) => ProcessExitStatus::ExitCode(code),
                None => ProcessExitStatus::Terminated,
            };

            Ok(ProcessOutput {
                status,
                output,
                started_at,
                finished_at,
            })
        })
    }
}

/// Appends each line to `combined`, then forwards it to the sink.
async fn forward_lines<R>(
    reader: R,
    combined: Arc<Mutex<String>>,
    sender: mpsc::UnboundedSender<String>,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        match reader.read_until(b'\n', &mut buffer).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buffer);
                let line = line.trim_end_matches(['\n', '\r']);
                {
                    let mut output = combined.lock().unwrap_or_else(PoisonError::into_inner);
                    output.push_str(line);
                    output.push('\n');
                }
                let _ = sender.send(line.to_string());
            }
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    if let Some(pid) = pid {
        let pgid = -(pid as libc::pid_t);
        unsafe {
            libc::kill(pgid, libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

fn process_failure(operation: BrewOperation, message: String) -> CoreError {
    CoreError {
        operation: Some(operation),
        kind: CoreErrorKind::ProcessFailure,
        message,
    }
}
