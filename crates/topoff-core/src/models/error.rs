use thiserror::Error;

use crate::models::BrewOperation;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CoreErrorKind {
    ExecutableNotFound,
    CommandFailed,
    UserCancelledElevation,
    InvalidInput,
    Timeout,
    ProcessFailure,
    StorageFailure,
    Internal,
}

/// Failure raised anywhere in the core.
///
/// For [`CoreErrorKind::CommandFailed`] the `message` carries the complete combined
/// stdout/stderr of the failed process so callers can classify it.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("{kind:?}: {message}")]
pub struct CoreError {
    pub operation: Option<BrewOperation>,
    pub kind: CoreErrorKind,
    pub message: String,
}

impl CoreError {
    pub fn new(kind: CoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation: None,
            kind,
            message: message.into(),
        }
    }

    pub fn command_failed(operation: BrewOperation, output: impl Into<String>) -> Self {
        Self {
            operation: Some(operation),
            kind: CoreErrorKind::CommandFailed,
            message: output.into(),
        }
    }

    pub fn executable_not_found() -> Self {
        Self::new(
            CoreErrorKind::ExecutableNotFound,
            "brew executable was not found in any known installation prefix",
        )
    }

    pub fn user_cancelled(operation: BrewOperation) -> Self {
        Self {
            operation: Some(operation),
            kind: CoreErrorKind::UserCancelledElevation,
            message: "administrator authentication was cancelled".to_string(),
        }
    }

    /// Attributes the error to `operation` unless it already names one.
    pub fn attributed(mut self, operation: BrewOperation) -> Self {
        self.operation = self.operation.or(Some(operation));
        self
    }

    /// Text shown to the user by the notification collaborator.
    pub fn description(&self) -> String {
        match self.kind {
            CoreErrorKind::ExecutableNotFound => {
                "Homebrew not found. Please install Homebrew first.".to_string()
            }
            CoreErrorKind::CommandFailed => {
                format!("Brew command failed: {}", self.message.trim())
            }
            CoreErrorKind::UserCancelledElevation => {
                "Administrator authentication was cancelled.".to_string()
            }
            CoreErrorKind::Timeout => format!("Brew command timed out: {}", self.message),
            _ => self.message.clone(),
        }
    }
}
