use std::path::PathBuf;
use thiserror::Error;

use crate::runner::ExitOutcome;

/// Every failure the harness can report.
///
/// Callers decide propagate-vs-recover on the variant: `CleanupWarning` is
/// the one kind that is handed back as a value instead of failing a test.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Failed to create workspace at {path}: {source}")]
    WorkspaceCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No environment snapshot was captured before restore")]
    MissingSnapshot,

    #[error("Failed to set up execution context: {message}")]
    ContextSetupFailed { message: String },

    #[error("Failed to restore execution context: {message}")]
    RestoreFailed { message: String },

    #[error("Failed to remove workspace {path}: {source}")]
    CleanupWarning {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to spawn `{command}`: {source}")]
    CommandSpawnFailed {
        command: String,
        source: std::io::Error,
    },

    #[error("Deploy step `{command}` failed with {status}")]
    DeployFailed {
        command: String,
        status: ExitOutcome,
        output: String,
    },

    #[error("Failed to load {path}: {message}")]
    ConfigLoadFailed { path: PathBuf, message: String },
}

impl HarnessError {
    pub fn code(&self) -> &'static str {
        match self {
            HarnessError::WorkspaceCreationFailed { .. } => "HARNESS_WORKSPACE_CREATION_FAILED",
            HarnessError::MissingSnapshot => "HARNESS_MISSING_SNAPSHOT",
            HarnessError::ContextSetupFailed { .. } => "HARNESS_CONTEXT_SETUP_FAILED",
            HarnessError::RestoreFailed { .. } => "HARNESS_RESTORE_FAILED",
            HarnessError::CleanupWarning { .. } => "HARNESS_CLEANUP_WARNING",
            HarnessError::CommandSpawnFailed { .. } => "HARNESS_COMMAND_SPAWN_FAILED",
            HarnessError::DeployFailed { .. } => "HARNESS_DEPLOY_FAILED",
            HarnessError::ConfigLoadFailed { .. } => "HARNESS_CONFIG_LOAD_FAILED",
        }
    }

    /// Whether this error should be reported without failing the caller.
    pub fn is_warning(&self) -> bool {
        matches!(self, HarnessError::CleanupWarning { .. })
    }

    pub(crate) fn setup(message: impl Into<String>) -> Self {
        HarnessError::ContextSetupFailed {
            message: message.into(),
        }
    }
}
