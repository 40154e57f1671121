//! Error types for the converter module.

use std::path::PathBuf;
use thiserror::Error;

use super::types::EngineExit;

/// Errors that can occur while building or running an engine invocation.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// Request parameters were rejected before anything was spawned.
    #[error("Invalid parameter: {reason}")]
    InvalidParameter { reason: String },

    /// The engine binary could not be found or executed.
    #[error("Engine not found at path: {path} ({reason})")]
    EngineNotFound { path: PathBuf, reason: String },

    /// The engine ran but reported failure.
    #[error("Engine failed with {exit}: {stderr_output}")]
    Execution {
        exit: EngineExit,
        stderr_output: String,
    },

    /// I/O error while talking to the engine process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConverterError {
    /// Creates a new invalid parameter error.
    pub fn invalid_parameter(reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            reason: reason.into(),
        }
    }

    /// Creates a new execution error.
    pub fn execution(exit: EngineExit, stderr_output: impl Into<String>) -> Self {
        Self::Execution {
            exit,
            stderr_output: stderr_output.into(),
        }
    }

    /// Exit code of a failed engine run, `None` if killed or not an execution error.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Execution { exit, .. } => exit.code(),
            _ => None,
        }
    }

    /// Engine stderr of a failed run.
    pub fn stderr_output(&self) -> Option<&str> {
        match self {
            Self::Execution { stderr_output, .. } => Some(stderr_output),
            _ => None,
        }
    }

    /// Whether the engine process was killed.
    pub fn is_killed(&self) -> bool {
        matches!(
            self,
            Self::Execution {
                exit: EngineExit::Killed,
                ..
            }
        )
    }

    /// Short machine readable name, used for metrics labels and API bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidParameter { .. } => "invalid_parameter",
            Self::EngineNotFound { .. } => "engine_not_found",
            Self::Execution { .. } => "execution_failed",
            Self::Io(_) => "io",
        }
    }

    /// Whether this error is retryable.
    ///
    /// Nothing in this crate retries; callers can use this to decide.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
