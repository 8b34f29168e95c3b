//! Error types and exit codes for coachbench
//!
//! Exit codes:
//! - 0: Success
//! - 1: Generic failure (gateway, IO, every run in a batch failed)
//! - 2: Usage or configuration error (bad flags, missing credential)
//! - 3: Data error (missing scenario, unreadable snapshot)

mod macros;

use std::path::PathBuf;
use thiserror::Error;

use crate::gateway::GatewayError;
use crate::model::ModelRole;

/// Exit codes for the coachbench CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success (0)
    Success = 0,
    /// Generic failure (1)
    Failure = 1,
    /// Usage or configuration error (2)
    Usage = 2,
    /// Scenario or snapshot data error (3)
    Data = 3,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

/// Errors that can occur while running evaluations
#[derive(Error, Debug)]
pub enum EvalError {
    // Usage / configuration errors (exit code 2)
    #[error("{0}")]
    UsageError(String),

    #[error("missing credential for {role} model {model}")]
    MissingCredential { role: ModelRole, model: String },

    #[error("invalid {context}: {value}")]
    InvalidValue { context: String, value: String },

    #[error("invalid configuration in {path:?}: {reason}")]
    InvalidConfig { path: PathBuf, reason: String },

    // Data errors (exit code 3)
    #[error("scenario not found: {id}")]
    ScenarioNotFound { id: String },

    #[error("invalid scenario {path:?}: {reason}")]
    InvalidScenario { path: PathBuf, reason: String },

    #[error("no usable snapshot at {path:?}")]
    SnapshotUnavailable { path: PathBuf },

    // Generic failures (exit code 1)
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("evaluation cancelled")]
    Cancelled,

    #[error("batch failed: {0}")]
    BatchFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to {operation} {target}: {reason}")]
    FailedOperation {
        operation: String,
        target: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

impl EvalError {
    /// Create an error for an invalid value or configuration
    pub fn invalid_value(context: &str, value: impl std::fmt::Display) -> Self {
        EvalError::InvalidValue {
            context: context.to_string(),
            value: value.to_string(),
        }
    }

    /// Create an error for a failed IO operation with context
    pub fn io_operation(
        operation: &str,
        path: impl std::fmt::Display,
        error: impl std::fmt::Display,
    ) -> Self {
        EvalError::FailedOperation {
            operation: operation.to_string(),
            target: path.to_string(),
            reason: error.to_string(),
        }
    }

    /// Whether this error is a user-initiated cancellation rather than a failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, EvalError::Cancelled)
    }

    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            EvalError::UsageError(_)
            | EvalError::MissingCredential { .. }
            | EvalError::InvalidValue { .. }
            | EvalError::InvalidConfig { .. } => ExitCode::Usage,

            EvalError::Gateway(GatewayError::MissingCredential { .. }) => ExitCode::Usage,

            EvalError::ScenarioNotFound { .. }
            | EvalError::InvalidScenario { .. }
            | EvalError::SnapshotUnavailable { .. } => ExitCode::Data,

            EvalError::Gateway(_)
            | EvalError::Cancelled
            | EvalError::BatchFailed(_)
            | EvalError::Io(_)
            | EvalError::Yaml(_)
            | EvalError::Json(_)
            | EvalError::Toml(_)
            | EvalError::FailedOperation { .. }
            | EvalError::Other(_) => ExitCode::Failure,
        }
    }

    /// Get the error type identifier
    fn error_type(&self) -> &'static str {
        match self {
            EvalError::UsageError(_) => "usage_error",
            EvalError::MissingCredential { .. } => "missing_credential",
            EvalError::InvalidValue { .. } => "invalid_value",
            EvalError::InvalidConfig { .. } => "invalid_config",
            EvalError::ScenarioNotFound { .. } => "scenario_not_found",
            EvalError::InvalidScenario { .. } => "invalid_scenario",
            EvalError::SnapshotUnavailable { .. } => "snapshot_unavailable",
            EvalError::Gateway(err) => err.category(),
            EvalError::Cancelled => "cancelled",
            EvalError::BatchFailed(_) => "batch_failed",
            EvalError::Io(_) => "io_error",
            EvalError::Yaml(_) => "yaml_error",
            EvalError::Json(_) => "json_error",
            EvalError::Toml(_) => "toml_error",
            EvalError::FailedOperation { .. } => "failed_operation",
            EvalError::Other(_) => "other",
        }
    }

    /// Structured error envelope used by `--format json`
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": self.exit_code() as i32,
                "type": self.error_type(),
                "message": self.to_string(),
            }
        })
    }
}

/// Result type alias for coachbench operations
pub type Result<T> = std::result::Result<T, EvalError>;
