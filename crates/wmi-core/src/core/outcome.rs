use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::errors::InjectError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub status: CommandStatus,
    pub message: String,
    #[serde(default)]
    pub details: Value,
}

impl ExecutionOutcome {
    pub fn success(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::Ok,
            message: message.into(),
            details,
        }
    }

    pub fn failure(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::Failure,
            message: message.into(),
            details,
        }
    }

    pub fn user_error(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::UserError,
            message: message.into(),
            details,
        }
    }

    /// Bad input is a user error; failing to write the result is a failure.
    #[must_use]
    pub fn from_error(err: &InjectError) -> Self {
        let message = err.to_string();
        let details = err.details();
        match err {
            InjectError::ArchiveWrite { .. } => Self::failure(message, details),
            _ => Self::user_error(message, details),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == CommandStatus::Ok
    }

    /// Envelope printed for `--json`.
    #[must_use]
    pub fn to_json(&self, command: &str) -> Value {
        json!({
            "status": self.status.as_str(),
            "command": command,
            "message": self.message,
            "details": self.details,
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CommandStatus {
    Ok,
    UserError,
    Failure,
}

impl CommandStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::UserError => "user-error",
            Self::Failure => "failure",
        }
    }

    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::UserError => 1,
            Self::Failure => 2,
        }
    }
}
