//! Error taxonomy shared by the stores, the writer and the commands.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// The remote call that was in flight when a spreadsheet operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteStep {
    CreateSpreadsheet,
    WriteValues,
    FreezePanes,
    BasicFilter,
}

impl RemoteStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateSpreadsheet => "create spreadsheet",
            Self::WriteValues => "write values",
            Self::FreezePanes => "set freeze panes",
            Self::BasicFilter => "set basic filter",
        }
    }
}

impl fmt::Display for RemoteStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not authenticated: {path} not found, please run 'gs-write auth' first")]
    NotAuthenticated { path: PathBuf },

    #[error("failed to refresh token, please run 'gs-write auth' again: {reason}")]
    ReauthenticationRequired { reason: String },

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("failed to exchange token: {0}")]
    TokenExchangeFailed(String),

    #[error("failed to parse auth file {path}: {reason}")]
    CorruptCredentials { path: PathBuf, reason: String },

    #[error("failed to parse config file {path}: {reason}")]
    SettingsCorrupt { path: PathBuf, reason: String },

    #[error("unknown configuration key: {0}")]
    UnknownSettingKey(String),

    #[error("invalid value for {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("failed to {action} {path}: {source}")]
    PersistenceFailed {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to {step}: {message}")]
    RemoteOperationFailed { step: RemoteStep, message: String },

    #[error("no data provided")]
    EmptyInput,

    #[error("failed to read CSV from stdin: {0}")]
    InvalidInput(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn persistence(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::PersistenceFailed {
            action,
            path: path.into(),
            source,
        }
    }

    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn remote(step: RemoteStep, err: impl fmt::Display) -> Self {
        Self::RemoteOperationFailed {
            step,
            message: err.to_string(),
        }
    }
}
