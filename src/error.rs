use thiserror::Error;

use crate::ledger::models::ResultCodes;

/// Top-level error type for the disburser
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Journal error: {0}")]
    Journal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by a ledger client
#[derive(Error, Debug, Clone)]
pub enum LedgerError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Horizon returned status {status}: {detail}")]
    Status {
        status: u16,
        detail: String,
        result_codes: Option<ResultCodes>,
    },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("No native balance found in the account")]
    MissingNativeBalance,

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Transaction encoding failed: {0}")]
    Encoding(String),
}

impl LedgerError {
    /// HTTP-like status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            LedgerError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn result_codes(&self) -> Option<&ResultCodes> {
        match self {
            LedgerError::Status { result_codes, .. } => result_codes.as_ref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for LedgerError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            LedgerError::Timeout
        } else if error.is_decode() {
            LedgerError::Malformed(format!("{}", error))
        } else {
            LedgerError::Transport(format!("{}", error))
        }
    }
}

impl From<stellar_xdr::curr::Error> for LedgerError {
    fn from(error: stellar_xdr::curr::Error) -> Self {
        LedgerError::Encoding(format!("{:?}", error))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(error: config::ConfigError) -> Self {
        AppError::Config(error.to_string())
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;
