//! Error types for Mailsprint

use thiserror::Error;

/// Main error type for Mailsprint
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Calculation result is required to start a task")]
    CalculationRequired,

    #[error("Calculation result is missing its status matrix")]
    MissingStatusMatrix,

    #[error("Scheduler failed to start task: {0}")]
    SchedulerStartFailed(String),

    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    #[error("Invalid control action: {0}")]
    InvalidAction(String),

    #[error("Unknown sender accounts: {0}")]
    InvalidSenders(String),

    #[error("Disabled sender accounts: {0}")]
    DisabledSenders(String),

    #[error("No recipients available for planning")]
    NoRecipients,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for Mailsprint
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Config(_) => 500,
            Error::Validation(_) => 422,
            Error::TaskNotFound(_) => 404,
            Error::CalculationRequired => 400,
            Error::MissingStatusMatrix => 400,
            Error::SchedulerStartFailed(_) => 500,
            Error::DataIntegrity(_) => 422,
            Error::InvalidAction(_) => 400,
            Error::InvalidSenders(_) => 400,
            Error::DisabledSenders(_) => 400,
            Error::NoRecipients => 400,
            Error::Internal(_) => 500,
            Error::Other(_) => 500,
        }
    }

    /// Returns the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config(_) => "CONFIG_ERROR",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::TaskNotFound(_) => "TASK_NOT_FOUND",
            Error::CalculationRequired => "CALCULATION_REQUIRED",
            Error::MissingStatusMatrix => "MISSING_STATUS_MATRIX",
            Error::SchedulerStartFailed(_) => "SCHEDULER_START_FAILED",
            Error::DataIntegrity(_) => "DATA_INTEGRITY_ERROR",
            Error::InvalidAction(_) => "INVALID_ACTION",
            Error::InvalidSenders(_) => "INVALID_SEND_EMAILS",
            Error::DisabledSenders(_) => "DISABLED_SEND_EMAILS",
            Error::NoRecipients => "NO_RECEIVE_EMAILS",
            Error::Internal(_) => "INTERNAL_ERROR",
            Error::Other(_) => "INTERNAL_ERROR",
        }
    }
}
