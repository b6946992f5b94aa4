//! Application-level error: a message plus the process exit code.
//!
//! Exit codes:
//! - `2`: input/config problems (paths, CSV headers, missing columns, bad flags)
//! - `3`: data that cannot produce an allocation (empty, negative, degenerate, over budget)
//! - `4`: runtime failures (terminal, file writes)

use crate::alloc::AllocError;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<AllocError> for AppError {
    fn from(err: AllocError) -> Self {
        let code = match err {
            AllocError::MissingColumn { .. }
            | AllocError::MissingValue { .. }
            | AllocError::InvalidValue { .. }
            | AllocError::UnknownChannel { .. }
            | AllocError::InvalidBudget { .. }
            | AllocError::DuplicateOverride { .. }
            | AllocError::InvalidOverride { .. }
            | AllocError::InvalidUplift { .. } => 2,
            AllocError::EmptyDataset
            | AllocError::DegenerateColumn { .. }
            | AllocError::NegativeMetric { .. }
            | AllocError::Overallocation { .. }
            | AllocError::Underallocation { .. } => 3,
        };
        AppError::new(code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
