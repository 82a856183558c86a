//! Application error handling
//!
//! [`AppError`] is what every labeler operation returns. Each kind maps to a
//! stable code for display and logs.
//!
//! # Error codes
//!
//! | Code | Kind |
//! |------|------|
//! | E0002 | Validation failed |
//! | E0003 | Not found |
//! | E1001 | Connection (port / socket) |
//! | E1002 | No reading from scale |
//! | E2001 | Render |
//! | E9001 | Internal |
//! | E9002 | Database |
//! | E9003 | I/O |

use crate::db::repository::RepoError;
use crate::scale::ScaleError;
use label_printer::PrintError;
use shared::models::InputError;
use tracing::error;

/// Application error
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== Operator errors ==========
    #[error("Not found: {0}")]
    /// Product code absent or nothing selected
    NotFound(String),

    #[error("Validation failed: {0}")]
    /// Malformed operator input
    Validation(String),

    // ========== Device errors ==========
    #[error("Connection failed: {0}")]
    /// Port or socket could not be opened, or timed out
    Connection(String),

    #[error("No reading: {0}")]
    /// Scale answered with nothing usable
    NoReading(String),

    #[error("Render failed: {0}")]
    /// Label image could not be produced or written
    Render(String),

    // ========== System errors ==========
    #[error("Database error: {0}")]
    Database(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "E0002",
            Self::NotFound(_) => "E0003",
            Self::Connection(_) => "E1001",
            Self::NoReading(_) => "E1002",
            Self::Render(_) => "E2001",
            Self::Internal(_) => "E9001",
            Self::Database(_) => "E9002",
            Self::Io(_) => "E9003",
        }
    }

    /// Whether re-triggering the same action may succeed.
    ///
    /// Nothing is retried automatically; this only informs the operator.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::NoReading(_))
    }

    /// Log at a level matching the kind and hand back a display string
    pub fn report(&self) -> String {
        match self {
            Self::Database(msg) | Self::Internal(msg) | Self::Io(msg) => {
                error!(code = self.code(), error = %msg, "System error occurred");
            }
            _ => tracing::warn!(code = self.code(), error = %self, "Operation failed"),
        }
        format!("[{}] {}", self.code(), self)
    }
}

impl From<PrintError> for AppError {
    fn from(err: PrintError) -> Self {
        match err {
            PrintError::Connection(_) | PrintError::Serial(_) | PrintError::Timeout(_) => {
                Self::Connection(err.to_string())
            }
            PrintError::InvalidConfig(msg) => Self::Validation(msg),
            PrintError::Barcode(_) | PrintError::Render(_) => Self::Render(err.to_string()),
            PrintError::Io(e) => Self::Io(e.to_string()),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => Self::NotFound(msg),
            RepoError::Duplicate(msg) => Self::Validation(format!("Duplicate: {msg}")),
            RepoError::Validation(msg) => Self::Validation(msg),
            RepoError::Database(msg) => Self::Database(msg),
        }
    }
}

impl From<ScaleError> for AppError {
    fn from(err: ScaleError) -> Self {
        match err {
            ScaleError::Open { .. } => Self::Connection(err.to_string()),
            ScaleError::Read(_) => Self::Connection(err.to_string()),
            ScaleError::NoPort => Self::Validation(err.to_string()),
        }
    }
}

impl From<InputError> for AppError {
    fn from(err: InputError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type for labeler operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(AppError::connection("COM1").is_retryable());
        assert!(AppError::NoReading("empty line".into()).is_retryable());
        assert!(!AppError::validation("weight").is_retryable());
        assert!(!AppError::not_found("T100").is_retryable());
        assert!(!AppError::Render("disk full".into()).is_retryable());
    }

    #[test]
    fn test_print_error_mapping() {
        let e: AppError = PrintError::Timeout("10.0.0.1:9100".into()).into();
        assert!(matches!(e, AppError::Connection(_)));
        let e: AppError = PrintError::Barcode("letters".into()).into();
        assert!(matches!(e, AppError::Render(_)));
        let e: AppError = PrintError::InvalidConfig("no port".into()).into();
        assert!(matches!(e, AppError::Validation(_)));
    }

    #[test]
    fn test_repo_error_mapping() {
        let e: AppError = RepoError::NotFound("T9".into()).into();
        assert_eq!(e.code(), "E0003");
        let e: AppError = RepoError::Duplicate("T9".into()).into();
        assert_eq!(e.code(), "E0002");
    }

    #[test]
    fn test_report_format() {
        let e = AppError::not_found("Product T9");
        assert_eq!(e.report(), "[E0003] Not found: Product T9");
    }
}
