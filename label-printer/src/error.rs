//! Error types for the printer library

use thiserror::Error;

/// Printer error types
#[derive(Debug, Error)]
pub enum PrintError {
    /// Network connection error
    #[error("Connection failed: {0}")]
    Connection(String),

    /// IO error during printing or rendering
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port could not be opened or written
    #[error("Serial port error: {0}")]
    Serial(String),

    /// Timeout waiting for printer
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Invalid printer configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Barcode symbology rejected the input
    #[error("Barcode error: {0}")]
    Barcode(String),

    /// Label image could not be encoded or written
    #[error("Render error: {0}")]
    Render(String),
}

impl From<serialport::Error> for PrintError {
    fn from(err: serialport::Error) -> Self {
        PrintError::Serial(err.to_string())
    }
}

impl From<image::ImageError> for PrintError {
    fn from(err: image::ImageError) -> Self {
        PrintError::Render(err.to_string())
    }
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrintError>;
