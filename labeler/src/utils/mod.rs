//! Utility module - shared helpers and types
//!
//! - [`AppError`] - application error type
//! - logging setup

pub mod error;
pub mod logger;

pub use error::{AppError, AppResult};
