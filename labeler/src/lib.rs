//! Labeler - weigh, price and print product labels
//!
//! Products and operator settings live in SQLite. A print action looks the
//! product up, prices the weight, renders a PNG label and sends it to a
//! serial or network printer.
//!
//! # Layout
//! - [`core`](crate::core) configuration and environment setup
//! - [`db`] connection pool and repositories
//! - [`scale`] serial scale reader
//! - [`pricing`] weight and price arithmetic
//! - [`printing`] the label service
//! - [`utils`] errors and logging

pub mod cli;
pub mod core;
pub mod db;
pub mod pricing;
pub mod printing;
pub mod scale;
pub mod utils;

pub use crate::core::{Config, setup_environment};
pub use db::DbService;
pub use printing::LabelService;
pub use utils::logger::{cleanup_old_logs, init_logger, init_logger_with_file};
pub use utils::{AppError, AppResult};

/// Write one audit journal entry (target `audit`)
///
/// ```ignore
/// audit_log!("product_deleted", product_code = "T100");
/// ```
#[macro_export]
macro_rules! audit_log {
    ($action:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::info!(target: "audit", action = $action, $($key = $value),*)
    };
}
