//! Data models
//!
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.

pub mod input;
pub mod product;
pub mod setting;

// Re-exports
pub use input::*;
pub use product::*;
pub use setting::*;
