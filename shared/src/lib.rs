//! Shared types for the labeler workspace
//!
//! Models used across crates: product records, operator settings,
//! printer transport selection and UI-field input parsing.

pub mod models;
pub mod util;

// Re-exports
pub use models::*;
pub use serde::{Deserialize, Serialize};
