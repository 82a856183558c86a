//! Printing Module
//!
//! The label pipeline: product lookup, pricing, template resolution,
//! rendering and delivery to the selected printer.

pub mod service;
pub mod types;

pub use service::LabelService;
pub use types::{
    LabelRequest, PreviewReport, PrintReport, SAMPLE_TEMPLATE, WeightReport, default_template,
    product_tokens, sample_tokens,
};
