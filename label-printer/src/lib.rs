//! # label-printer
//!
//! Label printing library - low-level printing capabilities only.
//!
//! ## Scope
//!
//! This crate handles HOW to print:
//! - UPC-A barcode generation
//! - `{{TOKEN}}` template substitution
//! - Label image composition (text, logo, barcode)
//! - Serial and network (TCP port 9100) delivery
//!
//! Business logic (WHAT to print: products, prices, weights) lives in the
//! `labeler` application.
//!
//! ## Example
//!
//! ```ignore
//! use label_printer::{LabelFonts, LabelLayout, LabelRenderer, NetworkPrinter, PrinterTransport, TokenMap};
//!
//! let renderer = LabelRenderer::new(LabelFonts::default(), LabelLayout::print());
//! let mut tokens = TokenMap::new();
//! tokens.set(LabelToken::Upc, "01234567890");
//! let label = renderer.render("Turkey\n{{UPC_BARCODE}}", &tokens);
//!
//! let transport = PrinterTransport::Network(NetworkPrinter::new("192.168.1.100", 9100)?);
//! let outcome = transport.deliver(&label.png_bytes()?).await;
//! ```

mod barcode;
mod error;
mod font;
mod printer;
mod render;
mod template;

// Re-exports
pub use barcode::{UpcA, barcode_image, check_digit, generate_upc_barcode, normalize_upc};
pub use error::{PrintError, PrintResult};
pub use font::{FontFace, FontPaths, LabelFonts};
pub use printer::{
    DeliveryOutcome, NetworkPrinter, Printer, PrinterTransport, RAW_PRINT_PORT, SerialPrinter,
    TEST_PAYLOAD, list_ports,
};
pub use render::{BARCODE_ERROR_TEXT, LabelLayout, LabelRenderer, RenderWarning, RenderedLabel};
pub use template::{
    LabelToken, TemplateLine, TokenMap, UPC_BARCODE_MARKER, parse_lines, raw_template_tokens,
};
