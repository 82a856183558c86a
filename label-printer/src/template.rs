//! Label templates with `{{TOKEN}}` placeholders
//!
//! Templates are plain text; each line may carry any number of tokens.
//! Tokens missing from the map are left in place verbatim.

use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([A-Z0-9_]+)\}\}").expect("valid placeholder pattern"));

/// Marker line replaced by a UPC-A barcode image
pub const UPC_BARCODE_MARKER: &str = "{{UPC_BARCODE}}";

/// Tokens understood by the label renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LabelToken {
    ProductCode,
    Description,
    Upc,
    SellBy,
    Tare,
    Weight,
    Price,
    PricePerLb,
    LogoPath,
    Lot,
}

impl LabelToken {
    pub const ALL: [LabelToken; 10] = [
        Self::ProductCode,
        Self::Description,
        Self::Upc,
        Self::SellBy,
        Self::Tare,
        Self::Weight,
        Self::Price,
        Self::PricePerLb,
        Self::LogoPath,
        Self::Lot,
    ];

    /// Token name as written between the braces
    pub fn name(&self) -> &'static str {
        match self {
            Self::ProductCode => "PRODUCT_CODE",
            Self::Description => "DESCRIPTION",
            Self::Upc => "UPC",
            Self::SellBy => "SELL_BY",
            Self::Tare => "TARE",
            Self::Weight => "WEIGHT",
            Self::Price => "PRICE",
            Self::PricePerLb => "PRICE_PER_LB",
            Self::LogoPath => "LOGO_PATH",
            Self::Lot => "LOT",
        }
    }

    /// Placeholder form, e.g. `{{WEIGHT}}`
    pub fn placeholder(&self) -> String {
        format!("{{{{{}}}}}", self.name())
    }
}

/// Named string substitutions for one render call.
///
/// Ordered so that substitution is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenMap {
    values: BTreeMap<String, String>,
}

impl TokenMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, token: LabelToken, value: impl Into<String>) -> &mut Self {
        self.values.insert(token.name().to_string(), value.into());
        self
    }

    pub fn get(&self, token: LabelToken) -> Option<&str> {
        self.values.get(token.name()).map(String::as_str)
    }

    /// Value of a token, `None` when absent or blank
    pub fn non_empty(&self, token: LabelToken) -> Option<&str> {
        self.get(token).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Replace every `{{NAME}}` present in the map in a single pass.
    ///
    /// Unknown names stay verbatim; substituted values are not rescanned.
    pub fn substitute(&self, text: &str) -> String {
        PLACEHOLDER
            .replace_all(text, |caps: &Captures| match self.values.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }
}

impl FromIterator<(LabelToken, String)> for TokenMap {
    fn from_iter<I: IntoIterator<Item = (LabelToken, String)>>(iter: I) -> Self {
        let mut map = TokenMap::new();
        for (token, value) in iter {
            map.set(token, value);
        }
        map
    }
}

/// One parsed template line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateLine<'a> {
    /// Draw the UPC barcode at the cursor
    Barcode,
    /// Draw text after substitution
    Text(&'a str),
}

/// Split a template into lines, classifying barcode markers.
///
/// Accepts `\n` and `\r\n` line endings.
pub fn parse_lines(template: &str) -> Vec<TemplateLine<'_>> {
    template
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .map(|line| {
            if line.contains(UPC_BARCODE_MARKER) {
                TemplateLine::Barcode
            } else {
                TemplateLine::Text(line)
            }
        })
        .collect()
}

/// Token map for printer-native (raw) templates.
///
/// Only product code, description, weight and price are substituted; the
/// result is sent to the printer without rendering.
pub fn raw_template_tokens(
    product_code: &str,
    description: &str,
    weight: f64,
    price: f64,
) -> TokenMap {
    let mut map = TokenMap::new();
    map.set(LabelToken::ProductCode, product_code)
        .set(LabelToken::Description, description)
        .set(LabelToken::Weight, format!("{weight:.3}"))
        .set(LabelToken::Price, format!("{price:.2}"));
    map
}
