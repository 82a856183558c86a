//! Label printing types

use label_printer::{DeliveryOutcome, LabelToken, RenderWarning, TokenMap};
use serde::Serialize;
use shared::models::Product;
use std::fmt;
use std::path::PathBuf;

/// Template used by the diagnostics "test print"
pub const SAMPLE_TEMPLATE: &str =
    "SAMPLE LABEL\n{{UPC_BARCODE}}\nWeight: {{WEIGHT}}\nPrice: ${{PRICE}}";

/// Built-in template for products without a readable custom one
pub fn default_template(description: &str) -> String {
    format!("{description}\n{{{{UPC}}}}\n{{{{UPC_BARCODE}}}}\nWeight: {{{{WEIGHT}}}} lb\nPrice: ${{{{PRICE}}}}")
}

/// Token map for the test print
pub fn sample_tokens() -> TokenMap {
    [
        (LabelToken::Upc, "01234567890".to_string()),
        (LabelToken::Weight, "1.234".to_string()),
        (LabelToken::Price, "3.45".to_string()),
        (LabelToken::LogoPath, String::new()),
    ]
    .into_iter()
    .collect()
}

/// Token map for one product label
///
/// Weight has 3 decimals, money 2; absent optional fields become empty strings.
pub fn product_tokens(
    product: &Product,
    weight: f64,
    total_price: f64,
    lot: Option<&str>,
) -> TokenMap {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    let mut map = TokenMap::new();
    map.set(LabelToken::ProductCode, product.product_code.clone())
        .set(LabelToken::Description, text(&product.description))
        .set(LabelToken::Upc, text(&product.upc))
        .set(LabelToken::SellBy, text(&product.sell_by))
        .set(LabelToken::Tare, product.tare.to_string())
        .set(LabelToken::Weight, format!("{weight:.3}"))
        .set(LabelToken::Price, format!("{total_price:.2}"))
        .set(LabelToken::PricePerLb, format!("{:.2}", product.price_per_lb))
        .set(LabelToken::LogoPath, text(&product.logo_path));
    if let Some(lot) = lot.map(str::trim).filter(|l| !l.is_empty()) {
        map.set(LabelToken::Lot, lot);
    }
    map
}

/// Input for one print (or preview) action
#[derive(Debug, Clone, Default)]
pub struct LabelRequest {
    /// Selected product; `None` means nothing selected
    pub product_code: Option<String>,
    /// Net weight as held by the front end (not re-read from the scale)
    pub weight: f64,
    pub lot: Option<String>,
}

impl LabelRequest {
    pub fn new(product_code: impl Into<String>, weight: f64) -> Self {
        Self {
            product_code: Some(product_code.into()),
            weight,
            lot: None,
        }
    }

    pub fn with_lot(mut self, lot: impl Into<String>) -> Self {
        self.lot = Some(lot.into());
        self
    }
}

/// Result of the Read Weight action
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightReport {
    pub raw: String,
    pub gross: f64,
    pub tare: f64,
    pub net: f64,
}

impl fmt::Display for WeightReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Raw: {}\nNet weight: {:.3} lb (tare {})",
            self.raw, self.net, self.tare
        )
    }
}

/// Result of a print action
#[derive(Debug, Clone, Serialize)]
pub struct PrintReport {
    pub product_code: String,
    pub weight: f64,
    pub total_price: f64,
    /// Transport description, e.g. `network 10.0.0.5:9100`
    pub transport: String,
    pub bytes: usize,
    pub warnings: Vec<RenderWarning>,
    pub outcome: DeliveryOutcome,
}

/// Result of a preview action
#[derive(Debug, Clone, Serialize)]
pub struct PreviewReport {
    pub path: PathBuf,
    pub total_price: f64,
    pub warnings: Vec<RenderWarning>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> Product {
        Product {
            id: 1,
            product_code: "T100".into(),
            description: Some("Whole Turkey".into()),
            upc: Some("01234567890".into()),
            sell_by: None,
            tare: 0.5,
            label_format: None,
            price_per_lb: 1.99,
            min_wt: 0.0,
            max_wt: 9999.0,
            logo_path: None,
            updated_at: 0,
        }
    }

    #[test]
    fn test_default_template() {
        assert_eq!(
            default_template("Whole Turkey"),
            "Whole Turkey\n{{UPC}}\n{{UPC_BARCODE}}\nWeight: {{WEIGHT}} lb\nPrice: ${{PRICE}}"
        );
    }

    #[test]
    fn test_product_tokens_formatting() {
        let map = product_tokens(&product(), 3.25, 6.47, None);
        assert_eq!(map.get(LabelToken::Weight), Some("3.250"));
        assert_eq!(map.get(LabelToken::Price), Some("6.47"));
        assert_eq!(map.get(LabelToken::PricePerLb), Some("1.99"));
        assert_eq!(map.get(LabelToken::Tare), Some("0.5"));
        assert_eq!(map.get(LabelToken::SellBy), Some(""));
        assert_eq!(map.get(LabelToken::Lot), None);
        assert_eq!(map.len(), 9);
    }

    #[test]
    fn test_blank_lot_is_dropped() {
        let map = product_tokens(&product(), 1.0, 1.99, Some("  "));
        assert_eq!(map.get(LabelToken::Lot), None);
        let map = product_tokens(&product(), 1.0, 1.99, Some("L-7"));
        assert_eq!(map.get(LabelToken::Lot), Some("L-7"));
    }

    #[test]
    fn test_weight_report_display() {
        let r = WeightReport {
            raw: "ST,GS,+012.750lb".into(),
            gross: 12.75,
            tare: 0.5,
            net: 12.25,
        };
        assert_eq!(
            r.to_string(),
            "Raw: ST,GS,+012.750lb\nNet weight: 12.250 lb (tare 0.5)"
        );
    }
}
