//! Product Model

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::input::{InputError, parse_number};

/// Default upper weight bound for a new product (advisory only)
pub const DEFAULT_MAX_WT: f64 = 9999.0;

/// Product entity, one row per stock-keeping unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    /// Unique lookup key
    pub product_code: String,
    pub description: Option<String>,
    /// 11-12 digit UPC-A, stored as typed
    pub upc: Option<String>,
    /// Opaque date text, printed as-is
    pub sell_by: Option<String>,
    pub tare: f64,
    /// Optional path to a custom label template
    pub label_format: Option<String>,
    pub price_per_lb: f64,
    pub min_wt: f64,
    pub max_wt: f64,
    pub logo_path: Option<String>,
    pub updated_at: i64,
}

impl Product {
    /// Whether a net weight sits inside the advisory bounds
    pub fn weight_in_bounds(&self, weight: f64) -> bool {
        weight >= self.min_wt && weight <= self.max_wt
    }
}

/// Product list row (code, description, price per pound)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ProductSummary {
    pub product_code: String,
    pub description: Option<String>,
    pub price_per_lb: f64,
}

/// Create / upsert product payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ProductInput {
    #[validate(length(min = 1, max = 64))]
    pub product_code: String,
    pub description: Option<String>,
    pub upc: Option<String>,
    pub sell_by: Option<String>,
    #[validate(range(min = 0.0, max = 100_000.0))]
    pub tare: f64,
    pub label_format: Option<String>,
    #[validate(range(min = 0.0, max = 1_000_000.0))]
    pub price_per_lb: f64,
    pub min_wt: f64,
    pub max_wt: f64,
    pub logo_path: Option<String>,
}

impl ProductInput {
    /// Minimal payload with every optional field empty
    pub fn new(product_code: impl Into<String>) -> Self {
        Self {
            product_code: product_code.into(),
            description: None,
            upc: None,
            sell_by: None,
            tare: 0.0,
            label_format: None,
            price_per_lb: 0.0,
            min_wt: 0.0,
            max_wt: DEFAULT_MAX_WT,
            logo_path: None,
        }
    }
}

/// Product edit form, every field as typed into an entry box
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductForm {
    pub product_code: String,
    pub description: String,
    pub upc: String,
    pub sell_by: String,
    pub tare: String,
    pub label_format: String,
    pub price_per_lb: String,
    pub min_wt: String,
    pub max_wt: String,
    pub logo_path: String,
}

impl ProductForm {
    /// Fill a form from a stored product (edit mode)
    pub fn from_product(p: &Product) -> Self {
        Self {
            product_code: p.product_code.clone(),
            description: p.description.clone().unwrap_or_default(),
            upc: p.upc.clone().unwrap_or_default(),
            sell_by: p.sell_by.clone().unwrap_or_default(),
            tare: p.tare.to_string(),
            label_format: p.label_format.clone().unwrap_or_default(),
            price_per_lb: p.price_per_lb.to_string(),
            min_wt: p.min_wt.to_string(),
            max_wt: p.max_wt.to_string(),
            logo_path: p.logo_path.clone().unwrap_or_default(),
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() { None } else { Some(t.to_string()) }
}

impl TryFrom<ProductForm> for ProductInput {
    type Error = InputError;

    fn try_from(form: ProductForm) -> Result<Self, Self::Error> {
        let input = ProductInput {
            product_code: form.product_code.trim().to_string(),
            description: non_empty(&form.description),
            upc: non_empty(&form.upc),
            sell_by: non_empty(&form.sell_by),
            tare: parse_number("tare", &form.tare, 0.0)?,
            label_format: non_empty(&form.label_format),
            price_per_lb: parse_number("price_per_lb", &form.price_per_lb, 0.0)?,
            min_wt: parse_number("min_wt", &form.min_wt, 0.0)?,
            max_wt: parse_number("max_wt", &form.max_wt, DEFAULT_MAX_WT)?,
            logo_path: non_empty(&form.logo_path),
        };
        input.validate()?;
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> ProductForm {
        ProductForm {
            product_code: " T100 ".into(),
            description: "Whole Turkey".into(),
            upc: "01234567890".into(),
            tare: "0.5".into(),
            price_per_lb: "1.99".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_form_converts_with_defaults() {
        let input = ProductInput::try_from(form()).unwrap();
        assert_eq!(input.product_code, "T100");
        assert_eq!(input.tare, 0.5);
        assert_eq!(input.price_per_lb, 1.99);
        assert_eq!(input.min_wt, 0.0);
        assert_eq!(input.max_wt, DEFAULT_MAX_WT);
        assert_eq!(input.sell_by, None);
        assert_eq!(input.label_format, None);
    }

    #[test]
    fn test_form_rejects_bad_price() {
        let mut f = form();
        f.price_per_lb = "one ninety-nine".into();
        let err = ProductInput::try_from(f).unwrap_err();
        assert!(matches!(err, InputError::InvalidNumber { ref field, .. } if field == "price_per_lb"));
    }

    #[test]
    fn test_form_rejects_empty_code() {
        let mut f = form();
        f.product_code = "   ".into();
        assert!(matches!(
            ProductInput::try_from(f).unwrap_err(),
            InputError::Invalid(_)
        ));
    }

    #[test]
    fn test_negative_tare_fails_validation() {
        let mut input = ProductInput::new("X1");
        input.tare = -0.25;
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_form_rejects_huge_price() {
        let mut f = form();
        f.price_per_lb = "1e20".into();
        assert!(matches!(
            ProductInput::try_from(f).unwrap_err(),
            InputError::Invalid(_)
        ));

        let mut f = form();
        f.price_per_lb = "1000000".into();
        assert_eq!(ProductInput::try_from(f).unwrap().price_per_lb, 1_000_000.0);
    }

    #[test]
    fn test_weight_bounds() {
        let p = Product {
            id: 1,
            product_code: "T1".into(),
            description: None,
            upc: None,
            sell_by: None,
            tare: 0.0,
            label_format: None,
            price_per_lb: 0.0,
            min_wt: 8.0,
            max_wt: 24.0,
            logo_path: None,
            updated_at: 0,
        };
        assert!(p.weight_in_bounds(12.0));
        assert!(!p.weight_in_bounds(7.99));
        assert!(!p.weight_in_bounds(24.01));
    }
}
