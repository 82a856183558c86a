//! Label service - the print action and its diagnostics
//!
//! Each action reads settings fresh, opens whatever device it needs, and
//! closes it before returning. Nothing is retried.

use super::types::{
    LabelRequest, PreviewReport, PrintReport, SAMPLE_TEMPLATE, WeightReport, default_template,
    product_tokens, sample_tokens,
};
use crate::audit_log;
use crate::core::Config;
use crate::db::DbService;
use crate::db::repository::{product as product_repo, setting as setting_repo};
use crate::pricing::{net_weight, total_price};
use crate::scale::ScaleReader;
use crate::utils::{AppError, AppResult};
use label_printer::{
    DeliveryOutcome, LabelFonts, LabelLayout, LabelRenderer, NetworkPrinter, PrinterTransport,
    SerialPrinter, generate_upc_barcode, raw_template_tokens,
};
use shared::models::{
    DeviceSettings, MAX_WEIGHT, Product, ProductInput, ProductSummary, Setting, TransportMode,
    UiConfig, keys,
};
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Orchestrates store, scale, renderer and printer
#[derive(Clone)]
pub struct LabelService {
    config: Config,
    db: DbService,
    renderer: LabelRenderer,
}

impl LabelService {
    /// Fonts are resolved once, from the configured paths
    pub fn new(config: Config, db: DbService) -> Self {
        let fonts = LabelFonts::load(&config.font_paths());
        Self::with_fonts(config, db, fonts)
    }

    pub fn with_fonts(config: Config, db: DbService, fonts: LabelFonts) -> Self {
        Self {
            config,
            db,
            renderer: LabelRenderer::new(fonts, LabelLayout::print()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn db(&self) -> &DbService {
        &self.db
    }

    // ========== Settings / devices ==========

    pub async fn device_settings(&self) -> AppResult<DeviceSettings> {
        Ok(setting_repo::load_device_settings(&self.db.pool).await?)
    }

    pub async fn list_settings(&self) -> AppResult<Vec<Setting>> {
        Ok(setting_repo::list(&self.db.pool).await?)
    }

    pub async fn get_setting(&self, key: &str) -> AppResult<Option<String>> {
        Ok(setting_repo::get(&self.db.pool, key).await?)
    }

    pub async fn ui_config(&self) -> AppResult<UiConfig> {
        Ok(setting_repo::load_ui_config(&self.db.pool).await?)
    }

    /// Store one setting after checking the key and value make sense
    pub async fn set_setting(&self, key: &str, value: &str) -> AppResult<()> {
        if !keys::ALL.contains(&key) {
            return Err(AppError::validation(format!("Unknown setting: {key}")));
        }
        let value = value.trim();
        match key {
            keys::SCALE_BAUD | keys::PRINTER_BAUD => {
                value
                    .parse::<u32>()
                    .map_err(|_| AppError::validation(format!("{key}: '{value}' is not a baud rate")))?;
            }
            keys::PRINTER_MODE => {
                value
                    .parse::<TransportMode>()
                    .map_err(AppError::validation)?;
            }
            keys::TOUCH_KEYBOARD if value != "0" && value != "1" => {
                return Err(AppError::validation("touch_keyboard must be 0 or 1"));
            }
            _ => {}
        }
        setting_repo::set(&self.db.pool, key, value).await?;
        audit_log!("setting_changed", key = key, value = value);
        Ok(())
    }

    /// Persist every device setting at once (the Options dialog save)
    pub async fn save_device_settings(&self, settings: &DeviceSettings) -> AppResult<()> {
        if settings.scale_port.trim().is_empty() || settings.printer_port.trim().is_empty() {
            return Err(AppError::validation("Serial ports must not be empty"));
        }
        if settings.scale_baud == 0 || settings.printer_baud == 0 {
            return Err(AppError::validation("Baud rates must be positive"));
        }
        setting_repo::save_device_settings(&self.db.pool, settings).await?;
        audit_log!(
            "device_settings_saved",
            printer_mode = settings.printer_mode.as_str(),
            printer_port = settings.printer_port.as_str(),
            scale_port = settings.scale_port.as_str()
        );
        Ok(())
    }

    fn scale_reader(&self, settings: &DeviceSettings) -> ScaleReader {
        ScaleReader::new(&settings.scale_port, settings.scale_baud)
            .with_timeout(self.config.scale_timeout())
    }

    fn serial_transport(&self, settings: &DeviceSettings) -> AppResult<PrinterTransport> {
        let printer = SerialPrinter::new(&settings.printer_port, settings.printer_baud)?
            .with_timeout(self.config.printer_serial_timeout());
        Ok(PrinterTransport::Serial(printer))
    }

    /// Transport selected by the settings (network only with an address)
    pub fn transport(&self, settings: &DeviceSettings) -> AppResult<PrinterTransport> {
        match settings.effective_mode() {
            TransportMode::Network => {
                let printer =
                    NetworkPrinter::new(&settings.printer_ip, self.config.printer_network_port)?
                        .with_timeout(self.config.printer_network_timeout());
                Ok(PrinterTransport::Network(printer))
            }
            TransportMode::Serial => self.serial_transport(settings),
        }
    }

    // ========== Products ==========

    /// Selected product, or `NotFound`
    pub async fn resolve_product(&self, code: Option<&str>) -> AppResult<Product> {
        let code = code
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AppError::not_found("Select a product first"))?;
        product_repo::find_by_code(&self.db.pool, code)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Product {code} not found in database")))
    }

    pub async fn list_products(&self) -> AppResult<Vec<ProductSummary>> {
        Ok(product_repo::list(&self.db.pool).await?)
    }

    /// Add a new product; an existing code is rejected
    pub async fn create_product(&self, input: &ProductInput) -> AppResult<Product> {
        let product = product_repo::create(&self.db.pool, input).await?;
        audit_log!("product_created", product_code = product.product_code.as_str());
        Ok(product)
    }

    /// Edit the product stored under `code`, possibly renaming it
    pub async fn update_product(&self, code: &str, input: &ProductInput) -> AppResult<Product> {
        let product = product_repo::update(&self.db.pool, code, input).await?;
        audit_log!(
            "product_updated",
            product_code = product.product_code.as_str(),
            previous_code = code
        );
        Ok(product)
    }

    /// Insert or overwrite by product code
    pub async fn save_product(&self, input: &ProductInput) -> AppResult<Product> {
        let product = product_repo::upsert(&self.db.pool, input).await?;
        audit_log!("product_saved", product_code = product.product_code.as_str());
        Ok(product)
    }

    pub async fn delete_product(&self, code: &str) -> AppResult<()> {
        if !product_repo::delete(&self.db.pool, code).await? {
            return Err(AppError::not_found(format!("Product {code}")));
        }
        audit_log!("product_deleted", product_code = code);
        Ok(())
    }

    // ========== Scale ==========

    /// Read the scale and apply the selected product's tare.
    ///
    /// A missing or unknown product means tare 0.
    #[instrument(skip(self))]
    pub async fn read_weight(&self, product_code: Option<&str>) -> AppResult<WeightReport> {
        let settings = self.device_settings().await?;
        let reading = self
            .scale_reader(&settings)
            .read()
            .await?
            .ok_or_else(|| AppError::NoReading("No data".to_string()))?;
        let gross = reading
            .weight
            .ok_or_else(|| AppError::NoReading(reading.raw.clone()))?;

        let tare = match product_code.map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => product_repo::find_by_code(&self.db.pool, code)
                .await?
                .map(|p| p.tare)
                .unwrap_or(0.0),
            None => 0.0,
        };

        let report = WeightReport {
            raw: reading.raw,
            gross,
            tare,
            net: net_weight(gross, tare),
        };
        info!(gross, tare, net = report.net, "weight read");
        Ok(report)
    }

    // ========== Templates ==========

    /// Locate a product's custom template file.
    ///
    /// Relative paths are tried against the template folder, then the work
    /// directory.
    pub fn resolve_template_path(&self, label_format: &str, template_folder: &str) -> Option<PathBuf> {
        let label_format = label_format.trim();
        if label_format.is_empty() {
            return None;
        }
        let path = Path::new(label_format);
        let candidates = if path.is_absolute() {
            vec![path.to_path_buf()]
        } else {
            vec![
                self.config.resolve_path(template_folder).join(path),
                self.config.resolve_path(path),
            ]
        };
        candidates.into_iter().find(|p| p.is_file())
    }

    /// Template text a product's label is rendered from
    pub async fn template_for(&self, product: &Product) -> AppResult<String> {
        let settings = self.device_settings().await?;
        Ok(self.load_template(product, &settings))
    }

    /// Custom template text, or the built-in one
    fn load_template(&self, product: &Product, settings: &DeviceSettings) -> String {
        let description = product.description.as_deref().unwrap_or_default();
        let Some(label_format) = product.label_format.as_deref() else {
            return default_template(description);
        };
        match self.resolve_template_path(label_format, &settings.template_folder) {
            Some(path) => match std::fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "template unreadable, using default");
                    default_template(description)
                }
            },
            None => {
                warn!(label_format, "template not found, using default");
                default_template(description)
            }
        }
    }

    // ========== Print / preview ==========

    fn check_weight(weight: f64) -> AppResult<f64> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(AppError::validation(format!("Invalid weight: {weight}")));
        }
        if weight > MAX_WEIGHT {
            return Err(AppError::validation(format!(
                "weight exceeds maximum allowed ({MAX_WEIGHT}), got {weight}"
            )));
        }
        Ok(weight)
    }

    /// Print a product label.
    ///
    /// Stops before the printer if rendering fails. A failed delivery is
    /// reported in `outcome`, not as an error.
    #[instrument(skip(self, request), fields(product_code = ?request.product_code, weight = request.weight))]
    pub async fn print_label(&self, request: &LabelRequest) -> AppResult<PrintReport> {
        let product = self.resolve_product(request.product_code.as_deref()).await?;
        let weight = Self::check_weight(request.weight)?;
        let settings = self.device_settings().await?;

        if !product.weight_in_bounds(weight) {
            warn!(weight, min = product.min_wt, max = product.max_wt, "weight outside product bounds");
        }

        let total = total_price(weight, product.price_per_lb)?;
        let template = self.load_template(&product, &settings);
        let tokens = product_tokens(&product, weight, total, request.lot.as_deref());

        let label = self.renderer.render(&template, &tokens);
        for w in &label.warnings {
            warn!(warning = ?w, "label rendered with fallback");
        }
        let data = label.png_bytes()?;

        let transport = self.transport(&settings)?;
        let outcome = transport.deliver(&data).await;

        audit_log!(
            "label_printed",
            product_code = product.product_code.as_str(),
            weight = weight,
            total_price = total,
            success = outcome.success
        );

        Ok(PrintReport {
            product_code: product.product_code,
            weight,
            total_price: total,
            transport: transport.describe(),
            bytes: data.len(),
            warnings: label.warnings,
            outcome,
        })
    }

    /// Render a product label at preview size to `output` without printing
    pub async fn preview(&self, request: &LabelRequest, output: &Path) -> AppResult<PreviewReport> {
        let product = self.resolve_product(request.product_code.as_deref()).await?;
        let weight = Self::check_weight(request.weight)?;
        let settings = self.device_settings().await?;

        let total = total_price(weight, product.price_per_lb)?;
        let template = self.load_template(&product, &settings);
        let tokens = product_tokens(&product, weight, total, request.lot.as_deref());

        let label = self
            .renderer
            .with_layout(LabelLayout::preview())
            .render_to_path(&template, &tokens, output)?;
        Ok(PreviewReport {
            path: output.to_path_buf(),
            total_price: total,
            warnings: label.warnings,
        })
    }

    /// Fill the four basic tokens of a printer-native template.
    ///
    /// Other tokens stay verbatim. A missing or unknown product leaves code
    /// and description empty and the price at zero.
    pub async fn raw_template_payload(
        &self,
        template: &str,
        request: &LabelRequest,
    ) -> AppResult<String> {
        let weight = Self::check_weight(request.weight)?;

        let product = match request.product_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => {
                let found = product_repo::find_by_code(&self.db.pool, code).await?;
                if found.is_none() {
                    warn!(product_code = code, "product not found, raw template sent without product fields");
                }
                found
            }
            _ => None,
        };

        let tokens = match &product {
            Some(p) => raw_template_tokens(
                &p.product_code,
                p.description.as_deref().unwrap_or_default(),
                weight,
                total_price(weight, p.price_per_lb)?,
            ),
            None => raw_template_tokens("", "", weight, 0.0),
        };
        Ok(tokens.substitute(template))
    }

    /// Send a printer-native template with the four basic tokens filled in.
    ///
    /// Bypasses the renderer and always uses the serial printer.
    pub async fn print_raw_template(
        &self,
        template_path: &Path,
        request: &LabelRequest,
    ) -> AppResult<DeliveryOutcome> {
        let template = std::fs::read_to_string(template_path)?;
        let payload = self.raw_template_payload(&template, request).await?;

        let settings = self.device_settings().await?;
        let outcome = self
            .serial_transport(&settings)?
            .deliver(payload.as_bytes())
            .await;

        audit_log!(
            "raw_template_printed",
            template = template_path.display().to_string().as_str(),
            product_code = request.product_code.as_deref().unwrap_or_default(),
            success = outcome.success
        );
        Ok(outcome)
    }

    // ========== Diagnostics ==========

    /// Open and close the scale port
    pub async fn test_scale(&self) -> AppResult<String> {
        let settings = self.device_settings().await?;
        let reader = self.scale_reader(&settings);
        reader.probe().await?;
        Ok(format!("Opened {} OK", reader.port()))
    }

    pub async fn test_printer(&self) -> AppResult<DeliveryOutcome> {
        let settings = self.device_settings().await?;
        Ok(self.transport(&settings)?.test_connection().await)
    }

    /// Render and send the built-in sample label
    pub async fn test_print(&self) -> AppResult<DeliveryOutcome> {
        let settings = self.device_settings().await?;
        let label = self.renderer.render(SAMPLE_TEMPLATE, &sample_tokens());
        let data = label.png_bytes()?;
        Ok(self.transport(&settings)?.deliver(&data).await)
    }

    /// Write a standalone UPC-A PNG
    pub fn generate_barcode(&self, upc: &str, output: &Path) -> AppResult<PathBuf> {
        Ok(generate_upc_barcode(upc, output, self.renderer.fonts())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use label_printer::RenderWarning;

    async fn service(work_dir: &Path) -> LabelService {
        let db = DbService::in_memory().await.unwrap();
        let config = Config::with_overrides(work_dir.to_string_lossy(), "unused.db");
        LabelService::with_fonts(config, db, LabelFonts::fallback())
    }

    async fn add_turkey(svc: &LabelService) {
        let mut input = ProductInput::new("T100");
        input.description = Some("Whole Turkey".into());
        input.upc = Some("01234567890".into());
        input.tare = 0.5;
        input.price_per_lb = 1.99;
        svc.save_product(&input).await.unwrap();
    }

    #[tokio::test]
    async fn test_print_without_selection_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path()).await;
        let err = svc.print_label(&LabelRequest::default()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_print_unknown_product_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path()).await;
        let err = svc
            .print_label(&LabelRequest::new("NOPE", 1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_negative_weight_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path()).await;
        add_turkey(&svc).await;
        let err = svc
            .print_label(&LabelRequest::new("T100", -2.0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_oversized_price_is_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path()).await;
        add_turkey(&svc).await;

        let err = svc
            .print_label(&LabelRequest::new("T100", 1e20))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // A price written behind the validator's back
        sqlx::query("UPDATE products SET price_per_lb = 1e20 WHERE product_code = 'T100'")
            .execute(&svc.db().pool)
            .await
            .unwrap();
        let err = svc
            .print_label(&LabelRequest::new("T100", 50_000.0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_raw_payload_fills_four_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path()).await;
        add_turkey(&svc).await;
        let template = "^FD{{PRODUCT_CODE}} {{DESCRIPTION}} {{WEIGHT}} {{PRICE}} {{UPC}}^FS";

        let payload = svc
            .raw_template_payload(template, &LabelRequest::new("T100", 2.0))
            .await
            .unwrap();
        assert_eq!(payload, "^FDT100 Whole Turkey 2.000 3.98 {{UPC}}^FS");
    }

    #[tokio::test]
    async fn test_raw_payload_unknown_product_leaves_fields_empty() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path()).await;
        let template = "[{{PRODUCT_CODE}}][{{DESCRIPTION}}] {{WEIGHT}} {{PRICE}}";

        let payload = svc
            .raw_template_payload(template, &LabelRequest::new("NOPE", 1.5))
            .await
            .unwrap();
        assert_eq!(payload, "[][] 1.500 0.00");

        let payload = svc
            .raw_template_payload(template, &LabelRequest::default())
            .await
            .unwrap();
        assert_eq!(payload, "[][] 0.000 0.00");
    }

    #[tokio::test]
    async fn test_serial_failure_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path()).await;
        add_turkey(&svc).await;
        svc.set_setting(keys::PRINTER_PORT, "/dev/does-not-exist-42")
            .await
            .unwrap();

        let report = svc
            .print_label(&LabelRequest::new("T100", 3.25))
            .await
            .unwrap();
        assert!(!report.outcome.success);
        assert_eq!(report.total_price, 6.47);
        assert!(report.transport.starts_with("serial"));
        assert!(report.bytes > 0);
    }

    #[tokio::test]
    async fn test_ip_mode_without_address_uses_serial() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path()).await;
        svc.set_setting(keys::PRINTER_MODE, "ip").await.unwrap();
        let settings = svc.device_settings().await.unwrap();
        assert!(matches!(
            svc.transport(&settings).unwrap(),
            PrinterTransport::Serial(_)
        ));
    }

    #[tokio::test]
    async fn test_set_setting_validation() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path()).await;
        assert!(svc.set_setting("colour", "red").await.is_err());
        assert!(svc.set_setting(keys::SCALE_BAUD, "fast").await.is_err());
        assert!(svc.set_setting(keys::PRINTER_MODE, "usb").await.is_err());
        assert!(svc.set_setting(keys::TOUCH_KEYBOARD, "yes").await.is_err());
        svc.set_setting(keys::SCALE_BAUD, " 19200 ").await.unwrap();
        assert_eq!(svc.device_settings().await.unwrap().scale_baud, 19200);
    }

    #[tokio::test]
    async fn test_save_device_settings_switches_transport() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path()).await;
        let mut settings = svc.device_settings().await.unwrap();
        settings.printer_mode = TransportMode::Network;
        settings.printer_ip = "10.0.0.5".into();
        settings.printer_baud = 19200;
        svc.save_device_settings(&settings).await.unwrap();

        let loaded = svc.device_settings().await.unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(
            svc.transport(&loaded).unwrap().describe(),
            format!("network 10.0.0.5:{}", svc.config().printer_network_port)
        );

        settings.printer_port = " ".into();
        assert!(matches!(
            svc.save_device_settings(&settings).await.unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_template_resolution_order() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path()).await;
        std::fs::create_dir_all(dir.path().join("templates")).unwrap();
        std::fs::write(dir.path().join("templates/a.tpl"), "FOLDER").unwrap();
        std::fs::write(dir.path().join("a.tpl"), "WORKDIR").unwrap();
        std::fs::write(dir.path().join("b.tpl"), "WORKDIR B").unwrap();

        let found = svc.resolve_template_path("a.tpl", "templates").unwrap();
        assert_eq!(std::fs::read_to_string(found).unwrap(), "FOLDER");
        let found = svc.resolve_template_path("b.tpl", "templates").unwrap();
        assert_eq!(std::fs::read_to_string(found).unwrap(), "WORKDIR B");
        assert!(svc.resolve_template_path("missing.tpl", "templates").is_none());
        assert!(svc.resolve_template_path("", "templates").is_none());
    }

    #[tokio::test]
    async fn test_missing_custom_template_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path()).await;
        let mut input = ProductInput::new("T100");
        input.description = Some("Whole Turkey".into());
        input.label_format = Some("nowhere.tpl".into());
        let product = svc.save_product(&input).await.unwrap();

        let settings = svc.device_settings().await.unwrap();
        assert_eq!(
            svc.load_template(&product, &settings),
            default_template("Whole Turkey")
        );
    }

    #[tokio::test]
    async fn test_preview_writes_png_with_bad_upc_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path()).await;
        let mut input = ProductInput::new("B1");
        input.upc = Some("NOT-A-UPC".into());
        svc.save_product(&input).await.unwrap();

        let out = dir.path().join("preview.png");
        let report = svc
            .preview(&LabelRequest::new("B1", 1.0), &out)
            .await
            .unwrap();
        assert!(out.is_file());
        assert!(matches!(
            report.warnings.as_slice(),
            [RenderWarning::BarcodeFallback { .. }]
        ));
        let img = image::open(&out).unwrap();
        assert_eq!((img.width(), img.height()), (400, 300));
    }

    #[tokio::test]
    async fn test_raw_template_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path()).await;
        let err = svc
            .print_raw_template(&dir.path().join("none.prn"), &LabelRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }

    #[tokio::test]
    async fn test_delete_missing_product() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path()).await;
        assert!(matches!(
            svc.delete_product("X").await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }
}
