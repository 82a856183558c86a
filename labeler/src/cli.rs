//! Command-line front end
//!
//! Every subcommand is one operator action. Results are printed as text, or
//! as JSON with `--json`.

use crate::printing::{LabelRequest, LabelService};
use crate::utils::{AppError, AppResult};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use shared::models::{DeviceSettings, ProductForm, ProductInput, TransportMode, parse_weight};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "labeler")]
#[command(about = "Weigh, price and print product labels")]
#[command(version)]
pub struct Cli {
    /// Base directory for the database, templates and logs
    #[arg(long)]
    pub work_dir: Option<String>,

    /// SQLite database file
    #[arg(long)]
    pub database: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage products
    #[command(subcommand)]
    Product(ProductCommand),

    /// Operator settings (ports, baud rates, printer mode)
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Scale reading and diagnostics
    #[command(subcommand)]
    Scale(ScaleCommand),

    /// Render a product label and send it to the printer
    Print {
        product_code: String,
        /// Net weight in pounds
        #[arg(long, value_parser = weight_arg)]
        weight: f64,
        #[arg(long)]
        lot: Option<String>,
    },

    /// Send a printer-native template with basic fields filled in
    PrintRaw {
        template: PathBuf,
        #[arg(long)]
        product: Option<String>,
        #[arg(long, value_parser = weight_arg, default_value = "0")]
        weight: f64,
    },

    /// Render a product label to a PNG file without printing
    Preview {
        product_code: String,
        #[arg(long, value_parser = weight_arg)]
        weight: f64,
        #[arg(long)]
        lot: Option<String>,
        #[arg(short, long, default_value = "preview.png")]
        output: PathBuf,
    },

    /// Printer diagnostics
    #[command(subcommand)]
    Printer(PrinterCommand),

    /// Write a UPC-A barcode PNG
    Barcode {
        upc: String,
        #[arg(short, long, default_value = "barcode.png")]
        output: PathBuf,
    },

    /// List serial ports
    Ports,
}

#[derive(Debug, Subcommand)]
pub enum ProductCommand {
    List,
    Show { code: String },
    /// Add a new product
    Add(ProductArgs),
    /// Edit an existing product; omitted fields keep their value
    Edit {
        code: String,
        #[command(flatten)]
        fields: ProductArgs,
    },
    Delete { code: String },
}

/// Product fields as typed by the operator
#[derive(Debug, Args, Default)]
pub struct ProductArgs {
    /// Product code (new code when editing)
    #[arg(long)]
    pub product_code: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub upc: Option<String>,
    #[arg(long)]
    pub sell_by: Option<String>,
    #[arg(long)]
    pub tare: Option<String>,
    /// Custom template path
    #[arg(long)]
    pub label_format: Option<String>,
    #[arg(long)]
    pub price_per_lb: Option<String>,
    #[arg(long)]
    pub min_wt: Option<String>,
    #[arg(long)]
    pub max_wt: Option<String>,
    #[arg(long)]
    pub logo_path: Option<String>,
}

impl ProductArgs {
    /// Overlay the given fields on `form`
    pub fn apply(self, mut form: ProductForm) -> ProductForm {
        let fields = [
            (self.product_code, &mut form.product_code),
            (self.description, &mut form.description),
            (self.upc, &mut form.upc),
            (self.sell_by, &mut form.sell_by),
            (self.tare, &mut form.tare),
            (self.label_format, &mut form.label_format),
            (self.price_per_lb, &mut form.price_per_lb),
            (self.min_wt, &mut form.min_wt),
            (self.max_wt, &mut form.max_wt),
            (self.logo_path, &mut form.logo_path),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = value;
            }
        }
        form
    }
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    List,
    Get { key: String },
    Set { key: String, value: String },
    /// Save several device settings at once; omitted ones keep their value
    Save(DeviceArgs),
    /// Front-end capabilities derived from settings
    Ui,
}

/// Device settings as given on the command line
#[derive(Debug, Args, Default)]
pub struct DeviceArgs {
    #[arg(long)]
    pub scale_port: Option<String>,
    #[arg(long)]
    pub scale_baud: Option<u32>,
    /// `serial` or `ip`
    #[arg(long)]
    pub printer_mode: Option<TransportMode>,
    #[arg(long)]
    pub printer_port: Option<String>,
    #[arg(long)]
    pub printer_baud: Option<u32>,
    #[arg(long)]
    pub printer_ip: Option<String>,
    #[arg(long)]
    pub template_folder: Option<String>,
}

impl DeviceArgs {
    /// Overlay the given values on `settings`
    pub fn apply(self, mut settings: DeviceSettings) -> DeviceSettings {
        if let Some(v) = self.scale_port {
            settings.scale_port = v.trim().to_string();
        }
        if let Some(v) = self.scale_baud {
            settings.scale_baud = v;
        }
        if let Some(v) = self.printer_mode {
            settings.printer_mode = v;
        }
        if let Some(v) = self.printer_port {
            settings.printer_port = v.trim().to_string();
        }
        if let Some(v) = self.printer_baud {
            settings.printer_baud = v;
        }
        if let Some(v) = self.printer_ip {
            settings.printer_ip = v.trim().to_string();
        }
        if let Some(v) = self.template_folder {
            settings.template_folder = v.trim().to_string();
        }
        settings
    }
}

#[derive(Debug, Subcommand)]
pub enum ScaleCommand {
    /// Read one line from the scale and apply the product's tare
    Read {
        #[arg(long)]
        product: Option<String>,
    },
    /// Open and close the scale port
    Test,
}

#[derive(Debug, Subcommand)]
pub enum PrinterCommand {
    /// Check the printer connection
    Test,
    /// Print the built-in sample label
    TestPrint,
}

fn weight_arg(raw: &str) -> Result<f64, String> {
    parse_weight(raw).map_err(|e| e.to_string())
}

struct Output {
    json: bool,
}

impl Output {
    fn show<T: Serialize>(&self, value: &T, text: impl FnOnce(&T) -> String) -> AppResult<()> {
        if self.json {
            let s = serde_json::to_string_pretty(value)
                .map_err(|e| AppError::internal(format!("JSON encoding failed: {e}")))?;
            println!("{s}");
        } else {
            println!("{}", text(value));
        }
        Ok(())
    }
}

/// Run one command against the service
pub async fn run(command: Commands, json: bool, service: &LabelService) -> AppResult<()> {
    let out = Output { json };
    match command {
        Commands::Product(cmd) => run_product(cmd, &out, service).await,
        Commands::Settings(cmd) => run_settings(cmd, &out, service).await,
        Commands::Scale(ScaleCommand::Read { product }) => {
            let report = service.read_weight(product.as_deref()).await?;
            out.show(&report, |r| r.to_string())
        }
        Commands::Scale(ScaleCommand::Test) => {
            let msg = service.test_scale().await?;
            out.show(&msg, |m| m.clone())
        }
        Commands::Print {
            product_code,
            weight,
            lot,
        } => {
            let mut request = LabelRequest::new(product_code, weight);
            request.lot = lot;
            let report = service.print_label(&request).await?;
            out.show(&report, |r| {
                format!(
                    "{} x {:.3} lb = ${:.2} via {}: {}",
                    r.product_code, r.weight, r.total_price, r.transport, r.outcome.message
                )
            })?;
            if !report.outcome.success {
                return Err(AppError::connection(report.outcome.message));
            }
            Ok(())
        }
        Commands::PrintRaw {
            template,
            product,
            weight,
        } => {
            let request = LabelRequest {
                product_code: product,
                weight,
                lot: None,
            };
            let outcome = service.print_raw_template(&template, &request).await?;
            out.show(&outcome, |o| o.message.clone())?;
            if !outcome.success {
                return Err(AppError::connection(outcome.message));
            }
            Ok(())
        }
        Commands::Preview {
            product_code,
            weight,
            lot,
            output,
        } => {
            let mut request = LabelRequest::new(product_code, weight);
            request.lot = lot;
            let report = service.preview(&request, &output).await?;
            out.show(&report, |r| {
                format!("Preview written to {} (${:.2})", r.path.display(), r.total_price)
            })
        }
        Commands::Printer(PrinterCommand::Test) => {
            let outcome = service.test_printer().await?;
            out.show(&outcome, |o| o.message.clone())
        }
        Commands::Printer(PrinterCommand::TestPrint) => {
            let outcome = service.test_print().await?;
            out.show(&outcome, |o| o.message.clone())
        }
        Commands::Barcode { upc, output } => {
            let path = service.generate_barcode(&upc, &output)?;
            out.show(&path, |p| format!("Barcode written to {}", p.display()))
        }
        Commands::Ports => {
            let ports = label_printer::list_ports()?;
            out.show(&ports, |p| {
                if p.is_empty() {
                    "No serial ports found".to_string()
                } else {
                    p.join("\n")
                }
            })
        }
    }
}

async fn run_product(cmd: ProductCommand, out: &Output, service: &LabelService) -> AppResult<()> {
    match cmd {
        ProductCommand::List => {
            let products = service.list_products().await?;
            out.show(&products, |list| {
                list.iter()
                    .map(|p| {
                        format!(
                            "{:<12} {:<30} {:>8.2}",
                            p.product_code,
                            p.description.as_deref().unwrap_or_default(),
                            p.price_per_lb
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        ProductCommand::Show { code } => {
            let product = service.resolve_product(Some(&code)).await?;
            out.show(&product, |p| format!("{p:#?}"))
        }
        ProductCommand::Add(fields) => {
            let input = ProductInput::try_from(fields.apply(ProductForm::default()))?;
            let product = service.create_product(&input).await?;
            out.show(&product, |p| format!("Added {}", p.product_code))
        }
        ProductCommand::Edit { code, fields } => {
            let existing = service.resolve_product(Some(&code)).await?;
            let input = ProductInput::try_from(fields.apply(ProductForm::from_product(&existing)))?;
            let product = service.update_product(&code, &input).await?;
            out.show(&product, |p| format!("Saved {}", p.product_code))
        }
        ProductCommand::Delete { code } => {
            service.delete_product(&code).await?;
            out.show(&code, |c| format!("Deleted {c}"))
        }
    }
}

async fn run_settings(cmd: SettingsCommand, out: &Output, service: &LabelService) -> AppResult<()> {
    match cmd {
        SettingsCommand::List => {
            let settings = service.list_settings().await?;
            out.show(&settings, |list| {
                list.iter()
                    .map(|s| format!("{} = {}", s.key, s.value))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        SettingsCommand::Get { key } => {
            let value = service
                .get_setting(&key)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Setting {key}")))?;
            out.show(&value, |v| v.clone())
        }
        SettingsCommand::Set { key, value } => {
            service.set_setting(&key, &value).await?;
            out.show(&key, |k| format!("{k} updated"))
        }
        SettingsCommand::Save(args) => {
            let settings = args.apply(service.device_settings().await?);
            service.save_device_settings(&settings).await?;
            out.show(&settings, |s| {
                format!("Settings saved (printer: {})", s.effective_mode())
            })
        }
        SettingsCommand::Ui => {
            let ui = service.ui_config().await?;
            out.show(&ui, |u| format!("touch_keyboard = {}", u.touch_keyboard))
        }
    }
}
