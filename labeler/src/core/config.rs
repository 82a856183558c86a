use label_printer::{FontPaths, RAW_PRINT_PORT};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Process configuration
///
/// # Environment variables
///
/// Every field can be overridden from the environment (a `.env` file is
/// loaded first):
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | . | base directory for relative paths |
/// | DATABASE_PATH | labeler.db | SQLite file |
/// | LOG_LEVEL | info | tracing level |
/// | LOG_JSON | false | JSON console output |
/// | LOG_DIR | (unset) | enables file logging |
/// | LABEL_FONT_REGULAR | (unset) | regular TTF/OTF path |
/// | LABEL_FONT_BOLD | (unset) | bold TTF/OTF path |
/// | SCALE_TIMEOUT_MS | 1000 | scale read timeout |
/// | PRINTER_SERIAL_TIMEOUT_MS | 2000 | serial printer timeout |
/// | PRINTER_NETWORK_TIMEOUT_MS | 5000 | TCP connect/send timeout |
/// | PRINTER_NETWORK_PORT | 9100 | raw printing port |
///
/// Operator settings (ports, baud rates, printer mode) are not here; they
/// live in the settings table and are read per operation.
///
/// # Example
///
/// ```ignore
/// WORK_DIR=/srv/labeler LOG_LEVEL=debug labeler print T100 --weight 3.25
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Base directory for the database, templates and logs
    pub work_dir: String,
    /// SQLite file, relative to `work_dir` unless absolute
    pub database_path: String,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
    pub font_regular: Option<String>,
    pub font_bold: Option<String>,
    pub scale_timeout_ms: u64,
    pub printer_serial_timeout_ms: u64,
    pub printer_network_timeout_ms: u64,
    pub printer_network_port: u16,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Load configuration from environment variables, defaults where unset
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| ".".into()),
            database_path: std::env::var("DATABASE_PATH").unwrap_or_else(|_| "labeler.db".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: env_or("LOG_JSON", false),
            log_dir: env_opt("LOG_DIR"),
            font_regular: env_opt("LABEL_FONT_REGULAR"),
            font_bold: env_opt("LABEL_FONT_BOLD"),
            scale_timeout_ms: env_or("SCALE_TIMEOUT_MS", 1000),
            printer_serial_timeout_ms: env_or("PRINTER_SERIAL_TIMEOUT_MS", 2000),
            printer_network_timeout_ms: env_or("PRINTER_NETWORK_TIMEOUT_MS", 5000),
            printer_network_port: env_or("PRINTER_NETWORK_PORT", RAW_PRINT_PORT),
        }
    }

    /// Override the work directory and database file
    ///
    /// Mostly used by tests
    pub fn with_overrides(work_dir: impl Into<String>, database_path: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.database_path = database_path.into();
        config
    }

    /// Resolve a path against `work_dir` unless it is already absolute
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            Path::new(&self.work_dir).join(path)
        }
    }

    pub fn database_file(&self) -> PathBuf {
        self.resolve_path(&self.database_path)
    }

    pub fn font_paths(&self) -> FontPaths {
        FontPaths {
            regular: self.font_regular.as_ref().map(|p| self.resolve_path(p)),
            bold: self.font_bold.as_ref().map(|p| self.resolve_path(p)),
        }
    }

    pub fn scale_timeout(&self) -> Duration {
        Duration::from_millis(self.scale_timeout_ms)
    }

    pub fn printer_serial_timeout(&self) -> Duration {
        Duration::from_millis(self.printer_serial_timeout_ms)
    }

    pub fn printer_network_timeout(&self) -> Duration {
        Duration::from_millis(self.printer_network_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
