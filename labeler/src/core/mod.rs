//! Core module - configuration and environment setup

pub mod config;

pub use config::Config;

/// Load `.env`, then initialize logging from the resulting configuration
pub fn setup_environment() -> anyhow::Result<Config> {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    let log_dir = config
        .log_dir
        .as_ref()
        .map(|d| config.resolve_path(d).to_string_lossy().into_owned());
    crate::utils::logger::init_logger_with_file(
        &config.log_level,
        config.log_json,
        log_dir.as_deref(),
    )?;
    Ok(config)
}
