use crate::api::DEFAULT_API_URL;
use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_LOG_DIR: &str = "./logs";
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Parser, Debug)]
#[command(
    name = "device-console",
    version,
    about = "Terminal console for device place balances",
    long_about = None
)]
pub struct Args {
    /// Base URL of the device API (including the /api/v1 prefix)
    #[arg(long = "api-url", env = "DEVICE_CONSOLE_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Directory for the rolling log file
    #[arg(long = "log-dir", env = "DEVICE_CONSOLE_LOG_DIR", default_value = DEFAULT_LOG_DIR)]
    pub log_dir: String,

    /// tracing filter directives, e.g. `device_console=debug`
    #[arg(long = "log-filter")]
    pub log_filter: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AppConfig {
    pub api_url: String,
    pub log_dir: PathBuf,
    pub log_filter: String,
}

impl Args {
    /// Resolves the log filter as `--log-filter`, then `RUST_LOG`, then
    /// [`DEFAULT_LOG_FILTER`].
    pub fn into_config(self, rust_log: Option<String>) -> AppConfig {
        let log_filter = self
            .log_filter
            .or(rust_log)
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        AppConfig {
            api_url: self.api_url,
            log_dir: PathBuf::from(shellexpand::tilde(&self.log_dir).into_owned()),
            log_filter,
        }
    }
}
