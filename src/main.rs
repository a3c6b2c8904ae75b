use clap::Parser;
use color_eyre::eyre::Result;
use device_console::{
    config::Args,
    logging,
};

mod app;
mod ui;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let config = Args::parse().into_config(std::env::var("RUST_LOG").ok());
    logging::init_file_logging(&config.log_dir, &config.log_filter)?;
    tracing::info!(api_url = %config.api_url, "starting device console");
    app::run_app(config).await
}
