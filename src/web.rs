#![cfg(not(tarpaulin_include))]

use std::path::PathBuf;

use toolbench::app;
use toolbench::config::Config;

/// Main entry point for the web application
///
/// Loads the configuration (an optional path as the first argument, else
/// `toolbench.toml` and the `TOOLBENCH_*` environment) and serves every tool
/// until the process is stopped.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::load(path.as_deref())?;

    app::run(config).await
}
