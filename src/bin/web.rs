#![cfg(not(tarpaulin_include))]

use std::env;
use usergrid::{Config, app};

/// Main entry point for the web application
///
/// Reads the configuration from `USERGRID_*` environment variables, lets the
/// positional arguments `<addr> [data_dir]` override it, and serves the API.
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let config = Config::from_env().with_args(&args);

    app::run(config).await
}
