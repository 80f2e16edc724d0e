use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use qurse_chat::{ChatService, SearchConfig};

mod config;
mod web;

use config::AppConfig;
use web::server::{WebServer, WebServerConfig};

/// Qurse - AI chat service with multi-provider model routing and
/// search-augmented generation
#[derive(Parser, Debug)]
#[command(name = "qurse", version, about)]
struct Args {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1", env = "QURSE_HOST")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 3100, env = "QURSE_PORT")]
    port: u16,

    /// Path to the optional TOML configuration file
    #[arg(long, default_value = "qurse.toml")]
    config: PathBuf,

    /// Verbose request/response debugging
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up provider credentials from a local .env during development
    dotenvy::dotenv().ok();

    let args = Args::parse();
    if args.verbose {
        std::env::set_var("QURSE_VERBOSE", "1");
    }

    let app_config = AppConfig::load(&args.config)?;
    let registry = app_config.build_registry();
    let budgets = app_config.build_budgets();

    let enabled_models: usize = registry.enabled_groups().map(|g| g.models.len()).sum();
    println!(
        "{}",
        format!("Loaded model registry: {} models available", enabled_models).bright_green()
    );

    let service = Arc::new(ChatService::new(registry, budgets, SearchConfig::from_env()));

    let bind_addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", args.host, args.port))?;

    let server = WebServer::new(WebServerConfig { bind_addr }, service);
    server.start().await
}
