//! DWG SMS server: entry point.
//!
//! ```text
//! dwg-server                     Listen with dwg-server.toml or defaults
//! dwg-server --config <path>     Load a custom config TOML
//! dwg-server --port <port>       Override the listen port
//! dwg-server --gen-config        Write default config to stdout
//! dwg-server --init              Write default config to the --config path
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dwg_core::DwgServer;
use dwg_server::config::AppConfig;
use dwg_server::report;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "dwg-server", about = "SMS server for DWG GSM gateways")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "dwg-server.toml")]
    config: PathBuf,

    /// Listen port, overriding the configuration file.
    #[arg(short, long)]
    port: Option<u16>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Write the default configuration to the --config path and exit.
    #[arg(long)]
    init: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&AppConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    if cli.init {
        AppConfig::write_default(&cli.config)?;
        println!("Wrote {}", cli.config.display());
        return Ok(());
    }

    let mut config = AppConfig::load(&cli.config);
    if let Some(port) = cli.port {
        config.gateway.listen_port = port;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("dwg-server v{}", env!("CARGO_PKG_VERSION"));

    let server_config = config.to_server_config()?;
    let (server, events) = DwgServer::new(server_config);
    let reporter = tokio::spawn(report::log_events(events));

    let addr = server.start().await?;
    info!("waiting for gateway on {addr}");

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, shutting down");

    if let Err(e) = server.stop().await {
        info!("stop: {e}");
    }
    // The reporter ends once the connection task releases the server.
    drop(server);
    report::finish(reporter, Duration::from_secs(2)).await;

    Ok(())
}
