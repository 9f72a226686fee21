//! castwire-sender entry point.
//!
//! ```text
//! castwire-sender --host 192.168.1.40          Cast with defaults
//! castwire-sender --config <path>              Use custom config TOML
//! castwire-sender --gen-config                 Dump default config and exit
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use castwire_core::{CastSession, TlsConnector};
use castwire_sender::{Sender, SenderConfig, SenderError};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "castwire-sender", about = "Play a local stream on a cast receiver")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "castwire-sender.toml")]
    config: PathBuf,

    /// Receiver address (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Receiver control port (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        println!("{}", SenderConfig::default_toml()?);
        return Ok(());
    }

    let mut config = SenderConfig::load(&cli.config);
    if let Some(host) = cli.host {
        config.network.host = host;
    }
    if let Some(port) = cli.port {
        config.network.port = port;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("castwire-sender v{}", env!("CARGO_PKG_VERSION"));

    if config.network.host.is_empty() {
        return Err(SenderError::NoHost.into());
    }

    // ── 1. Connect to the receiver ──────────────────────────────

    let connector = TlsConnector::new(&config.session.transport)?;
    let session = CastSession::connect(
        &connector,
        &config.network.host,
        config.network.port,
        &config.session,
    )
    .await?;

    // ── 2. Stop on Ctrl-C ───────────────────────────────────────

    let interrupt = session.interrupt_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.interrupt();
        }
    });

    // ── 3. Launch, load and keep the session alive ──────────────

    let mut sender = Sender::new(
        session,
        config.media.load_request(),
        config.network.request_timeout(),
    );
    sender.start().await?;

    if let Err(e) = sender.run().await {
        error!("session ended: {e}");
        return Err(e.into());
    }

    info!("shut down");
    Ok(())
}
