//! Headless response window driven over stdin/stdout.
//!
//! Reads host envelopes and UI events as newline-delimited JSON from stdin
//! and writes outbound events to stdout. All tracing goes to stderr so that
//! stdout remains a clean JSON protocol channel.

use std::path::PathBuf;

use clap::Parser;
use response_window::bridge::run_stdio_bridge;
use response_window::store::{FileStore, MemoryStore, StateStore};
use response_window::window::{ResponseWindow, SystemClipboard};
use response_window::WindowConfig;

#[derive(Parser)]
#[command(name = "response-window", version, about)]
struct Cli {
    /// Path to a config file (defaults to the user config directory).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep state in memory only; nothing is read from or written to disk.
    #[arg(long)]
    ephemeral: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("response_window=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = WindowConfig::load(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("failed to load config: {e}"))?;

    tracing::info!(ephemeral = cli.ephemeral, "response-window starting");

    if cli.ephemeral {
        serve(&config, MemoryStore::new()).await?;
    } else {
        let path = config.store.resolved_state_file();
        match FileStore::open_or_reset(&path) {
            Ok(store) => {
                tracing::info!(path = %store.path().display(), "using state file");
                serve(&config, store).await?;
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "state file unusable; keeping state in memory"
                );
                serve(&config, MemoryStore::new()).await?;
            }
        }
    }

    tracing::info!("response-window shut down cleanly");
    Ok(())
}

async fn serve<S>(config: &WindowConfig, store: S) -> anyhow::Result<()>
where
    S: StateStore + Send + 'static,
{
    let mut window = ResponseWindow::new(config, store, SystemClipboard);
    if let Err(e) = window.restore() {
        tracing::warn!(error = %e, "could not restore persisted state; starting fresh");
    }

    run_stdio_bridge(window, config.runtime.queue_capacity)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "response-window exited with error");
            anyhow::anyhow!("response-window failed: {e}")
        })?;
    Ok(())
}
