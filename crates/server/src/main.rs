use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use kapaplane_server::config::{self, LoadError, ServerConfig};
use kapaplane_server::kapacitor::HttpConnector;
use kapaplane_server::rest::{self, AppState};
use kapaplane_server::store::{KapacitorStore, SourceStore};

#[derive(Parser, Debug)]
#[command(name = "kapaplane-server", version, about = "Kapacitor fleet control plane")]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = "kapaplane.yml")]
    config: PathBuf,

    /// Overrides `rest_addr` from the configuration.
    #[arg(short, long)]
    listen: Option<SocketAddr>,
}

fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
    match config::load_from_file(path) {
        Ok(cfg) => Ok(cfg),
        Err(LoadError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
            Ok(ServerConfig::default())
        }
        Err(e) => Err(e).with_context(|| format!("loading {}", path.display())),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let mut config = load_config(&args.config)?;
    if let Some(addr) = args.listen {
        config.rest_addr = addr;
    }

    let sources = SourceStore::new();
    for source in config.source_records() {
        tracing::info!(src_id = source.id, url = %source.url, "source registered");
        sources.insert(source);
    }

    let state = AppState {
        sources: Arc::new(sources),
        kapacitors: Arc::new(KapacitorStore::new()),
        engines: Arc::new(HttpConnector::new(config.remote_timeout())),
    };
    let app = rest::router(state);

    let rest_addr = config.rest_addr;
    tracing::info!(%rest_addr, "REST server starting");
    let listener = tokio::net::TcpListener::bind(rest_addr)
        .await
        .with_context(|| format!("binding {rest_addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}
