use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ootd_engine::config::Config;
use ootd_engine::http::{AppState, start_http_server};

/// AI outfit generation service: dynamic questionnaire, outfit reports,
/// and image synthesis behind one HTTP API
#[derive(Parser, Debug)]
#[command(name = "ootd-engine", version)]
struct Args {
    /// Path to the TOML config file (defaults to ootd.toml)
    #[arg(long)]
    config: Option<String>,

    /// Override the listen address from config
    #[arg(long)]
    bind: Option<std::net::SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    ootd_engine::load_env();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ootd_engine=info")),
        )
        .init();

    let mut config = Config::load_from(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.runtime.http_bind = bind;
    }

    tracing::info!(
        "Starting ootd-engine (report model {}, image chain {:?})",
        config.generation.report_model,
        config.image.providers
    );

    let state = AppState::from_config(config)?;
    start_http_server(state).await?;

    Ok(())
}
