use clap::Parser;
use elevation::api;
use elevation::config::{Config, ConfigError, ValidationError};
use elevation::proxy::ElevationProxy;
use metrics_exporter_statsd::StatsdBuilder;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "elevationd",
    about = "Batching, caching proxy in front of a remote elevation API"
)]
struct Cli {
    /// Path to the YAML configuration file. Built-in defaults are used when
    /// omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(thiserror::Error, Debug)]
enum StartupError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid config: {0}")]
    Validation(#[from] ValidationError),
    #[error("could not build upstream client: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error("could not install metrics recorder: {0}")]
    Metrics(String),
    #[error("server error: {0}")]
    Api(#[from] api::ApiError),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(err) = run().await {
        eprintln!("elevationd failed: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.validate()?;

    if let Some(metrics_config) = &config.metrics {
        let recorder = StatsdBuilder::from(
            metrics_config.statsd_host.as_str(),
            metrics_config.statsd_port,
        )
        .build(Some("elevationd"))
        .map_err(|e| StartupError::Metrics(e.to_string()))?;
        metrics::set_global_recorder(recorder)
            .map_err(|e| StartupError::Metrics(e.to_string()))?;
    }

    tracing::info!(
        upstream = %config.upstream.endpoint,
        batch_size = config.upstream.batch_size,
        max_points = config.max_points,
        "starting elevation proxy"
    );

    let listener = config.listener.clone();
    let proxy = Arc::new(ElevationProxy::new(config)?);
    api::serve(&listener, proxy).await?;
    Ok(())
}
