use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use omf_publisher::cache::token_cache::TokenCache;
use omf_publisher::dispatch::{DispatchSummary, Dispatcher, EndpointTarget};
use omf_publisher::observability::metrics::Metrics;
use omf_publisher::omf::payload;
use omf_publisher::transport::ReqwestTransport;
use omf_publisher::utils::config_loader;
use omf_publisher::utils::logging;
use omf_publisher::utils::logging::LogLevel;
use tracing::{error, info};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "appsettings.json")]
    config: String,
    #[arg(long, default_value = "OMF-Types.json")]
    types: PathBuf,
    #[arg(long, default_value = "OMF-Containers.json")]
    containers: PathBuf,
    #[arg(long, default_value = "OMF-Data.json")]
    data: PathBuf,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    /// fail the run when any endpoint fails, not only on token failures
    #[arg(long)]
    strict: bool,
    /// write the run's metrics in Prometheus text format
    #[arg(long)]
    metrics_out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // -------------------------------
    // 1. Read args, load config
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(&args.config).await?;
    logging::run(&service_config, args.log_level);
    let strict = args.strict || service_config.settings.dispatch.strict;

    // -------------------------------
    // 2. Load OMF payloads, before any network call
    // -------------------------------

    let messages = payload::load_messages(&args.types, &args.containers, &args.data).await?;

    // -------------------------------
    // 3. One transport per endpoint, honoring its verify_ssl
    // -------------------------------

    let mut targets = Vec::with_capacity(service_config.endpoints.len());
    for (index, endpoint) in service_config.endpoints.iter().enumerate() {
        let transport =
            ReqwestTransport::for_endpoint(endpoint, &service_config.settings.timeouts)?;
        targets.push(EndpointTarget::new(index, endpoint.clone(), transport));
    }

    // -------------------------------
    // 4. Dispatch
    // -------------------------------

    let metrics = Arc::new(Metrics::new()?);
    let tokens = Arc::new(TokenCache::new(
        service_config.settings.safety_margin_seconds,
        metrics.clone(),
    ));
    let dispatcher = Dispatcher::new(targets, tokens, &service_config.settings, metrics.clone());
    let outcomes = dispatcher.dispatch_all(messages.into()).await;

    // -------------------------------
    // 5. Summary, metrics, exit status
    // -------------------------------

    let summary = DispatchSummary::new(outcomes);
    summary.log();

    if let Some(path) = &args.metrics_out {
        let rendered = metrics.render()?;
        tokio::fs::write(path, rendered)
            .await
            .with_context(|| format!("unable to write metrics to '{}'", path.display()))?;
        info!("metrics written to {}", path.display());
    }

    if summary.is_run_failure(strict) {
        error!(strict, "run failed");
        return Ok(ExitCode::FAILURE);
    }
    info!("run finished");
    Ok(ExitCode::SUCCESS)
}
