//! evrelay server
//!
//! Accepts event submissions over HTTP, queues them, and drains the queue
//! into object storage.

use clap::{Parser, Subcommand};
use evrelay_server::config::{ConfigLoader, ConfigOverrides, legacy_bucket_from_env};
use evrelay_server::modes::{run_ingress, run_local, run_worker};
use evrelay_server::shutdown::spawn_shutdown_listener;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// evrelay - two-stage event relay (HTTP ingress -> queue -> object store)
#[derive(Parser, Debug)]
#[command(name = "evrelay-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to an optional TOML configuration file
    #[arg(short, long, env = "EVRELAY_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Override the listen address (e.g., 0.0.0.0:8080)
    #[arg(short, long, env = "LISTEN_ADDR", global = true)]
    listen: Option<SocketAddr>,

    /// URL of the queue events are sent to and drained from
    #[arg(long, env = "SQS_QUEUE_URL", global = true)]
    queue_url: Option<String>,

    /// Bucket the worker writes messages to
    #[arg(long, env = "S3_BUCKET_NAME", global = true)]
    bucket: Option<String>,

    /// Name of the parameter holding the authority token
    #[arg(long, env = "SSM_PARAMETER_NAME", global = true)]
    token_parameter: Option<String>,

    /// AWS region override
    #[arg(long, env = "AWS_REGION", global = true)]
    region: Option<String>,

    /// Authority token for the local mode
    #[arg(long, env = "RELAY_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Mode {
    /// Serve the HTTP ingress and enqueue accepted events
    Ingress,
    /// Poll the queue and store every message
    Worker,
    /// Ingress and worker in one process with in-memory backends
    Local,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!(
        "Starting evrelay-server v{} in {:?} mode",
        env!("CARGO_PKG_VERSION"),
        args.mode
    );

    let overrides = ConfigOverrides {
        listen: args.listen,
        region: args.region,
        queue_url: args.queue_url,
        bucket: args.bucket.or_else(legacy_bucket_from_env),
        token_parameter: args.token_parameter,
        token: args.token,
    };
    let config_loader = ConfigLoader::new(args.config.as_deref(), overrides);

    let shutdown_rx = spawn_shutdown_listener();

    let result = match args.mode {
        Mode::Ingress => {
            let settings = config_loader.load_ingress().inspect_err(log_config_error)?;
            run_ingress(settings, shutdown_rx).await
        }
        Mode::Worker => {
            let settings = config_loader.load_worker().inspect_err(log_config_error)?;
            run_worker(settings, shutdown_rx).await
        }
        Mode::Local => {
            let settings = config_loader.load_local().inspect_err(log_config_error)?;
            run_local(settings, shutdown_rx).await
        }
    };

    match &result {
        Ok(()) => tracing::info!("Shutdown complete"),
        Err(e) => tracing::error!("Exiting with error: {:#}", e),
    }
    result
}

fn log_config_error(e: &evrelay_server::config::ConfigError) {
    tracing::error!("Failed to load configuration: {}", e);
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,aws_config=warn,aws_smithy_runtime=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
