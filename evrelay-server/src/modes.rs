//! Wiring of the three run modes.

use crate::config::{IngressSettings, LocalSettings, WorkerSettings};
use crate::server::{build_router, run_server};
use crate::state::AppState;
use evrelay_core::auth::Authenticator;
use evrelay_core::backends::memory::{InMemoryObjectStore, InMemoryQueue};
use evrelay_core::backends::{MessageQueue, ObjectStore};
use evrelay_core::processors::{QueuePublisher, RelayWorker};
use std::sync::Arc;
use tokio::sync::watch;

/// Fetch the authority token, then serve the ingress until shutdown.
#[cfg(feature = "aws")]
pub async fn run_ingress(
    settings: IngressSettings,
    shutdown_rx: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    use anyhow::Context;
    use evrelay_core::backends::aws::{SqsQueue, SsmSecretSource, load_sdk_config};

    let sdk_config = load_sdk_config(settings.region).await;

    tracing::info!("Fetching authority token...");
    let authenticator =
        Authenticator::from_source(&SsmSecretSource::new(&sdk_config), &settings.token_parameter)
            .await
            .context("failed to load the authority token")?;

    let queue: Arc<dyn MessageQueue> = Arc::new(SqsQueue::new(&sdk_config, settings.queue_url));
    let state = AppState::new(authenticator, QueuePublisher::new(queue));

    tracing::info!("Starting HTTP server on {}", settings.listen);
    run_server(build_router(state), settings.listen, shutdown_rx).await?;
    Ok(())
}

#[cfg(not(feature = "aws"))]
pub async fn run_ingress(
    _settings: IngressSettings,
    _shutdown_rx: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    anyhow::bail!("the ingress mode needs the `aws` feature; rebuild with `--features aws`")
}

/// Drain the SQS queue into S3 until shutdown.
#[cfg(feature = "aws")]
pub async fn run_worker(
    settings: WorkerSettings,
    shutdown_rx: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    use evrelay_core::backends::aws::{S3ObjectStore, SqsQueue, load_sdk_config};

    let sdk_config = load_sdk_config(settings.region).await;
    let queue: Arc<dyn MessageQueue> = Arc::new(SqsQueue::new(&sdk_config, settings.queue_url));
    let store: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::new(&sdk_config, settings.bucket));

    RelayWorker::new(queue, store, &settings.worker, settings.layout)
        .run(shutdown_rx)
        .await;
    Ok(())
}

#[cfg(not(feature = "aws"))]
pub async fn run_worker(
    _settings: WorkerSettings,
    _shutdown_rx: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    anyhow::bail!("the worker mode needs the `aws` feature; rebuild with `--features aws`")
}

/// Ingress and worker in one process over in-memory backends.
///
/// The worker stops whenever the server does, including when the server
/// fails to start.
pub async fn run_local(
    settings: LocalSettings,
    shutdown_rx: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    tracing::warn!("Running with in-memory queue and store; nothing survives a restart");

    let queue: Arc<dyn MessageQueue> = Arc::new(InMemoryQueue::default());
    let store: Arc<dyn ObjectStore> = Arc::new(InMemoryObjectStore::new());

    let (worker_stop_tx, worker_stop_rx) = watch::channel(false);
    let worker = RelayWorker::new(queue.clone(), store, &settings.worker, settings.layout);
    let worker_handle = tokio::spawn(worker.run(worker_stop_rx));

    let state = AppState::new(
        Authenticator::new(settings.token),
        QueuePublisher::new(queue),
    );
    tracing::info!("Starting HTTP server on {}", settings.listen);
    let served = run_server(build_router(state), settings.listen, shutdown_rx).await;
    if let Err(e) = &served {
        tracing::error!(error = %e, "HTTP server failed, stopping worker");
    }

    let _ = worker_stop_tx.send(true);
    if let Err(e) = worker_handle.await {
        tracing::error!(error = %e, "Worker task failed");
    }
    served.map_err(Into::into)
}
