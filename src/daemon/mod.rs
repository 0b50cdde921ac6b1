use crate::config::Config;
use crate::error::Result;
use crate::ledger::{Ledger, create_ledger};
use crate::mastodon::{Account, EventSource, MastodonClient, StatusDeleter, UserStream};
use crate::sweeper::{SweepReport, SweepSettings, Sweeper};
use crate::watcher::{StreamConsumer, StreamSettings};
use anyhow::Context;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

mod supervisor;

use supervisor::spawn_component_supervisor;

/// Ready-to-use handles produced by bootstrap. Read-only after construction.
pub struct Runtime {
    pub identity: Arc<Account>,
    pub ledger: Arc<dyn Ledger>,
    pub client: Arc<MastodonClient>,
}

/// Open the ledger and make sure its table exists. Failure here is fatal.
pub async fn prepare_ledger(config: &Config) -> Result<Arc<dyn Ledger>> {
    let ledger = create_ledger(&config.ledger).await?;
    ledger.ensure_schema().await?;
    Ok(ledger)
}

fn new_client(config: &Config) -> Result<MastodonClient> {
    Ok(MastodonClient::with_timeout(
        &config.mastodon.server,
        config.mastodon.access_token.clone(),
        config.mastodon.request_timeout(),
    )?)
}

/// Validate config, prepare the ledger and resolve the watched identity.
pub async fn bootstrap(config: &Config) -> Result<Runtime> {
    config.validate_for_daemon()?;

    let ledger = prepare_ledger(config).await?;
    let client = new_client(config)?;
    let identity = client.verify_credentials().await?;
    tracing::info!(acct = %identity.acct, server = %client.server(), "authenticated");

    Ok(Runtime {
        identity: Arc::new(identity),
        ledger,
        client: Arc::new(client),
    })
}

/// Spawn the stream consumer and the sweeper under supervision.
pub fn spawn_workers(
    config: &Config,
    runtime: &Runtime,
    shutdown: &CancellationToken,
) -> Result<Vec<JoinHandle<()>>> {
    let restart_delay = config.stream.reconnect_delay();

    let source: Arc<dyn EventSource> = Arc::new(UserStream::new(&runtime.client)?);
    let consumer = Arc::new(StreamConsumer::new(
        source,
        Arc::clone(&runtime.ledger),
        Arc::clone(&runtime.identity),
        StreamSettings::from_config(&config.stream),
    ));

    let deleter: Arc<dyn StatusDeleter> = runtime.client.clone();
    let sweeper = Arc::new(Sweeper::new(
        Arc::clone(&runtime.ledger),
        deleter,
        SweepSettings::from_config(&config.sweep),
    ));

    let consumer_token = shutdown.clone();
    let sweeper_token = shutdown.clone();
    Ok(vec![
        spawn_component_supervisor("stream", restart_delay, shutdown.clone(), move || {
            let consumer = Arc::clone(&consumer);
            let token = consumer_token.clone();
            async move { consumer.run(token).await }
        }),
        spawn_component_supervisor("sweeper", restart_delay, shutdown.clone(), move || {
            let sweeper = Arc::clone(&sweeper);
            let token = sweeper_token.clone();
            async move { sweeper.run(token).await }
        }),
    ])
}

/// Long-running agent: bootstrap, run both workers, stop on Ctrl-C / SIGTERM.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let runtime = bootstrap(&config).await.context("startup failed")?;

    let shutdown = CancellationToken::new();
    let handles = spawn_workers(&config, &runtime, &shutdown)?;

    shutdown_signal().await;
    tracing::info!("shutdown requested, waiting for workers");
    shutdown.cancel();

    for handle in handles {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "worker did not stop cleanly");
        }
    }

    Ok(())
}

/// Single sweep cycle, for cron-style deployments and manual runs.
pub async fn sweep_once(config: &Config) -> Result<SweepReport> {
    config.validate_for_daemon()?;

    let ledger = prepare_ledger(config).await?;
    let client = new_client(config)?;
    let sweeper = Sweeper::new(
        ledger,
        Arc::new(client),
        SweepSettings::from_config(&config.sweep),
    );
    Ok(sweeper.sweep().await?)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
