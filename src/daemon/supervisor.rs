use std::future::Future;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

/// Run `run_component` in its own task and restart it after `restart_delay`
/// if it returns or panics before shutdown. Exits once `shutdown` fires and
/// the current run has returned.
pub(super) fn spawn_component_supervisor<F, Fut>(
    name: &'static str,
    restart_delay: Duration,
    shutdown: CancellationToken,
    mut run_component: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            tracing::info!("component '{name}' starting");
            match tokio::spawn(run_component()).await {
                Ok(()) if shutdown.is_cancelled() => break,
                Ok(()) => tracing::warn!("component '{name}' exited unexpectedly"),
                Err(e) => tracing::error!("component '{name}' failed: {e}"),
            }

            tokio::select! {
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(restart_delay) => {}
            }
        }
        tracing::info!("component '{name}' stopped");
    })
}
