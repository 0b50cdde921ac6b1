use super::classifier::pending_entry;
use crate::config::StreamConfig;
use crate::ledger::Ledger;
use crate::mastodon::{Account, EventSource, EventStream, StreamEvent};
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct StreamSettings {
    /// Fixed wait in `Disconnected` before the next connect attempt.
    pub reconnect_delay: Duration,
    pub connect_timeout: Duration,
    /// A session with no frame at all for this long is considered dead.
    pub idle_timeout: Duration,
}

impl StreamSettings {
    pub fn from_config(config: &StreamConfig) -> Self {
        Self {
            reconnect_delay: config.reconnect_delay(),
            connect_timeout: config.connect_timeout(),
            idle_timeout: config.idle_timeout(),
        }
    }
}

enum ConsumerState {
    Connecting,
    Streaming(EventStream),
    Disconnected,
}

/// Keeps the user stream open forever and records qualifying posts.
///
/// `Connecting → Streaming → Disconnected → Connecting`, with a fixed delay in
/// `Disconnected` and no retry cap. A connect attempt that hangs, or a session
/// that goes silent past the idle window, counts as a disconnect. Only the
/// shutdown token ends the loop.
pub struct StreamConsumer {
    source: Arc<dyn EventSource>,
    ledger: Arc<dyn Ledger>,
    identity: Arc<Account>,
    settings: StreamSettings,
}

impl StreamConsumer {
    pub fn new(
        source: Arc<dyn EventSource>,
        ledger: Arc<dyn Ledger>,
        identity: Arc<Account>,
        settings: StreamSettings,
    ) -> Self {
        Self {
            source,
            ledger,
            identity,
            settings,
        }
    }

    pub async fn run(&self, shutdown: CancellationToken) {
        let mut state = ConsumerState::Connecting;
        let mut attempt: u64 = 0;

        tracing::info!(acct = %self.identity.acct, "watch start");

        loop {
            state = match state {
                ConsumerState::Connecting => {
                    attempt = attempt.saturating_add(1);
                    tokio::select! {
                        () = shutdown.cancelled() => break,
                        result = time::timeout(self.settings.connect_timeout, self.source.connect()) => match result {
                            Ok(Ok(events)) => {
                                tracing::info!(attempt, "stream connected");
                                attempt = 0;
                                ConsumerState::Streaming(events)
                            }
                            Ok(Err(e)) => {
                                tracing::warn!(attempt, error = %e, "stream connection failed");
                                ConsumerState::Disconnected
                            }
                            Err(_) => {
                                tracing::warn!(
                                    attempt,
                                    timeout_secs = self.settings.connect_timeout.as_secs(),
                                    "stream connection timed out"
                                );
                                ConsumerState::Disconnected
                            }
                        }
                    }
                }
                ConsumerState::Streaming(mut events) => {
                    tokio::select! {
                        () = shutdown.cancelled() => break,
                        reason = self.pump(&mut events) => {
                            tracing::warn!(%reason, "stream disconnected");
                            ConsumerState::Disconnected
                        }
                    }
                }
                ConsumerState::Disconnected => {
                    tracing::info!(
                        delay_secs = self.settings.reconnect_delay.as_secs(),
                        "reconnecting after delay"
                    );
                    tokio::select! {
                        () = shutdown.cancelled() => break,
                        () = time::sleep(self.settings.reconnect_delay) => ConsumerState::Connecting,
                    }
                }
            };
        }

        tracing::info!("stream consumer stopped");
    }

    /// Drain events until the stream errors, ends or goes idle; returns the reason.
    async fn pump(&self, events: &mut EventStream) -> String {
        loop {
            let event = match time::timeout(self.settings.idle_timeout, events.next()).await {
                Ok(Some(event)) => event,
                Ok(None) => return "stream ended".to_string(),
                Err(_) => {
                    return format!(
                        "no frames for {}s",
                        self.settings.idle_timeout.as_secs()
                    );
                }
            };
            match event {
                StreamEvent::Error(reason) => return reason,
                StreamEvent::Heartbeat => {}
                event => {
                    self.handle_event(&event).await;
                }
            }
        }
    }

    /// Record the event in the ledger if it qualifies. Returns whether a write
    /// landed. Write failures are logged, never propagated.
    pub async fn handle_event(&self, event: &StreamEvent) -> bool {
        let Some(entry) = pending_entry(event, &self.identity) else {
            tracing::trace!(kind = event.kind(), "ignoring stream event");
            return false;
        };

        tracing::info!(post_id = %entry.id, created_at = entry.created_at, "put toot to ledger");
        match self.ledger.upsert(&entry).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(post_id = %entry.id, error = %e, "toot put error");
                false
            }
        }
    }
}
