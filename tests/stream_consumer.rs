#[path = "support/harness.rs"]
mod harness;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use harness::{MemoryLedger, ScriptedSource, alice, post_event, stream_settings};
use private_toot_remover::error::MastodonError;
use private_toot_remover::mastodon::{EventSource, EventStream, StreamEvent, Visibility};
use private_toot_remover::watcher::StreamConsumer;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const BACKOFF: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const IDLE: Duration = Duration::from_secs(120);

fn start(
    source: Arc<dyn EventSource>,
    ledger: &Arc<MemoryLedger>,
) -> (CancellationToken, JoinHandle<()>) {
    let consumer = StreamConsumer::new(
        source,
        ledger.clone(),
        Arc::new(alice()),
        stream_settings(BACKOFF),
    );
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    let task = tokio::spawn(async move { consumer.run(token).await });
    (shutdown, task)
}

async fn wait_for<F: Fn() -> bool>(condition: F) {
    for _ in 0..600 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    panic!("condition not reached");
}

#[tokio::test(start_paused = true)]
async fn reconnects_after_failures_with_fixed_backoff() {
    let source = Arc::new(ScriptedSource::new(
        3,
        vec![vec![post_event("P1", "alice", Visibility::Private, 0)]],
    ));
    let ledger = Arc::new(MemoryLedger::default());
    let (shutdown, task) = start(source.clone(), &ledger);

    wait_for(|| ledger.get("P1").is_some()).await;

    // N failures → N+1 attempts before streaming.
    let attempts = source.attempts();
    assert_eq!(attempts.len(), 4);
    for pair in attempts.windows(2) {
        assert_eq!(pair[1] - pair[0], BACKOFF);
    }

    shutdown.cancel();
    task.await.unwrap();
    assert_eq!(source.attempt_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn never_gives_up_while_connect_keeps_failing() {
    let source = Arc::new(ScriptedSource::new(usize::MAX, Vec::new()));
    let ledger = Arc::new(MemoryLedger::default());
    let (shutdown, task) = start(source.clone(), &ledger);

    tokio::time::sleep(Duration::from_secs(10 * 50 + 5)).await;
    assert_eq!(source.attempt_count(), 51);

    shutdown.cancel();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn stream_error_triggers_reconnect() {
    let source = Arc::new(ScriptedSource::new(
        0,
        vec![
            vec![StreamEvent::Error("connection reset".into())],
            vec![post_event("P2", "alice", Visibility::Private, 50)],
        ],
    ));
    let ledger = Arc::new(MemoryLedger::default());
    let (shutdown, task) = start(source.clone(), &ledger);

    wait_for(|| ledger.get("P2").is_some()).await;
    let attempts = source.attempts();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[1] - attempts[0], BACKOFF);

    shutdown.cancel();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn events_after_error_in_same_session_are_not_processed() {
    let source = Arc::new(ScriptedSource::new(
        0,
        vec![
            vec![
                StreamEvent::Error("broken".into()),
                post_event("LOST", "alice", Visibility::Private, 1),
            ],
            vec![post_event("P3", "alice", Visibility::Private, 2)],
        ],
    ));
    let ledger = Arc::new(MemoryLedger::default());
    let (shutdown, task) = start(source.clone(), &ledger);

    wait_for(|| ledger.get("P3").is_some()).await;
    assert_eq!(ledger.get("LOST"), None);

    shutdown.cancel();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn only_qualifying_updates_reach_the_ledger() {
    let source = Arc::new(ScriptedSource::new(
        0,
        vec![vec![
            post_event("pub", "alice", Visibility::Public, 1),
            post_event("unl", "alice", Visibility::Unlisted, 1),
            post_event("dm", "alice", Visibility::Direct, 1),
            post_event("bob", "bob", Visibility::Private, 1),
            StreamEvent::Delete("123".into()),
            StreamEvent::Other("notification".into()),
            post_event("mine", "alice", Visibility::Private, 1),
        ]],
    ));
    let ledger = Arc::new(MemoryLedger::default());
    let (shutdown, task) = start(source.clone(), &ledger);

    wait_for(|| ledger.get("mine").is_some()).await;
    assert_eq!(ledger.len(), 1);

    shutdown.cancel();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn repeated_observation_overwrites_entry() {
    let source = Arc::new(ScriptedSource::new(
        0,
        vec![vec![
            post_event("P1", "alice", Visibility::Private, 100),
            post_event("P1", "alice", Visibility::Private, 200),
            post_event("done", "alice", Visibility::Private, 1),
        ]],
    ));
    let ledger = Arc::new(MemoryLedger::default());
    let (shutdown, task) = start(source.clone(), &ledger);

    wait_for(|| ledger.get("done").is_some()).await;
    assert_eq!(ledger.get("P1"), Some(200));
    assert_eq!(ledger.len(), 2);

    shutdown.cancel();
    task.await.unwrap();
}

#[tokio::test]
async fn ledger_write_failure_is_swallowed() {
    let ledger = Arc::new(MemoryLedger::default());
    let consumer = StreamConsumer::new(
        Arc::new(ScriptedSource::new(0, Vec::new())),
        ledger.clone(),
        Arc::new(alice()),
        stream_settings(BACKOFF),
    );
    let event = post_event("P1", "alice", Visibility::Private, 5);

    ledger.fail_upsert.store(true, Ordering::SeqCst);
    assert!(!consumer.handle_event(&event).await);
    assert_eq!(ledger.len(), 0);

    ledger.fail_upsert.store(false, Ordering::SeqCst);
    assert!(consumer.handle_event(&event).await);
    assert_eq!(ledger.get("P1"), Some(5));
}

#[tokio::test(start_paused = true)]
async fn shutdown_interrupts_backoff() {
    let source = Arc::new(ScriptedSource::new(usize::MAX, Vec::new()));
    let ledger = Arc::new(MemoryLedger::default());
    let (shutdown, task) = start(source.clone(), &ledger);

    tokio::time::sleep(Duration::from_secs(25)).await;
    shutdown.cancel();
    task.await.unwrap();

    assert_eq!(source.attempt_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn shutdown_interrupts_open_stream() {
    let source = Arc::new(ScriptedSource::new(0, vec![Vec::new()]));
    let ledger = Arc::new(MemoryLedger::default());
    let (shutdown, task) = start(source.clone(), &ledger);

    tokio::time::sleep(Duration::from_secs(100)).await;
    assert_eq!(source.attempt_count(), 1);

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("consumer should stop")
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn silent_session_is_dropped_after_idle_window() {
    let source = Arc::new(ScriptedSource::new(
        0,
        vec![
            Vec::new(),
            vec![post_event("P4", "alice", Visibility::Private, 4)],
        ],
    ));
    let ledger = Arc::new(MemoryLedger::default());
    let (shutdown, task) = start(source.clone(), &ledger);

    wait_for(|| ledger.get("P4").is_some()).await;
    let attempts = source.attempts();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[1] - attempts[0], IDLE + BACKOFF);

    shutdown.cancel();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn hung_connect_is_abandoned_after_timeout() {
    let source = Arc::new(
        ScriptedSource::new(0, vec![vec![post_event("P5", "alice", Visibility::Private, 5)]])
            .stalling(1),
    );
    let ledger = Arc::new(MemoryLedger::default());
    let (shutdown, task) = start(source.clone(), &ledger);

    wait_for(|| ledger.get("P5").is_some()).await;
    let attempts = source.attempts();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[1] - attempts[0], CONNECT_TIMEOUT + BACKOFF);

    shutdown.cancel();
    task.await.unwrap();
}

/// Serves one session that only ever sends keep-alives.
#[derive(Default)]
struct KeepAliveSource {
    connects: std::sync::atomic::AtomicUsize,
}

#[async_trait]
impl EventSource for KeepAliveSource {
    async fn connect(&self) -> Result<EventStream, MastodonError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let events = async_stream::stream! {
            loop {
                tokio::time::sleep(IDLE / 2).await;
                yield StreamEvent::Heartbeat;
            }
        };
        Ok(events.boxed())
    }
}

#[tokio::test(start_paused = true)]
async fn heartbeats_keep_quiet_session_open() {
    let source = Arc::new(KeepAliveSource::default());
    let ledger = Arc::new(MemoryLedger::default());
    let (shutdown, task) = start(source.clone(), &ledger);

    tokio::time::sleep(IDLE * 10).await;
    assert_eq!(source.connects.load(Ordering::SeqCst), 1);
    assert_eq!(ledger.len(), 0);

    shutdown.cancel();
    task.await.unwrap();
}
