#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use futures_util::StreamExt;
use futures_util::stream;
use tempfile::TempDir;
use tokio::time::Instant;

use private_toot_remover::error::{LedgerError, MastodonError};
use private_toot_remover::ledger::{Ledger, LedgerEntry, SqliteLedger};
use private_toot_remover::mastodon::{
    Account, EventSource, EventStream, Status, StatusDeleter, StreamEvent, Visibility,
};
use private_toot_remover::watcher::StreamSettings;

// ── Identities / events ──────────────────────────────────────────

pub fn alice() -> Account {
    Account {
        id: "1".into(),
        acct: "alice".into(),
        username: "alice".into(),
    }
}

pub fn post_event(id: &str, acct: &str, visibility: Visibility, created_at: i64) -> StreamEvent {
    StreamEvent::Update(Box::new(Status {
        id: id.into(),
        created_at: Utc.timestamp_opt(created_at, 0).unwrap(),
        visibility,
        account: Account {
            id: "77".into(),
            acct: acct.into(),
            username: String::new(),
        },
    }))
}

pub fn stream_settings(reconnect_delay: Duration) -> StreamSettings {
    StreamSettings {
        reconnect_delay,
        connect_timeout: Duration::from_secs(30),
        idle_timeout: Duration::from_secs(120),
    }
}

// ── Ledgers ──────────────────────────────────────────────────────

pub async fn temp_sqlite_ledger() -> (TempDir, SqliteLedger) {
    let tmp = TempDir::new().expect("tempdir");
    let ledger = SqliteLedger::open(&tmp.path().join("ledger.db"), "private-toot-remover")
        .await
        .expect("sqlite ledger");
    ledger.ensure_schema().await.expect("schema");
    (tmp, ledger)
}

/// In-process ledger with switchable failures.
#[derive(Default)]
pub struct MemoryLedger {
    entries: Mutex<HashMap<String, i64>>,
    pub fail_scan: AtomicBool,
    pub fail_upsert: AtomicBool,
    pub fail_delete: AtomicBool,
    pub scans: AtomicUsize,
}

impl MemoryLedger {
    pub fn with_entries(entries: &[(&str, i64)]) -> Self {
        let ledger = Self::default();
        {
            let mut map = ledger.entries.lock().unwrap();
            for (id, ts) in entries {
                map.insert((*id).to_string(), *ts);
            }
        }
        ledger
    }

    pub fn get(&self, id: &str) -> Option<i64> {
        self.entries.lock().unwrap().get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    fn name(&self) -> &str {
        "memory"
    }

    async fn ensure_schema(&self) -> Result<(), LedgerError> {
        Ok(())
    }

    async fn upsert(&self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(LedgerError::Write {
                id: entry.id.clone(),
                message: "injected".into(),
            });
        }
        self.entries
            .lock()
            .unwrap()
            .insert(entry.id.clone(), entry.created_at);
        Ok(())
    }

    async fn scan_older_than(&self, cutoff: i64) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        if self.fail_scan.load(Ordering::SeqCst) {
            return Err(LedgerError::Scan("injected".into()));
        }
        let map = self.entries.lock().unwrap();
        let mut due: Vec<LedgerEntry> = map
            .iter()
            .filter(|(_, ts)| **ts <= cutoff)
            .map(|(id, ts)| LedgerEntry::new(id.clone(), *ts))
            .collect();
        due.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(due)
    }

    async fn delete_by_key(&self, id: &str) -> Result<(), LedgerError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(LedgerError::Delete {
                id: id.to_string(),
                message: "injected".into(),
            });
        }
        self.entries.lock().unwrap().remove(id);
        Ok(())
    }
}

// ── Remote deletion ──────────────────────────────────────────────

/// Records every delete call; ids listed in `failing` return an error.
#[derive(Default)]
pub struct RecordingDeleter {
    calls: Mutex<Vec<String>>,
    failing: Mutex<Vec<String>>,
    pub fail_all: AtomicBool,
}

impl RecordingDeleter {
    pub fn failing(ids: &[&str]) -> Self {
        let deleter = Self::default();
        *deleter.failing.lock().unwrap() = ids.iter().map(|s| (*s).to_string()).collect();
        deleter
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatusDeleter for RecordingDeleter {
    async fn delete_status(&self, id: &str) -> Result<(), MastodonError> {
        self.calls.lock().unwrap().push(id.to_string());
        let fails = self.fail_all.load(Ordering::SeqCst)
            || self.failing.lock().unwrap().iter().any(|f| f == id);
        if fails {
            return Err(MastodonError::Status {
                operation: format!("delete status {id}"),
                status: 404,
                body: "Record not found".into(),
            });
        }
        Ok(())
    }
}

// ── Event source ─────────────────────────────────────────────────

/// Fails the first `failures` connects, hangs the next `stalls`, then serves
/// queued sessions. Each session is a list of events; once exhausted the
/// stream stays open and silent.
pub struct ScriptedSource {
    failures: usize,
    stalls: usize,
    attempts: Mutex<Vec<Instant>>,
    sessions: Mutex<VecDeque<Vec<StreamEvent>>>,
}

impl ScriptedSource {
    pub fn new(failures: usize, sessions: Vec<Vec<StreamEvent>>) -> Self {
        Self {
            failures,
            stalls: 0,
            attempts: Mutex::new(Vec::new()),
            sessions: Mutex::new(sessions.into()),
        }
    }

    pub fn stalling(mut self, stalls: usize) -> Self {
        self.stalls = stalls;
        self
    }

    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    async fn connect(&self) -> Result<EventStream, MastodonError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            attempts.push(Instant::now());
            attempts.len()
        };
        if attempt <= self.failures {
            return Err(MastodonError::Connect(format!("refused #{attempt}")));
        }
        if attempt <= self.failures + self.stalls {
            std::future::pending::<()>().await;
        }
        let events = self.sessions.lock().unwrap().pop_front().unwrap_or_default();
        Ok(stream::iter(events).chain(stream::pending()).boxed())
    }
}
