use crate::ledger::LedgerEntry;
use crate::mastodon::{Account, Status, StreamEvent, Visibility};

/// A status qualifies when the watched account wrote it as followers-only.
pub fn qualifies(status: &Status, identity: &Account) -> bool {
    status.account.acct == identity.acct && status.visibility == Visibility::Private
}

pub fn classify(event: &StreamEvent, identity: &Account) -> bool {
    match event {
        StreamEvent::Update(status) => qualifies(status, identity),
        _ => false,
    }
}

/// The ledger entry a qualifying event schedules, if any.
pub fn pending_entry(event: &StreamEvent, identity: &Account) -> Option<LedgerEntry> {
    match event {
        StreamEvent::Update(status) if qualifies(status, identity) => Some(LedgerEntry::new(
            status.id.clone(),
            status.created_at.timestamp(),
        )),
        _ => None,
    }
}
