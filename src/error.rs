use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for the reaper.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide recovery strategy; bootstrap code continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum ReaperError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Ledger ──────────────────────────────────────────────────────────
    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),

    // ── Mastodon API / streaming ────────────────────────────────────────
    #[error("mastodon: {0}")]
    Mastodon(#[from] MastodonError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Ledger errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("table {table} could not be prepared: {message}")]
    Schema { table: String, message: String },

    #[error("upsert of post {id} failed: {message}")]
    Write { id: String, message: String },

    #[error("scan failed: {0}")]
    Scan(String),

    #[error("delete of post {id} failed: {message}")]
    Delete { id: String, message: String },

    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("backend not available: {0}")]
    BackendUnavailable(String),
}

// ─── Mastodon errors ────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum MastodonError {
    #[error("{operation} request failed: {message}")]
    Request { operation: String, message: String },

    #[error("{operation} returned {status}: {body}")]
    Status {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode {operation} response: {message}")]
    Decode { operation: String, message: String },

    #[error("stream connection failed: {0}")]
    Connect(String),

    #[error("invalid endpoint: {0}")]
    Endpoint(String),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, ReaperError>;
