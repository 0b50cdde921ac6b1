use crate::error::ConfigError;
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_DIR_NAME: &str = ".private-toot-remover";
const CONFIG_FILE_NAME: &str = "config.toml";
const ENV_PREFIX: &str = "PTR_";

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Path to config.toml - computed at load time, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub mastodon: MastodonConfig,

    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub stream: StreamConfig,

    #[serde(default)]
    pub sweep: SweepConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ── Mastodon account ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MastodonConfig {
    /// Instance base URL (default: `https://mstdn.plusminus.io`)
    #[serde(default = "default_server")]
    pub server: String,
    /// OAuth access token for the watched account
    #[serde(default)]
    pub access_token: String,
    /// Per-request timeout for REST calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_server() -> String {
    "https://mstdn.plusminus.io".into()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for MastodonConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            access_token: String::new(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl MastodonConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// ── Ledger (pending-deletion table) ──────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    #[default]
    Dynamodb,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub backend: LedgerBackend,
    /// Table name (default: `private-toot-remover`)
    #[serde(default = "default_table")]
    pub table: String,
    /// AWS region; falls back to the standard AWS environment chain
    #[serde(default)]
    pub region: Option<String>,
    /// Custom endpoint, e.g. DynamoDB Local or localstack
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Database file for the sqlite backend
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: PathBuf,
}

fn default_table() -> String {
    "private-toot-remover".into()
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("ledger.db")
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::default(),
            table: default_table(),
            region: None,
            endpoint_url: None,
            sqlite_path: default_sqlite_path(),
        }
    }
}

// ── Stream consumer ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Fixed delay between reconnect attempts
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
    /// Give up on a connect attempt after this long
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Treat the stream as dead after this long without any frame
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

fn default_reconnect_delay_secs() -> u64 {
    10
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_idle_timeout_secs() -> u64 {
    120
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_secs: default_reconnect_delay_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

impl StreamConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

// ── Deletion sweep ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Seconds between sweep cycles
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Posts older than this many seconds are deleted
    #[serde(default = "default_older_than_secs")]
    pub older_than_secs: u64,
    /// Also drop the ledger entry after a successful remote delete.
    /// Off by default: entries are only dropped when the remote delete errors.
    #[serde(default)]
    pub forget_on_success: bool,
}

fn default_interval_secs() -> u64 {
    600
}

fn default_older_than_secs() -> u64 {
    3600
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            older_than_secs: default_older_than_secs(),
            forget_on_success: false,
        }
    }
}

// ── Observability ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// "error" | "warn" | "info" | "debug" | "trace"
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// ── Loading / persistence ────────────────────────────────────────

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let home = UserDirs::new()
        .map(|u| u.home_dir().to_path_buf())
        .ok_or_else(|| ConfigError::Load("could not find home directory".into()))?;
    Ok(home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

impl Config {
    /// Load from `path` (or the default location). A missing file yields defaults.
    /// Environment overrides are applied on top.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => default_config_path()?,
        };

        let mut config = if config_path.exists() {
            let contents = fs::read_to_string(&config_path)?;
            toml::from_str::<Config>(&contents).map_err(|e| {
                ConfigError::Load(format!("{}: {e}", config_path.display()))
            })?
        } else {
            Config::default()
        };
        config.config_path = config_path;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides to config
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Each setting accepts `PTR_<NAME>` first, then the bare `<NAME>`.
    /// A value that does not parse is an error, never silently skipped.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .or_else(|| lookup(name))
                .filter(|v| !v.trim().is_empty())
        };
        let get_secs = |name: &str| -> Result<Option<u64>, ConfigError> {
            get(name)
                .map(|v| {
                    v.trim().parse::<u64>().map_err(|e| {
                        ConfigError::Validation(format!("{name}='{v}' is not a number of seconds: {e}"))
                    })
                })
                .transpose()
        };

        if let Some(table) = get("DYNAMODB_TABLE") {
            self.ledger.table = table;
        }
        if let Some(server) = get("MASTODON_SERVER") {
            self.mastodon.server = server;
        }
        if let Some(token) = get("MASTODON_ACCESS_TOKEN") {
            self.mastodon.access_token = token;
        }
        if let Some(secs) = get_secs("WATCH_INTERVAL_SECONDS")? {
            self.sweep.interval_secs = secs;
        }
        if let Some(secs) = get_secs("DELETE_OLDER_TOOT_SECONDS")? {
            self.sweep.older_than_secs = secs;
        }
        if let Some(backend) = get("LEDGER_BACKEND") {
            self.ledger.backend = match backend.trim().to_ascii_lowercase().as_str() {
                "dynamodb" => LedgerBackend::Dynamodb,
                "sqlite" => LedgerBackend::Sqlite,
                other => {
                    return Err(ConfigError::Validation(format!(
                        "LEDGER_BACKEND='{other}' is not one of: dynamodb, sqlite"
                    )));
                }
            };
        }
        if let Some(endpoint) = get("DYNAMODB_ENDPOINT_URL") {
            self.ledger.endpoint_url = Some(endpoint);
        }
        if let Some(level) = get("LOG_LEVEL") {
            self.observability.log_level = level;
        }
        Ok(())
    }

    /// Checks shared by every command.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sweep.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "sweep.interval_secs must be greater than zero".into(),
            ));
        }
        if self.sweep.older_than_secs == 0 {
            return Err(ConfigError::Validation(
                "sweep.older_than_secs must be greater than zero".into(),
            ));
        }
        if i64::try_from(self.sweep.older_than_secs).is_err() {
            return Err(ConfigError::Validation(
                "sweep.older_than_secs is out of range".into(),
            ));
        }
        for (name, secs) in [
            ("mastodon.request_timeout_secs", self.mastodon.request_timeout_secs),
            ("stream.connect_timeout_secs", self.stream.connect_timeout_secs),
            ("stream.idle_timeout_secs", self.stream.idle_timeout_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::Validation(format!(
                    "{name} must be greater than zero"
                )));
            }
        }
        if self.ledger.table.trim().is_empty() {
            return Err(ConfigError::Validation("ledger.table must not be empty".into()));
        }
        let server = url::Url::parse(&self.mastodon.server).map_err(|e| {
            ConfigError::Validation(format!("mastodon.server is not a valid URL: {e}"))
        })?;
        if !matches!(server.scheme(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "mastodon.server must use http or https, got '{}'",
                server.scheme()
            )));
        }
        Ok(())
    }

    /// Checks for commands that talk to the instance.
    pub fn validate_for_daemon(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if self.mastodon.access_token.trim().is_empty() {
            return Err(ConfigError::Validation(
                "mastodon.access_token is required (or set MASTODON_ACCESS_TOKEN)".into(),
            ));
        }
        Ok(())
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let toml_str = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Load(format!("failed to serialize config: {e}")))?;
        fs::write(&self.config_path, toml_str)?;
        Ok(())
    }

    /// Copy safe to print: the access token is masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.mastodon.access_token.is_empty() {
            copy.mastodon.access_token = "***".into();
        }
        copy
    }
}
