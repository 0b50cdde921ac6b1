pub mod schema;

pub use schema::{
    Config, LedgerBackend, LedgerConfig, MastodonConfig, ObservabilityConfig, StreamConfig,
    SweepConfig, default_config_path,
};
