#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

pub mod app;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod error;
pub mod ledger;
pub mod mastodon;
pub mod sweeper;
pub mod watcher;

pub use config::Config;
pub use error::{ReaperError, Result};
