use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `private-toot-remover` - deletes your followers-only posts once they age out.
#[derive(Parser, Debug)]
#[command(name = "private-toot-remover")]
#[command(version)]
#[command(about = "Watches a Mastodon account and deletes its private posts after a delay.", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.private-toot-remover/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level override (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Watch the stream and sweep on a timer until interrupted (default)
    Run,

    /// Run a single sweep cycle and exit
    Sweep,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration (access token redacted)
    Config,
}

impl Cli {
    pub fn resolved_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run)
    }
}
