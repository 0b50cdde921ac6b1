use crate::cli::{Cli, Commands};
use crate::config::Config;
use anyhow::{Result, bail};

use crate::app::status::{render_config, render_report};

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.resolved_command() {
        Commands::Run => crate::daemon::run(config).await,
        Commands::Sweep => {
            let report = crate::daemon::sweep_once(&config).await?;
            println!("{}", render_report(&report));
            Ok(())
        }
        Commands::Init { force } => init_config(&config, force),
        Commands::Config => {
            println!("{}", render_config(&config)?);
            Ok(())
        }
    }
}

/// Writes defaults only; values picked up from the environment are not persisted.
fn init_config(loaded: &Config, force: bool) -> Result<()> {
    let path = &loaded.config_path;
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    let config = Config {
        config_path: path.clone(),
        ..Config::default()
    };
    config.save()?;
    println!("Wrote {}", path.display());
    Ok(())
}
