use crate::config::Config;
use crate::sweeper::SweepReport;
use anyhow::{Context, Result};

pub fn render_report(report: &SweepReport) -> String {
    [
        "◆ Sweep finished".to_string(),
        format!("  cutoff          {}", report.cutoff),
        format!("  due             {}", report.scanned),
        format!("  deleted         {}", report.deleted_remote),
        format!("  delete failed   {}", report.delete_failed),
        format!("  forgotten       {}", report.forgotten),
        format!("  forget failed   {}", report.forget_failed),
    ]
    .join("\n")
}

/// Effective config as TOML, access token masked.
pub fn render_config(config: &Config) -> Result<String> {
    let body = toml::to_string_pretty(&config.redacted()).context("serialize config")?;
    Ok(format!("# {}\n{body}", config.config_path.display()))
}
