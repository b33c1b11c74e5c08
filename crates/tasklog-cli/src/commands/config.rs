//! CLI handler for the `tasklog config` subcommand.

use anyhow::Result;
use tasklog::LogConfig;

/// Print the resolved configuration.
pub(crate) fn show_config(config: &LogConfig) -> Result<()> {
    let output = serde_json::to_string_pretty(config)
        .map_err(|e| anyhow::anyhow!("failed to format config: {e}"))?;

    println!("{output}");
    Ok(())
}
