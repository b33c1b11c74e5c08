//! Tasklog CLI - inspect the logging configuration the environment resolves
//! to and watch per-task tags in action.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use anyhow::Result;
use clap::{Parser, Subcommand};
use tasklog::{DEBUG_VAR, ENVIRONMENT_VAR, LOG_FORMAT_VAR, LogConfig, LogConfigBuilder, LogLevel};

mod commands;

use commands::{config, demo};

/// Tasklog - logging setup with per-task context tags
#[derive(Parser)]
#[command(name = "tasklog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Debug flag token: 1/y/yes/true enable, anything else disables
    #[arg(long, global = true, env = DEBUG_VAR)]
    debug: Option<String>,

    /// Output format selector: json or plain
    #[arg(long, global = true, env = LOG_FORMAT_VAR)]
    log_format: Option<String>,

    /// Deployment tier; testing, staging and production force json
    #[arg(long, global = true, env = ENVIRONMENT_VAR)]
    environment: Option<String>,

    /// Force a level, ignoring the debug flag
    #[arg(long, global = true)]
    level: Option<LogLevel>,

    /// Omit timestamps from records
    #[arg(long, global = true)]
    no_timestamps: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved logging configuration as JSON
    Config,

    /// Run interleaved tasks that each tag and log
    Demo {
        /// Number of concurrent tasks
        #[arg(short, long, default_value_t = 2)]
        tasks: usize,
    },
}

impl Cli {
    fn log_config(&self) -> LogConfig {
        let mut builder = LogConfigBuilder::new();
        if let Some(debug) = &self.debug {
            builder = builder.debug_token(debug);
        }
        if let Some(format) = &self.log_format {
            builder = builder.format(format.as_str());
        }
        if let Some(environment) = &self.environment {
            builder = builder.environment(environment.as_str());
        }
        if let Some(level) = self.level {
            builder = builder.level(level);
        }
        if self.no_timestamps {
            builder = builder.without_timestamps();
        }
        builder.build()
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_config = cli.log_config();

    match cli.command {
        Commands::Config => config::show_config(&log_config)?,
        Commands::Demo { tasks } => demo::run_demo(&log_config, tasks).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tasklog::LogFormat;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_resolve_config() {
        let cli = Cli::try_parse_from([
            "tasklog",
            "--debug",
            "YES",
            "--log-format",
            "plain",
            "--environment",
            "Production",
            "--no-timestamps",
            "config",
        ])
        .unwrap();

        let config = cli.log_config();
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format(), LogFormat::Json);
        assert!(!config.timestamps);
    }

    #[test]
    fn test_level_override() {
        let cli = Cli::try_parse_from([
            "tasklog", "--debug", "1", "--level", "warn", "--log-format", "json", "demo", "-t", "4",
        ])
        .unwrap();

        let config = cli.log_config();
        assert_eq!(config.level, LogLevel::Warn);
        assert!(config.is_json());
        assert!(matches!(cli.command, Commands::Demo { tasks: 4 }));
    }

    #[test]
    fn test_unknown_level_rejected() {
        assert!(Cli::try_parse_from(["tasklog", "--level", "loud", "config"]).is_err());
    }
}
