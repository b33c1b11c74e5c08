//! Tasklog - opinionated logging setup with per-task contextual tags.
//!
//! This crate provides:
//! - A side-effect free [`LogConfig`] description built from `DEBUG`,
//!   `LOG_FORMAT` and `ENVIRONMENT`
//! - Plain and JSON formatters for the tracing ecosystem
//! - A [`ContextRegistry`] whose tags are appended to every record emitted
//!   by the task that set them
//!
//! # Example
//!
//! ```rust,no_run
//! use tasklog::{LogConfigBuilder, setup_logging};
//!
//! # fn main() -> Result<(), tasklog::LogError> {
//! let config = LogConfigBuilder::from_env().build();
//! let registry = setup_logging(&config)?;
//!
//! registry.set("request_id", "abc123");
//! tracing::info!("Processing request");
//! // 2024-01-15 10:30:00,123 INFO     my_app Processing request [request_id abc123]
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod config;
mod error;
mod format;
mod logging;
mod registry;

pub use config::{
    DEBUG_VAR, ENVIRONMENT_VAR, FormatterConfig, HandlerConfig, LOG_FORMAT_VAR, LogConfig,
    LogConfigBuilder, LogFormat, LogLevel, LogTarget, collect_env_vars, config, parse_flag,
    select_format,
};
pub use error::{LogError, LogResult};
pub use format::{JsonFormatter, PlainFormatter};
pub use logging::{BoxedLayer, layer, setup_logging, setup_logging_from_env, subscriber};
pub use registry::{ContextRegistry, Tag, TagMap, TagScope, TaskIdentity};
