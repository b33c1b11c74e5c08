//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tasklog::prelude::*;` to import all essential types.
//!
//! # Example
//!
//! ```rust,no_run
//! use tasklog::prelude::*;
//!
//! # fn main() -> LogResult<()> {
//! let config = LogConfigBuilder::new().debug(true).format("json").build();
//! let registry = setup_logging(&config)?;
//!
//! let _scope = registry.scope();
//! registry.set("func", "handler");
//! tracing::debug!("Handling");
//! # Ok(())
//! # }
//! ```

// Errors
pub use crate::{LogError, LogResult};

// Logging configuration
pub use crate::{LogConfig, LogConfigBuilder, LogFormat, LogLevel, LogTarget};

// Setup functions
pub use crate::{setup_logging, setup_logging_from_env};

// Task context
pub use crate::{ContextRegistry, TagScope};
