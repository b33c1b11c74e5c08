//! Subscriber setup from a [`LogConfig`].

use tracing::Subscriber;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

use crate::config::{LogConfig, LogConfigBuilder, LogFormat, LogTarget};
use crate::error::{LogError, LogResult};
use crate::format::{JsonFormatter, PlainFormatter};
use crate::registry::ContextRegistry;

/// Helper to convert init errors to our error type.
fn init_err<E: std::fmt::Display>(e: E) -> LogError {
    LogError::Init(e.to_string())
}

/// A type-erased layer for the subscriber `S`.
pub type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

impl LogConfig {
    /// Build the env filter from the level and directives.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Config`] if a directive cannot be parsed.
    pub fn build_filter(&self) -> LogResult<EnvFilter> {
        let mut filter = EnvFilter::try_new(self.level.as_str())
            .map_err(|e| LogError::Config(e.to_string()))?;

        for directive in &self.directives {
            filter = filter.add_directive(directive.parse().map_err(
                |e: tracing_subscriber::filter::ParseError| LogError::Config(e.to_string()),
            )?);
        }

        Ok(filter)
    }
}

/// Build the formatting layer described by `config`, writing to `writer`
/// and reading tags from `registry`.
#[must_use]
pub fn layer<S, W>(config: &LogConfig, registry: &ContextRegistry, writer: W) -> BoxedLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let base = fmt::layer().with_writer(writer).with_ansi(false);

    match (config.format(), config.timestamps) {
        (LogFormat::Plain, true) => base
            .event_format(PlainFormatter::new(registry.clone()))
            .boxed(),
        (LogFormat::Plain, false) => base
            .event_format(PlainFormatter::new(registry.clone()).without_time())
            .boxed(),
        (LogFormat::Json, true) => base
            .event_format(JsonFormatter::new(registry.clone()))
            .boxed(),
        (LogFormat::Json, false) => base
            .event_format(JsonFormatter::new(registry.clone()).without_time())
            .boxed(),
    }
}

/// Build a complete subscriber: filter plus formatting layer.
///
/// Useful with [`tracing::subscriber::with_default`] in tests or when the
/// caller wants to scope logging instead of installing it globally.
///
/// # Errors
///
/// Returns [`LogError::Config`] if the filter directives are invalid.
pub fn subscriber<W>(
    config: &LogConfig,
    registry: &ContextRegistry,
    writer: W,
) -> LogResult<impl Subscriber + Send + Sync + 'static + use<W>>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let filter = config.build_filter()?;
    Ok(tracing_subscriber::registry()
        .with(filter)
        .with(layer(config, registry, writer)))
}

/// Install the described configuration as the global default subscriber.
///
/// Returns the registry the installed formatter reads tags from; tags set
/// through it (or any clone) show up on records emitted by the same task.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or a global subscriber
/// is already installed.
pub fn setup_logging(config: &LogConfig) -> LogResult<ContextRegistry> {
    let registry = ContextRegistry::new();

    match config.handler.target {
        LogTarget::Stdout => subscriber(config, &registry, std::io::stdout)?
            .try_init()
            .map_err(init_err)?,
        LogTarget::Stderr => subscriber(config, &registry, std::io::stderr)?
            .try_init()
            .map_err(init_err)?,
    }

    tracing::debug!(
        level = %config.level,
        format = %config.format(),
        "logging initialized"
    );
    Ok(registry)
}

/// Set up logging from `DEBUG`, `LOG_FORMAT` and `ENVIRONMENT`.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn setup_logging_from_env() -> LogResult<ContextRegistry> {
    setup_logging(&LogConfigBuilder::from_env().build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LogLevel, config};

    #[test]
    fn test_build_filter() {
        let config = LogConfigBuilder::new()
            .debug(true)
            .with_directive("tasklog=trace")
            .build();

        let filter = config.build_filter();
        assert!(filter.is_ok());
    }

    #[test]
    fn test_build_filter_invalid() {
        // EnvFilter is permissive with unknown targets, so we test invalid syntax
        let config = LogConfigBuilder::new()
            .with_directive("[invalid=syntax")
            .build();

        let filter = config.build_filter();
        assert!(matches!(filter, Err(LogError::Config(_))));
    }

    #[test]
    fn test_subscriber_rejects_bad_directive() {
        let mut config = config(false, None, None);
        config.directives.push("[invalid=syntax".to_string());
        assert!(subscriber(&config, &ContextRegistry::new(), std::io::sink).is_err());
    }

    #[test]
    fn test_level_filter_applied() {
        let config = LogConfigBuilder::new()
            .level(LogLevel::Warn)
            .without_timestamps()
            .build();
        let sub = subscriber(&config, &ContextRegistry::new(), std::io::sink).unwrap();

        tracing::subscriber::with_default(sub, || {
            assert!(!tracing::enabled!(tracing::Level::INFO));
            assert!(tracing::enabled!(tracing::Level::WARN));
        });
    }
}
