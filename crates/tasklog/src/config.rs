//! Logging configuration description and the policy that builds it.
//!
//! Building a [`LogConfig`] is side-effect free: it only describes the
//! handler, formatter and level. Installing it is left to
//! [`setup_logging`](crate::setup_logging).
//!
//! Environment input is lenient. Unknown `DEBUG` tokens disable debug
//! logging and unknown `LOG_FORMAT` values fall through to the
//! environment-tier policy instead of failing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::level_filters::LevelFilter;

use crate::error::LogError;

/// Environment variable toggling debug verbosity.
pub const DEBUG_VAR: &str = "DEBUG";
/// Environment variable selecting the output format.
pub const LOG_FORMAT_VAR: &str = "LOG_FORMAT";
/// Environment variable naming the deployment tier.
pub const ENVIRONMENT_VAR: &str = "ENVIRONMENT";

/// Tiers that force structured output regardless of `LOG_FORMAT`.
const JSON_ENVIRONMENTS: &[&str] = &["testing", "staging", "production"];

const TRUTHY: &[&str] = &["1", "y", "yes", "true"];

/// Log record format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable line with bracketed tags appended.
    #[default]
    Plain,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Name of the formatter entry this format is registered under.
    #[must_use]
    pub fn formatter_id(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Json => "jsonlines",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => f.write_str("plain"),
            Self::Json => f.write_str("json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" => Ok(Self::Plain),
            "json" => Ok(Self::Json),
            other => Err(LogError::Config(format!(
                "log format may be either \"json\" or \"plain\", got \"{other}\""
            ))),
        }
    }
}

/// Root logger level.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Everything.
    Trace,
    /// Debug and above.
    Debug,
    /// Info and above.
    #[default]
    Info,
    /// Warnings and errors.
    Warn,
    /// Errors only.
    Error,
}

impl LogLevel {
    /// The filter directive string for this level.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(LogError::Config(format!("unknown log level \"{other}\""))),
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

/// Output stream of the console handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Log to stdout.
    #[default]
    Stdout,
    /// Log to stderr.
    Stderr,
}

/// The single formatter of a [`LogConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatterConfig {
    /// Formatter name, referenced by the handler.
    pub id: String,
    /// Record format produced by this formatter.
    pub format: LogFormat,
}

impl FormatterConfig {
    fn for_format(format: LogFormat) -> Self {
        Self {
            id: format.formatter_id().to_string(),
            format,
        }
    }
}

/// The single handler of a [`LogConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Handler name.
    pub id: String,
    /// Stream the handler writes to.
    pub target: LogTarget,
    /// Id of the formatter this handler uses.
    pub formatter: String,
}

/// Declarative logging configuration: one handler, one formatter, one level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Root level filter.
    #[serde(default)]
    pub level: LogLevel,
    /// Record formatter.
    pub formatter: FormatterConfig,
    /// Console handler.
    pub handler: HandlerConfig,
    /// Extra filter directives (e.g., `hyper=warn`).
    #[serde(default)]
    pub directives: Vec<String>,
    /// Whether records carry a timestamp.
    #[serde(default = "default_true")]
    pub timestamps: bool,
}

fn default_true() -> bool {
    true
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig::new(LogLevel::default(), LogFormat::default())
    }
}

impl LogConfig {
    /// Describe a stdout handler with the given level and format.
    #[must_use]
    pub fn new(level: LogLevel, format: LogFormat) -> Self {
        let formatter = FormatterConfig::for_format(format);
        let handler = HandlerConfig {
            id: "console".to_string(),
            target: LogTarget::Stdout,
            formatter: formatter.id.clone(),
        };
        Self {
            level,
            formatter,
            handler,
            directives: Vec::new(),
            timestamps: true,
        }
    }

    /// The record format in use.
    #[must_use]
    pub fn format(&self) -> LogFormat {
        self.formatter.format
    }

    /// Whether this configuration emits structured records.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.formatter.format == LogFormat::Json
    }
}

/// Resolve a debug flag token.
///
/// `1`, `y`, `yes` and `true` (any case, surrounding whitespace ignored)
/// enable debug. Everything else, including an absent value, disables it.
#[must_use]
pub fn parse_flag(value: Option<&str>) -> bool {
    value.is_some_and(|v| {
        let v = v.trim();
        TRUTHY.iter().any(|t| v.eq_ignore_ascii_case(t))
    })
}

/// Pick the record format from the format selector and environment tier.
///
/// An explicit `json` always wins. Otherwise a `testing`, `staging` or
/// `production` tier forces JSON, even over an explicit `plain`.
#[must_use]
pub fn select_format(format: Option<&str>, environment: Option<&str>) -> LogFormat {
    if format.is_some_and(|f| f.trim().eq_ignore_ascii_case("json")) {
        return LogFormat::Json;
    }

    let tier = environment.map(|e| e.trim().to_ascii_lowercase());
    if tier.is_some_and(|t| JSON_ENVIRONMENTS.contains(&t.as_str())) {
        LogFormat::Json
    } else {
        LogFormat::Plain
    }
}

/// Build the configuration from the three environment-derived inputs.
#[must_use]
pub fn config(debug: bool, format: Option<&str>, environment: Option<&str>) -> LogConfig {
    let level = if debug { LogLevel::Debug } else { LogLevel::Info };
    LogConfig::new(level, select_format(format, environment))
}

/// Collect the current process environment into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

/// Builder layering explicit overrides on top of environment inputs.
#[derive(Debug, Clone, Default)]
pub struct LogConfigBuilder {
    debug: bool,
    format: Option<String>,
    environment: Option<String>,
    level: Option<LogLevel>,
    json: Option<bool>,
    target: LogTarget,
    directives: Vec<String>,
    without_timestamps: bool,
}

impl LogConfigBuilder {
    /// Start with no inputs: info level, plain output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `DEBUG`, `LOG_FORMAT` and `ENVIRONMENT` from the given map.
    ///
    /// Empty values are treated as unset.
    #[must_use]
    pub fn from_env_vars<S: ::std::hash::BuildHasher>(env: &HashMap<String, String, S>) -> Self {
        let non_empty = |name: &str| {
            env.get(name)
                .filter(|v| !v.trim().is_empty())
                .map(ToString::to_string)
        };

        Self {
            debug: parse_flag(env.get(DEBUG_VAR).map(String::as_str)),
            format: non_empty(LOG_FORMAT_VAR),
            environment: non_empty(ENVIRONMENT_VAR),
            ..Self::default()
        }
    }

    /// Read inputs from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_vars(&collect_env_vars())
    }

    /// Set the debug flag.
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set the debug flag from a `DEBUG`-style token.
    #[must_use]
    pub fn debug_token(self, token: &str) -> Self {
        self.debug(parse_flag(Some(token)))
    }

    /// Set the format selector.
    #[must_use]
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Set the environment tier.
    #[must_use]
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Force a level, ignoring the debug flag.
    #[must_use]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// Force structured (`true`) or plain (`false`) output, ignoring the
    /// format selector and environment tier.
    #[must_use]
    pub fn json(mut self, json: bool) -> Self {
        self.json = Some(json);
        self
    }

    /// Set the handler stream.
    #[must_use]
    pub fn target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }

    /// Add a filter directive.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Disable timestamps.
    #[must_use]
    pub fn without_timestamps(mut self) -> Self {
        self.without_timestamps = true;
        self
    }

    /// Produce the configuration description.
    #[must_use]
    pub fn build(&self) -> LogConfig {
        let mut config = config(
            self.debug,
            self.format.as_deref(),
            self.environment.as_deref(),
        );

        if let Some(level) = self.level {
            config.level = level;
        }
        if let Some(json) = self.json {
            let format = if json { LogFormat::Json } else { LogFormat::Plain };
            config.formatter = FormatterConfig::for_format(format);
            config.handler.formatter.clone_from(&config.formatter.id);
        }

        config.handler.target = self.target;
        config.directives.clone_from(&self.directives);
        config.timestamps = !self.without_timestamps;
        config
    }
}
