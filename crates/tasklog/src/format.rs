//! Event formatters that append the emitting task's tags.

use chrono::{Local, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::registry::LookupSpan;

use crate::registry::{ContextRegistry, TagMap};

/// Human-readable formatter.
///
/// Produces `2024-01-15 10:30:00,123 INFO     target message [key value]`.
#[derive(Debug, Clone)]
pub struct PlainFormatter {
    registry: ContextRegistry,
    timestamps: bool,
}

impl PlainFormatter {
    /// Create a formatter reading tags from `registry`.
    #[must_use]
    pub fn new(registry: ContextRegistry) -> Self {
        Self {
            registry,
            timestamps: true,
        }
    }

    /// Omit the leading timestamp.
    #[must_use]
    pub fn without_time(mut self) -> Self {
        self.timestamps = false;
        self
    }
}

impl<S, N> FormatEvent<S, N> for PlainFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();

        if self.timestamps {
            write!(writer, "{} ", Local::now().format("%Y-%m-%d %H:%M:%S,%3f"))?;
        }
        write!(
            writer,
            "{:<8} {} ",
            metadata.level().as_str(),
            metadata.target()
        )?;
        ctx.format_fields(writer.by_ref(), event)?;
        self.registry.render_plain(&mut writer)?;
        writeln!(writer)
    }
}

/// Structured formatter emitting one JSON object per line.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    registry: ContextRegistry,
    timestamps: bool,
}

impl JsonFormatter {
    /// Create a formatter reading tags from `registry`.
    #[must_use]
    pub fn new(registry: ContextRegistry) -> Self {
        Self {
            registry,
            timestamps: true,
        }
    }

    /// Omit the `asctime` field.
    #[must_use]
    pub fn without_time(mut self) -> Self {
        self.timestamps = false;
        self
    }
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    name: &'a str,
    levelname: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    asctime: Option<String>,
    message: String,
    context: Option<TagMap<'a>>,
    module: Option<&'a str>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    fields: Map<String, Value>,
}

/// Collects event fields, keeping `message` apart from the rest.
#[derive(Default)]
struct JsonVisitor {
    message: String,
    fields: Map<String, Value>,
}

impl JsonVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            self.message = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for JsonVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, Value::from(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::from(format!("{value:?}")));
    }
}

impl<S, N> FormatEvent<S, N> for JsonFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);

        let tags = self.registry.tags();
        let record = JsonRecord {
            name: metadata.target(),
            levelname: metadata.level().as_str(),
            asctime: self
                .timestamps
                .then(|| Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f%z").to_string()),
            message: visitor.message,
            context: tags
                .iter()
                .any(|t| t.is_rendered())
                .then_some(TagMap(&tags)),
            module: metadata.module_path(),
            fields: visitor.fields,
        };

        let line = serde_json::to_string(&record).map_err(|_| fmt::Error)?;
        writeln!(writer, "{line}")
    }
}
