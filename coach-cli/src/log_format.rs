//! Plain-text event format that names the enclosing spans.
//!
//! Lines look like `TIMESTAMP LEVEL [command{name=email} > attempt] target: fields`, which
//! keeps the attempts of one CLI invocation readable in a shared log file.

use std::fmt;

use tracing_core::Subscriber;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};
use tracing_subscriber::fmt::{FmtContext, FormattedFields};
use tracing_subscriber::registry::LookupSpan;

pub struct TextWithSpanPath {
    timer: SystemTime,
    with_target: bool,
    with_span_fields: bool,
}

impl Default for TextWithSpanPath {
    fn default() -> Self {
        Self {
            timer: SystemTime,
            with_target: true,
            with_span_fields: true,
        }
    }
}

impl TextWithSpanPath {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn with_target(mut self, on: bool) -> Self {
        self.with_target = on;
        self
    }

    #[cfg(test)]
    fn with_span_fields(mut self, on: bool) -> Self {
        self.with_span_fields = on;
        self
    }
}

impl<S, N> FormatEvent<S, N> for TextWithSpanPath
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing_core::Event<'_>,
    ) -> fmt::Result {
        self.timer.format_time(&mut writer)?;
        write!(writer, " {:>5}", event.metadata().level())?;

        if let Some(scope) = ctx.event_scope() {
            write!(writer, " [")?;
            for (i, span) in scope.from_root().enumerate() {
                if i > 0 {
                    write!(writer, " > ")?;
                }
                write!(writer, "{}", span.name())?;
                if self.with_span_fields {
                    let ext = span.extensions();
                    if let Some(fields) = ext.get::<FormattedFields<N>>() {
                        if !fields.is_empty() {
                            write!(writer, "{{{}}}", fields)?;
                        }
                    }
                }
            }
            write!(writer, "]")?;
        }

        if self.with_target {
            write!(writer, " {}:", event.metadata().target())?;
        }
        write!(writer, " ")?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
