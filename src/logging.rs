use anyhow::{Context, Result};
use colored::*;
use std::fmt;
use std::path::Path;
use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// A tracing event formatter that colors the whole line by level.
///
/// Meant for the operator's terminal: no timestamps, targets or level tags,
/// just the message in the color of its severity.
pub struct ColorizedFormatter;

impl<S, N> FormatEvent<S, N> for ColorizedFormatter
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
        // format_fields writes straight through, so buffer to color the full line.
        let mut buffer = String::new();
        let mut buf_writer = Writer::new(&mut buffer);
        ctx.format_fields(buf_writer.by_ref(), event)?;

        writeln!(writer, "{}", colorize(*event.metadata().level(), &buffer))
    }
}

fn colorize(level: Level, line: &str) -> ColoredString {
    match level {
        Level::INFO => line.white(),
        Level::WARN => line.yellow(),
        Level::ERROR => line.red(),
        Level::DEBUG => line.blue(),
        Level::TRACE => line.purple(),
    }
}

/// Default filter directive when `RUST_LOG` is not set
fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Install the global subscriber
///
/// Console output goes to stderr through [`ColorizedFormatter`]. With
/// `log_file`, a second plain-text layer with timestamps is written through
/// a non-blocking appender; the returned guard must be held until exit so
/// buffered lines are flushed.
pub fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
    };

    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .event_format(ColorizedFormatter)
        .with_filter(filter());

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
