//! Logging setup: every emitted line carries the current diagnostic
//! context.
//!
//! The core only exposes `capture()`; rendering happens here. The
//! formatter reads the store at emission time and appends its pairs to the
//! line, so handler and service code never mentions the identifiers in its
//! log calls.

use std::fmt;

use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

use logctx_core::mdc;

/// Event formatter rendering
/// `TIMESTAMP LEVEL target [key=value ...] message fields`.
///
/// The bracketed section is the current context store, read fresh on every
/// emission; it is omitted when the store is empty or no scope is active.
#[derive(Debug, Default)]
pub struct MdcFormat {
    timer: SystemTime,
}

impl MdcFormat {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S, N> FormatEvent<S, N> for MdcFormat
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
        self.timer.format_time(&mut writer)?;
        let meta = event.metadata();
        write!(writer, " {:>5} {}", meta.level(), meta.target())?;

        if let Some(snapshot) = mdc::capture() {
            write!(writer, " [")?;
            let mut first = true;
            for (key, value) in snapshot.iter() {
                if !first {
                    write!(writer, " ")?;
                }
                first = false;
                write!(writer, "{key}={value}")?;
            }
            write!(writer, "]")?;
        }

        write!(writer, " ")?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Installs the global tracing subscriber with the MDC-aware formatter.
///
/// Filter resolution: the explicit `filter` argument, else `RUST_LOG`,
/// else `info`.
///
/// # Errors
///
/// Returns an error when the filter directives are malformed or a global
/// subscriber is already installed.
pub fn init_logging(filter: Option<&str>) -> anyhow::Result<()> {
    let env_filter = match filter {
        Some(directives) => EnvFilter::try_new(directives)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .event_format(MdcFormat::new())
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;
    Ok(())
}
