//! Tracing setup: console output plus an append-only log file.
//!
//! File lines are pipe-delimited, `timestamp | LEVEL | message fields`,
//! and a new run never truncates earlier entries.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::{DefaultFields, FormatFields, Writer};
use tracing_subscriber::fmt::{self, FmtContext, FormatEvent};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Log file used when `DISPATCH_LOG_FILE` is not set.
pub const DEFAULT_LOG_FILE: &str = "smtp_mail.log";

/// Filter used when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "dispatch_runner=debug,dispatch_mail=debug,dispatch_core=debug";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Resolve the log file path from `DISPATCH_LOG_FILE`.
pub fn log_path_from_env() -> PathBuf {
    std::env::var("DISPATCH_LOG_FILE")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE))
}

/// Formats events as `timestamp | LEVEL | message fields`.
pub struct PipeFormatter;

impl<S, N> FormatEvent<S, N> for PipeFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        write!(
            writer,
            "{} | {} | ",
            Local::now().format(TIMESTAMP_FORMAT),
            event.metadata().level()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Layer that appends pipe-formatted lines to `file`.
pub fn file_layer<S>(file: File) -> fmt::Layer<S, DefaultFields, PipeFormatter, Arc<File>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_ansi(false)
        .with_writer(Arc::new(file))
        .event_format(PipeFormatter)
}

/// Open `log_path` for appending and install the global subscriber.
pub fn init(log_path: &Path) -> std::io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(log_path)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_FILTER.into()),
        )
        .with(fmt::layer())
        .with(file_layer(file))
        .init();

    Ok(())
}
