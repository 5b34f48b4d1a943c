//! Diagnostics setup for the binary.
//!
//! Console diagnostics always go to stderr so stdout stays free for reports. An
//! optional trace file gets the same events without ANSI colors through a
//! non-blocking writer. The transaction log is separate and written by the library.

use anyhow::Result;
use archive_rename::LogLevel;
use archive_rename::config::path_has_symlink_ancestor;
use archive_rename::output as out;
use archive_rename::platform::open_private_append;
use chrono::Local;
use std::fmt;
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// `14/10/26 09:41:07` in local time.
struct ShortLocalTime;

impl FormatTime for ShortLocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", Local::now().format("%d/%m/%y %H:%M:%S"))
    }
}

/// `quiet` shows errors; each further level reveals one more tracing level.
fn level_filter(lvl: LogLevel) -> LevelFilter {
    match lvl {
        LogLevel::Quiet => LevelFilter::ERROR,
        LogLevel::Normal => LevelFilter::INFO,
        LogLevel::Info => LevelFilter::DEBUG,
        LogLevel::Debug => LevelFilter::TRACE,
    }
}

fn event_layer<W>(writer: W, json: bool, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_timer(ShortLocalTime)
        .with_target(true)
        .with_ansi(ansi)
        .with_writer(writer);
    if json {
        layer.json().boxed()
    } else {
        layer.compact().boxed()
    }
}

/// Non-blocking appender for `path`, or the reason it cannot be used.
fn trace_writer(path: &Path) -> Result<(NonBlocking, WorkerGuard), String> {
    match path_has_symlink_ancestor(path) {
        Ok(false) => {}
        Ok(true) => return Err("an ancestor directory is a symlink".into()),
        Err(e) => return Err(format!("cannot inspect its ancestors: {e}")),
    }
    let file = open_private_append(path).map_err(|e| e.to_string())?;
    Ok(tracing_appender::non_blocking(file))
}

/// Install the global subscriber. The returned guard belongs to the trace file
/// writer and must live until shutdown, or its buffered lines are lost.
pub fn init_tracing(
    lvl: LogLevel,
    trace_file: Option<&Path>,
    json: bool,
) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::builder()
        .with_default_directive(level_filter(lvl).into())
        .parse_lossy("");

    let mut layers: Vec<BoxedLayer> = vec![event_layer(
        std::io::stderr,
        json,
        atty::is(atty::Stream::Stderr),
    )];

    let mut guard = None;
    if let Some(path) = trace_file {
        match trace_writer(path) {
            Ok((writer, g)) => {
                layers.push(event_layer(writer, json, false));
                guard = Some(g);
            }
            Err(reason) => out::print_warn(&format!(
                "Trace file '{}' not enabled: {reason}. Diagnostics continue on stderr.",
                path.display()
            )),
        }
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()?;
    Ok(guard)
}
