//! Log output for the localizer binaries.
//!
//! Library code only emits through the `log` facade. A binary picks one
//! backend at startup: [`init_with_level`] for plain stderr lines, or
//! `init_tracing` behind the `tracing` feature, which also captures `log`
//! records and the detector's spans.

use std::io::Write;
use std::str::FromStr;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

/// Log level name that is none of `off`, `error`, `warn`, `info`, `debug`,
/// `trace`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown log level {0:?}, expected off, error, warn, info, debug or trace")]
pub struct UnknownLevel(pub String);

/// Parse a level name, case-insensitively.
pub fn parse_level(name: &str) -> Result<LevelFilter, UnknownLevel> {
    LevelFilter::from_str(name.trim()).map_err(|_| UnknownLevel(name.to_string()))
}

/// One line per record: `LEVEL target: message`. Filtering is left to
/// `log::max_level`.
struct StderrLines;

static STDERR_LINES: StderrLines = StderrLines;

impl Log for StderrLines {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let _ = writeln!(
                std::io::stderr().lock(),
                "{:<5} {}: {}",
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Install the stderr logger at `level`. Fails if a logger is already set.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    log::set_logger(&STDERR_LINES)?;
    log::set_max_level(level);
    Ok(())
}

/// `EnvFilter` directive used when `RUST_LOG` is unset or invalid.
#[cfg(feature = "tracing")]
fn fallback_directive(level: LevelFilter) -> String {
    level.to_string().to_ascii_lowercase()
}

/// Install a `tracing-subscriber` fmt subscriber.
///
/// `RUST_LOG` wins when it parses; otherwise everything at `level` and above
/// is shown. `log` records are forwarded to the subscriber. Span close events
/// carry the time spent in detection and pose solving.
#[cfg(feature = "tracing")]
pub fn init_tracing(level: LevelFilter, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(fallback_directive(level)));
    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE);
    let installed = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder.compact().finish().try_init()
    };
    if let Err(err) = installed {
        log::debug!("tracing subscriber not installed: {err}");
    }
}
