//! Run logging for judgeloop.
//!
//! Two channels: [`Logger`] renders the run's [`LogEvent`]s (attempts, verdicts,
//! streamed agent lines) for the person watching the run, and [`init_tracing`]
//! routes internal diagnostics to stderr, filtered by `RUST_LOG` or the
//! configured level. Both honour the chosen [`LogFormat`], so stdout stays
//! free for the JSON report.

mod events;

pub use events::{AgentRole, LogEvent, LogFormat, Logger, StreamType};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber; call once at startup
pub fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_target(false).with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty | LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
                .init();
        }
    }
}
