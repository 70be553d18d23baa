//! Browser console logging

use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Pretty;
use tracing_subscriber::prelude::*;
use tracing_web::{MakeWebConsoleWriter, performance_layer};

/// Send `tracing` output to the browser console
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_logging(level: Level) {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .without_time()
        .with_writer(MakeWebConsoleWriter::new());
    let perf_layer = performance_layer().with_details_from_fields(Pretty::default());

    let installed = tracing_subscriber::registry()
        .with(LevelFilter::from_level(level))
        .with(fmt_layer)
        .with(perf_layer)
        .try_init();

    if installed.is_ok() {
        tracing::debug!(%level, "Browser logging initialized");
    }
}
