//! Tracing setup for the `coach` binary.
//!
//! stdout carries only command output. Logs go to `LOG_FILE` when set, to stderr with
//! `--verbose`, and are dropped otherwise.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::log_format::TextWithSpanPath;

const DEFAULT_FILTER: &str = "info,hyper_util=off";
const VERBOSE_FILTER: &str = "debug,coach=trace,hyper_util=off";

/// Filter from `RUST_LOG`, falling back to `info` (or `debug` when verbose).
fn filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            VERBOSE_FILTER
        } else {
            DEFAULT_FILTER
        })
    })
}

/// Installs the global subscriber.
///
/// - **RUST_LOG**: filter directives, e.g. `coach=debug`.
/// - **LOG_FILE**: append plain-text logs to this path.
/// - `verbose`: without `LOG_FILE`, write logs to stderr instead of dropping them.
pub fn init(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let filter = filter(verbose);

    if let Ok(path) = std::env::var("LOG_FILE") {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        let layer = tracing_subscriber::fmt::layer()
            .event_format(TextWithSpanPath::new())
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .with_filter(filter);
        tracing_subscriber::registry().with(layer).try_init()?;
        tracing::debug!(path = %path, "coach logging to file");
    } else if verbose {
        let layer = tracing_subscriber::fmt::layer()
            .event_format(TextWithSpanPath::new())
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_filter(filter);
        tracing_subscriber::registry().with(layer).try_init()?;
    } else {
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::sink)
            .with_filter(filter);
        tracing_subscriber::registry().with(layer).try_init()?;
    }
    Ok(())
}
