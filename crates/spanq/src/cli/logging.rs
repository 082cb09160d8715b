//! Diagnostic logging for the CLI.

use std::io;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding a log filter, e.g. `spanq_search=debug`.
pub const LOG_ENV: &str = "SPANQ_LOG";

/// Installs a stderr subscriber.
///
/// `SPANQ_LOG` wins when set; otherwise `-v` selects debug and `-vv` trace, and
/// without either only warnings are shown.
pub fn init(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    // A subscriber already installed is left in place.
    let _installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .try_init();
}
