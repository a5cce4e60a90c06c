//! JSON subscriber installation.

use tracing_subscriber::EnvFilter;

/// Directive used when neither `RUST_LOG` nor an explicit filter is given.
pub const DEFAULT_FILTER: &str = "info";

/// Install the JSON subscriber, filtered by `RUST_LOG` (default `info`).
///
/// Safe to call multiple times; only the first call installs anything.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    install(filter);
}

/// Install the JSON subscriber with an explicit filter directive.
///
/// `RUST_LOG` still wins when set, so operators can raise verbosity without a
/// config change. An unparsable directive falls back to [`DEFAULT_FILTER`].
pub fn init_with_filter(directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .unwrap_or_else(|err| {
            eprintln!("invalid log filter `{directive}` ({err}), using `{DEFAULT_FILTER}`");
            EnvFilter::new(DEFAULT_FILTER)
        });
    install(filter);
}

fn install(filter: EnvFilter) {
    // Per-execution fields (execution_id, job) come from spans and event fields.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_current_span(true)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
