use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Route `tracing` events to stderr, filtered by `RUST_LOG` (default `info`).
/// Stdout stays reserved for command output such as index listings.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| return EnvFilter::new("info"));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .try_init();
}
