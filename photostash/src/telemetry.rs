//! Tracing initialization.
//!
//! Logs go to stdout through the `fmt` layer. Verbosity is controlled with the standard `RUST_LOG`
//! environment variable and defaults to `info`, e.g.:
//!
//! ```bash
//! RUST_LOG=photostash=debug,tower_http=debug photostash
//! ```

use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Install the global tracing subscriber.
///
/// Fails if a subscriber is already installed.
pub fn init_telemetry() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    info!("Telemetry initialized");
    Ok(())
}
