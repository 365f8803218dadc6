//! Tracing subscriber setup.
//!
//! Library code only emits `tracing` events; embedders that want them on
//! stderr call [`init`] once at startup. The filter is read from
//! `JUMPMARK_LOG` (same syntax as `RUST_LOG`), defaulting to
//! `jumpmark=info`.

use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "JUMPMARK_LOG";

const DEFAULT_FILTER: &str = "jumpmark=info";

/// Build the filter from [`LOG_ENV`], falling back to the default.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a stderr subscriber. Returns `false` if one was already set.
pub fn init() -> bool {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .try_init()
        .is_ok()
}
