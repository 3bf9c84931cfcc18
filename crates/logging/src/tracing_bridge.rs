//! Subscriber installation for binaries.
//!
//! ```rust,ignore
//! use logging::{VerbosityConfig, init_tracing};
//!
//! init_tracing(VerbosityConfig::from_verbose_level(2));
//! tracing::info!(target: "lsync::copy", "copying file");
//! ```

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::VerbosityConfig;

/// Environment variable that replaces the directives derived from the `-v` count.
pub const LOG_ENV_VAR: &str = "LSYNC_LOG";

/// Installs a fmt subscriber writing to stderr.
///
/// Directives come from [`LOG_ENV_VAR`] when it is set and parses, otherwise
/// from [`VerbosityConfig::directives`]. Returns `false` when a global
/// subscriber was already installed, which makes repeated calls harmless.
pub fn init_tracing(config: VerbosityConfig) -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(config.directives()));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .try_init()
        .is_ok()
}
