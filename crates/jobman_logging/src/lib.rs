//! Shared logging setup for Jobman binaries.
//!
//! Mirrors the teacher's `casparian_logging::init_logging` shape (a
//! `tracing_subscriber::registry()` with an `EnvFilter` layer), trimmed down
//! to stderr-only output: jobman keeps no state on local disk (section 6),
//! so there is no rolling log file to manage.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "jobman=info,jobman_handler=info,jobman_dispatcher=info";

/// Initialize the global tracing subscriber.
///
/// `log_level` is the value of the `LOG_LEVEL` configuration variable; if it
/// parses as an `EnvFilter` directive it's used directly, otherwise the
/// default filter above is used.
pub fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(true).with_filter(filter))
        .init();
}
