//! Tracing setup shared by the steering nodes.

use tracing::subscriber::DefaultGuard;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set. socketioxide and engineioxide
/// trace every simulator packet at debug level, roughly 20 per second each
/// way, which would bury the per-sample steering lines.
const DEFAULT_FILTER: &str = "info,socketioxide=warn,engineioxide=warn";

/// Logging for the steering nodes.
///
/// Output is one compact line per event without target or file, since the
/// steering loop logs a line per telemetry sample once tuning is off. The
/// subscriber is installed thread-locally because the dora runtime owns the
/// global one; keep the returned guard alive for the life of the node.
///
/// ```no_run
/// let _guard = cte_steer_lib::init_tracing();
/// tracing::info!("steering node up");
/// ```
pub fn init_tracing() -> DefaultGuard {
    use tracing_subscriber::layer::SubscriberExt;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(false)
        .with_file(false)
        .with_line_number(false);

    let subscriber = tracing_subscriber::Registry::default()
        .with(env_filter)
        .with(fmt_layer);

    tracing::subscriber::set_default(subscriber)
}
