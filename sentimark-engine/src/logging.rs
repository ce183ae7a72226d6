//! Log output for the command line tools.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Install a stderr `tracing` subscriber.
///
/// `RUST_LOG` wins over `default_filter`; an unparsable default falls back to
/// `info`. Only the first call has any effect. If the host process already
/// installed a global subscriber, that one is kept and this call only notes
/// it at debug level, so embedding the engine never panics over logging.
pub fn init(default_filter: &str) {
    INIT_LOGGING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_filter))
            .unwrap_or_else(|_| EnvFilter::new("info"));
        let installed = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
        if let Err(err) = installed {
            tracing::debug!("keeping existing subscriber: {err}");
        }
    });
}
