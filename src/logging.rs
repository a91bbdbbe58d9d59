// stderr logging for binaries and tests embedding the engine
use tracing_subscriber::EnvFilter;

/// Installs a global fmt subscriber writing to stderr. `RUST_LOG` wins over
/// `default_directive` (e.g. `"info"` or `"tracelink_core=debug"`).
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_logging(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
