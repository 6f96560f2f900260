use tracing_subscriber::EnvFilter;

/// Filter directives for the CLI, e.g. `GREETINGS_LOG=greetings_ffi=debug`.
pub const LOG_ENV: &str = "GREETINGS_LOG";

const DEFAULT_DIRECTIVES: &str = "warn";

/// Installs the stderr subscriber. Safe to call more than once; later calls
/// are no-ops.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}
