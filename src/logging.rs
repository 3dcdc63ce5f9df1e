// Logging setup
//
// The element layer only emits `tracing` events. Embedders that do not
// install their own subscriber can call `init_logging` once at startup.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install a global fmt subscriber filtered by `config.level`.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|e| {
        eprintln!(
            "[element-native] Invalid log filter {:?} ({}), falling back to warn",
            config.level, e
        );
        EnvFilter::new("warn")
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
