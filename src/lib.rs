pub mod config;
pub mod intelligence; // Extraction, staging, interaction resolution
pub mod models;

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber filtered by RUST_LOG or the default filter.
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("{} v{} tracing initialized", config::APP_NAME, config::APP_VERSION);
    }
}
