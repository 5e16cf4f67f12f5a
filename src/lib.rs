pub mod commands;
pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::core::config::RunConfiguration;
pub use crate::core::error::{RunError, RunResult};
pub use crate::core::pipeline::{PreparedServer, ProvisioningPipeline};

/// Initialize structured logging on stderr, leaving stdout to the
/// downloader and the server.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,hytale_run=debug")),
        )
        .with_writer(std::io::stderr)
        .init();
}
