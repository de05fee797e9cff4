// Logging module - Logging infrastructure
use crate::domain::error::{FluidComError, FluidComResult};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging system
///
/// `RUST_LOG` wins when set; otherwise `level` applies to this crate. With
/// `verbose`, frame dumps are included and each line carries its source
/// location.
pub fn init_logging(level: &str, verbose: bool) -> FluidComResult<()> {
    let level = if verbose { "debug" } else { level };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("fluidcom={},warn", level)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(verbose)
                .with_file(verbose)
                .with_line_number(verbose),
        )
        .try_init()
        .map_err(|e| FluidComError::Config {
            message: format!("Failed to initialize logging: {}", e),
        })?;

    tracing::debug!("FluidCom logging system initialized");
    Ok(())
}
