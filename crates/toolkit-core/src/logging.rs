use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::ToolkitError;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,toolkit_core=debug,registry=info";

/// Installs a console subscriber. `RUST_LOG` overrides `filter`.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(filter: &str) -> Result<(), ToolkitError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_thread_ids(false).compact())
        .try_init()
        .map_err(|e| ToolkitError::Config(format!("failed to initialize logging: {e}")))
}
