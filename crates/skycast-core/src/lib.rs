pub mod config;
pub mod error;

pub use config::{Config, DashboardConfig, ProviderConfig, SearchConfig, ValidationResult};
pub use error::{AppError, ConfigError};

/// Initialize logging for the application
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("SkyCast core initialized");
}
