//! Configuration Module
//!
//! Command-line parsing and validated configuration for the relay.

mod cli;
mod settings;

pub use cli::{Cli, DEFAULT_PROVIDER_URL};
pub use settings::{
    ConfigError, Credentials, DriverSettings, KafkaSettings, ProviderSettings, RelayConfig,
    ServerSettings,
};

/// Load `.env` from the working directory or its ancestors.
///
/// Returns the loaded path, or `None` when no file was found.
pub fn load_dotenv() -> Option<std::path::PathBuf> {
    dotenvy::dotenv().ok()
}
