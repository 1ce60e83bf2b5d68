//! Configuration for the Lutron Caseta integration
//!
//! Loads `lutron.yaml` from the integration's config directory with support
//! for custom tags:
//!
//! - `!include path` - Include another YAML file
//! - `!secret key` - Substitute from secrets.yaml
//! - `!env_var VAR` - Environment variable substitution
//!
//! Process settings (config directory, listen address, log level) come from
//! the `UC_*` environment variables.
//!
//! # Example
//!
//! ```ignore
//! use lutron_config::{IntegrationConfig, Settings};
//!
//! let settings = Settings::from_env()?;
//! let config = IntegrationConfig::load(&settings.config_home)?;
//! ```

mod error;
mod loader;
mod secrets;
mod settings;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_yaml, YamlLoader};
pub use secrets::Secrets;
pub use settings::{
    BridgeConfig, DeviceConfig, IntegrationConfig, Settings, CONFIG_FILE, ENV_CONFIG_HOME,
    ENV_HTTP_PORT, ENV_INTERFACE, ENV_LOG_LEVEL,
};

pub use serde_yaml::Value;
