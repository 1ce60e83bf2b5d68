//! Integration configuration and process settings
//!
//! `lutron.yaml` describes the bridge; the process settings come from the
//! environment the hub starts the integration with.

use lutron_core::{DeviceDomain, DeviceId, DeviceInfo, RawDeviceState, MAX_LEVEL};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::HashSet;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::loader::load_yaml;

/// Name of the integration configuration file inside the config directory
pub const CONFIG_FILE: &str = "lutron.yaml";

pub const ENV_CONFIG_HOME: &str = "UC_CONFIG_HOME";
pub const ENV_HTTP_PORT: &str = "UC_INTEGRATION_HTTP_PORT";
pub const ENV_INTERFACE: &str = "UC_INTEGRATION_INTERFACE";
pub const ENV_LOG_LEVEL: &str = "UC_LOG_LEVEL";

const DEFAULT_CONFIG_HOME: &str = "./config";
const DEFAULT_HTTP_PORT: u16 = 9090;
const DEFAULT_INTERFACE: &str = "0.0.0.0";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Contents of `lutron.yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntegrationConfig {
    #[serde(default)]
    pub bridge: BridgeConfig,
}

/// The configured Caseta bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Stable identifier of the bridge
    pub identifier: String,

    /// Display name; defaults to the identifier
    #[serde(default)]
    pub name: Option<String>,

    /// Network address of the bridge
    #[serde(default)]
    pub address: Option<String>,

    /// Statically configured devices
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            identifier: "caseta".to_string(),
            name: None,
            address: None,
            devices: Vec::new(),
        }
    }
}

impl BridgeConfig {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.identifier)
    }
}

/// A device entry in the bridge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub device_id: DeviceId,
    pub name: String,
    pub domain: DeviceDomain,
    #[serde(default)]
    pub model: Option<String>,
    /// Initial output level, 0-100
    #[serde(default)]
    pub level: u8,
}

impl DeviceConfig {
    pub fn to_device_info(&self) -> DeviceInfo {
        DeviceInfo {
            device_id: self.device_id.clone(),
            name: self.name.clone(),
            domain: self.domain.clone(),
            model: self.model.clone(),
            state: RawDeviceState::level(self.level),
        }
    }
}

impl IntegrationConfig {
    /// Load `lutron.yaml` from a config directory
    ///
    /// A missing file yields the default configuration.
    pub fn load(config_dir: impl AsRef<Path>) -> ConfigResult<Self> {
        let config_dir = config_dir.as_ref();
        if !config_dir.join(CONFIG_FILE).exists() {
            info!(dir = %config_dir.display(), "No lutron.yaml found, using defaults");
            return Ok(Self::default());
        }

        let yaml = load_yaml(config_dir, CONFIG_FILE)?;
        Self::from_yaml(yaml)
    }

    /// Parse and validate the configuration from a processed YAML value
    pub fn from_yaml(yaml: Value) -> ConfigResult<Self> {
        if yaml.is_null() {
            return Ok(Self::default());
        }
        if !yaml.is_mapping() {
            return Err(ConfigError::InvalidValue {
                key: "root".to_string(),
                reason: "configuration must be a mapping".to_string(),
            });
        }

        let config: IntegrationConfig =
            serde_yaml::from_value(yaml).map_err(|e| ConfigError::InvalidValue {
                key: "bridge".to_string(),
                reason: e.to_string(),
            })?;
        config.validate()?;

        debug!(
            bridge = %config.bridge.identifier,
            devices = config.bridge.devices.len(),
            "Loaded integration configuration"
        );
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.bridge.identifier.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "bridge.identifier".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for device in &self.bridge.devices {
            if !seen.insert(&device.device_id) {
                return Err(ConfigError::InvalidValue {
                    key: "bridge.devices".to_string(),
                    reason: format!("duplicate device_id '{}'", device.device_id),
                });
            }
            if device.level > MAX_LEVEL {
                return Err(ConfigError::InvalidValue {
                    key: format!("bridge.devices.{}.level", device.device_id),
                    reason: format!("must be between 0 and {MAX_LEVEL}"),
                });
            }
        }
        Ok(())
    }

    /// Device list for the bridge
    pub fn devices(&self) -> Vec<DeviceInfo> {
        self.bridge
            .devices
            .iter()
            .map(DeviceConfig::to_device_info)
            .collect()
    }
}

/// Process settings taken from the environment
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub config_home: PathBuf,
    pub http_port: u16,
    pub interface: IpAddr,
    /// Log filter directive
    pub log_level: String,
}

impl Settings {
    /// Read settings from the process environment
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through a variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let http_port = match lookup(ENV_HTTP_PORT).filter(|v| !v.trim().is_empty()) {
            Some(port) => port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_HTTP_PORT.to_string(),
                reason: format!("'{port}' is not a valid port"),
            })?,
            None => DEFAULT_HTTP_PORT,
        };

        let interface = get(ENV_INTERFACE, DEFAULT_INTERFACE);
        let interface = interface
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                key: ENV_INTERFACE.to_string(),
                reason: format!("'{interface}' is not an IP address"),
            })?;

        Ok(Self {
            config_home: PathBuf::from(get(ENV_CONFIG_HOME, DEFAULT_CONFIG_HOME)),
            http_port,
            interface,
            log_level: get(ENV_LOG_LEVEL, DEFAULT_LOG_LEVEL).to_lowercase(),
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_home: PathBuf::from(DEFAULT_CONFIG_HOME),
            http_port: DEFAULT_HTTP_PORT,
            interface: IpAddr::from([0, 0, 0, 0]),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}
