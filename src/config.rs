//! Startup configuration
//!
//! Read once before the supervisor starts: a TOML file (path from
//! `TALLY_CONFIG`, else `<config dir>/tally-light/config.toml`) overlaid with
//! `TALLY_*` environment variables. A missing file means defaults.

use crate::error::ConfigError;
use crate::mqtt::config::SessionConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const CONFIG_DIR: &str = "tally-light";
const CONFIG_FILE: &str = "config.toml";
const CONFIG_PATH_ENV: &str = "TALLY_CONFIG";

#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Identity the status topic is derived from
    pub principal: String,
    pub broker: BrokerConfig,
    pub link: LinkConfig,
    pub session: SessionSettings,
    pub indicator: IndicatorConfig,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive_secs: u64,
    /// Defaults to `tally-<principal>`
    pub client_id: Option<String>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            username: None,
            password: None,
            keep_alive_secs: 5,
            client_id: None,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LinkConfig {
    pub interface: String,
    pub retry_secs: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            interface: "wlan0".to_string(),
            retry_secs: 1,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SessionSettings {
    pub retry_secs: u64,
    pub open_timeout_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            retry_secs: 1,
            open_timeout_secs: 10,
        }
    }
}

/// BCM pin numbers of the two lamps.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct IndicatorConfig {
    pub on_air_pin: u8,
    pub on_camera_pin: u8,
    pub blink_millis: u64,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            on_air_pin: 17,
            on_camera_pin: 27,
            blink_millis: 500,
        }
    }
}

impl Config {
    pub async fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::config_path() {
            Some(path) if tokio::fs::try_exists(&path).await.unwrap_or(false) => {
                Self::from_file(&path).await?
            }
            Some(path) => {
                info!("No config file at {}, using defaults", path.display());
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    pub async fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!("Reading config from {}", path.display());
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Overlays `TALLY_*` variables resolved through `lookup`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(principal) = lookup("TALLY_PRINCIPAL") {
            self.principal = principal;
        }
        if let Some(host) = lookup("TALLY_BROKER_HOST") {
            self.broker.host = host;
        }
        if let Some(port) = lookup("TALLY_BROKER_PORT") {
            self.broker.port = port.parse().map_err(|e| ConfigError::Invalid {
                key: "TALLY_BROKER_PORT",
                reason: format!("{:?} is not a port: {}", port, e),
            })?;
        }
        if let Some(user) = lookup("TALLY_MQTT_USER") {
            self.broker.username = Some(user);
        }
        if let Some(password) = lookup("TALLY_MQTT_PASSWORD") {
            self.broker.password = Some(password);
        }
        if let Some(interface) = lookup("TALLY_INTERFACE") {
            self.link.interface = interface;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &'static str, reason: &str| {
            Err(ConfigError::Invalid {
                key,
                reason: reason.to_string(),
            })
        };

        if self.principal.trim().is_empty() {
            return invalid("principal", "must not be empty");
        }
        if self.principal.contains(['/', '+', '#']) {
            return invalid("principal", "must not contain '/', '+' or '#'");
        }
        if self.broker.host.trim().is_empty() {
            return invalid("broker.host", "must not be empty");
        }
        if self.broker.port == 0 {
            return invalid("broker.port", "must not be 0");
        }
        if self.broker.keep_alive_secs == 0 {
            return invalid("broker.keep_alive_secs", "must be at least 1");
        }
        if self.link.interface.trim().is_empty() {
            return invalid("link.interface", "must not be empty");
        }
        if self.link.retry_secs == 0 {
            return invalid("link.retry_secs", "must be at least 1");
        }
        if self.session.retry_secs == 0 {
            return invalid("session.retry_secs", "must be at least 1");
        }
        if self.session.open_timeout_secs == 0 {
            return invalid("session.open_timeout_secs", "must be at least 1");
        }
        if self.indicator.on_air_pin == self.indicator.on_camera_pin {
            return invalid("indicator", "on-air and on-camera pins must differ");
        }
        if self.indicator.blink_millis == 0 {
            return invalid("indicator.blink_millis", "must be at least 1");
        }
        Ok(())
    }

    pub fn status_topic(&self) -> String {
        format!("{}/status", self.principal)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            client_id: self
                .broker
                .client_id
                .clone()
                .unwrap_or_else(|| format!("tally-{}", self.principal)),
            host: self.broker.host.clone(),
            port: self.broker.port,
            username: self.broker.username.clone(),
            password: self.broker.password.clone(),
            keep_alive: Duration::from_secs(self.broker.keep_alive_secs),
            status_topic: self.status_topic(),
            retry_cadence: Duration::from_secs(self.session.retry_secs),
        }
    }

    pub fn link_retry(&self) -> Duration {
        Duration::from_secs(self.link.retry_secs)
    }

    pub fn open_timeout(&self) -> Duration {
        Duration::from_secs(self.session.open_timeout_secs)
    }

    pub fn blink_period(&self) -> Duration {
        Duration::from_millis(self.indicator.blink_millis)
    }
}
