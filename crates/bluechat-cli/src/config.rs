//! BlueChat CLI configuration
//!
//! Configuration is layered with figment, later sources overriding earlier ones:
//! - built-in defaults
//! - `bluechat.toml` in the working directory
//! - `~/.bluechat/config.toml`
//! - `BLUECHAT_*` environment variables (`__` separates nested keys)
//! - an explicit `--config` file
//! - command line flags

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use bluechat_core::SessionConfig;
use bluechat_rfcomm::{BluezTransportConfig, TcpTransportConfig};

// ----------------------------------------------------------------------------
// CLI Application Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the chat client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Session manager settings (service record, buffer size, naming)
    pub session: SessionConfig,
    /// Which transport to use and how to set it up
    pub transport: TransportSettings,
    /// Chat front-end behaviour
    pub chat: ChatConfig,
    /// Delayed redial after failures and drops
    pub reconnect: ReconnectConfig,
}

/// Transport selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Loopback or LAN TCP, usable without a radio
    #[default]
    Tcp,
    /// RFCOMM through BlueZ (Linux, `bluez` feature)
    Bluez,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    pub kind: TransportKind,
    pub tcp: TcpTransportConfig,
    pub bluez: BluezTransportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Name shown next to our own messages
    pub display_name: String,
    /// Prompt printed in interactive mode
    pub prompt: String,
    /// Pause between starting the listener and dialing in `connect`
    pub connect_delay_ms: u64,
    /// Enable verbose logging output
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub enabled: bool,
    /// Redial delay after a failed dial
    pub after_failure_ms: u64,
    /// Redial delay after an established session drops
    pub after_loss_ms: u64,
}

// ----------------------------------------------------------------------------
// Default Implementations
// ----------------------------------------------------------------------------

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            display_name: "Me".to_string(),
            prompt: "bluechat> ".to_string(),
            connect_delay_ms: 500,
            verbose: false,
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            after_failure_ms: 3000,
            after_loss_ms: 5000,
        }
    }
}

impl ChatConfig {
    pub fn connect_delay(&self) -> Duration {
        Duration::from_millis(self.connect_delay_ms)
    }
}

impl ReconnectConfig {
    pub fn after_failure(&self) -> Duration {
        Duration::from_millis(self.after_failure_ms)
    }

    pub fn after_loss(&self) -> Duration {
        Duration::from_millis(self.after_loss_ms)
    }
}

// ----------------------------------------------------------------------------
// Configuration Loading Logic
// ----------------------------------------------------------------------------

impl AppConfig {
    /// Load configuration with the standard priority order, finishing with `explicit`
    /// when one was given on the command line
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file("bluechat.toml"));

        if let Some(path) = Self::default_config_path() {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed("BLUECHAT_").split("__"));

        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::Loading(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }

        Self::extract(figment)
    }

    /// Load only defaults plus one file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()));
        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: AppConfig = figment
            .extract()
            .map_err(|e| ConfigError::Loading(format!("Failed to load configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// `~/.bluechat/config.toml`, when a home directory is known
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".bluechat").join("config.toml"))
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        if self.chat.display_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Display name must not be empty".to_string(),
            ));
        }
        if self.reconnect.enabled
            && (self.reconnect.after_failure_ms == 0 || self.reconnect.after_loss_ms == 0)
        {
            return Err(ConfigError::Validation(
                "Reconnect delays must be greater than 0".to_string(),
            ));
        }
        if self.transport.bluez.channel == 0 || self.transport.bluez.channel > 30 {
            return Err(ConfigError::Validation(format!(
                "RFCOMM channel must be between 1 and 30, got {}",
                self.transport.bluez.channel
            )));
        }
        Ok(())
    }

    /// Create example configuration file content
    pub fn example_config() -> String {
        let mut example = AppConfig::default();
        example.chat.display_name = "Alice".to_string();
        example.transport.bluez.adapter = Some("hci0".to_string());

        toml::to_string_pretty(&example)
            .unwrap_or_else(|_| "# Failed to generate example config".to_string())
    }
}

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Configuration-related errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {0}")]
    Loading(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
