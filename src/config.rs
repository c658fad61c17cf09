// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Configuration module.
//!
//! Built-in defaults point at a controller in its own access-point mode.
//! A `config.toml` in the user config directory overrides them; it is
//! written with the defaults on first run.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::transport::Variant;

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV: &str = "MODELINK_CONFIG";

/// Default controller Bluetooth address.
pub const DEFAULT_DEVICE_ADDRESS: &str = "00:00:00:00:00:00";

/// Default REST base URL.
pub const DEFAULT_BASE_URL: &str = "http://192.168.4.1";

/// Default TCP endpoint.
pub const DEFAULT_TCP_HOST: &str = "192.168.4.1";
pub const DEFAULT_TCP_PORT: u16 = 8080;

const APP_DIR: &str = "modelink";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for persisted history.
    #[serde(skip)]
    pub data_dir: PathBuf,

    /// Device link settings.
    #[serde(default)]
    pub transport: TransportConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Which transport reaches the device.
    pub variant: Variant,

    pub bluetooth: BluetoothConfig,

    pub http: HttpConfig,

    pub tcp: TcpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BluetoothConfig {
    /// Controller address, `XX:XX:XX:XX:XX:XX`.
    pub address: String,

    /// RFCOMM channel.
    pub channel: u8,
}

impl Default for BluetoothConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_DEVICE_ADDRESS.to_string(),
            channel: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub base_url: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_TCP_HOST.to_string(),
            port: DEFAULT_TCP_PORT,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

impl Config {
    /// Path of the config file: `$MODELINK_CONFIG` or the user config dir.
    pub fn path() -> PathBuf {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => PathBuf::from(path),
            None => dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
                .join("config.toml"),
        }
    }

    /// Load configuration from file or create default.
    pub fn load() -> Result<Self> {
        let config = Self::load_from(&Self::path())?;
        std::fs::create_dir_all(&config.data_dir)
            .with_context(|| format!("creating data directory {:?}", config.data_dir))?;
        Ok(config)
    }

    /// Load from `path`, writing defaults there if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("parsing {:?}", path))?
        } else {
            let config = Self::default();
            config.save_to(path)?;
            config
        };

        config.data_dir = default_data_dir();
        Ok(config)
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_written_on_first_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.transport.variant, Variant::Bluetooth);
        assert_eq!(config.transport.http.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.transport.tcp.port, DEFAULT_TCP_PORT);
        assert!(config.data_dir.ends_with(APP_DIR));

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(
            reloaded.transport.bluetooth.address,
            DEFAULT_DEVICE_ADDRESS
        );
    }

    #[test]
    fn test_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[transport]\nvariant = \"tcp\"\n\n[transport.tcp]\nhost = \"10.0.0.7\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.transport.variant, Variant::Tcp);
        assert_eq!(config.transport.tcp.host, "10.0.0.7");
        assert_eq!(config.transport.tcp.port, DEFAULT_TCP_PORT);
        assert_eq!(config.transport.bluetooth.channel, 1);
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[transport]\nvariant = \"carrier-pigeon\"\n")
            .unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
