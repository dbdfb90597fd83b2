//! Node configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use sylva_market::MarketConfig;
use sylva_sentinel::SentinelConfig;

/// Node configuration file (`node.toml`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Ledger persistence
    pub ledger: LedgerConfig,
    /// Sentinel thresholds
    pub sentinel: SentinelConfig,
    /// Marketplace settings
    pub market: MarketConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub listen_addr: String,
}

/// Ledger configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Directory for block files; the ledger lives in memory only when unset
    pub data_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:5000".to_string(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        let config: NodeConfig = toml::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)
    }

    /// Get default configuration directory
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir().unwrap_or_default().join("sylva")
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("node.toml")
    }

    /// Get default ledger data directory
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_default()
            .join("sylva")
            .join("ledger")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self
            .server
            .listen_addr
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(format!(
                "Invalid listen address: {}",
                self.server.listen_addr
            ));
        }

        if let Some(dir) = &self.ledger.data_dir {
            if dir.as_os_str().is_empty() {
                return Err("Ledger data directory cannot be empty".to_string());
            }
        }

        self.sentinel.validate().map_err(|e| e.to_string())?;
        self.market.validate().map_err(|e| e.to_string())?;

        Ok(())
    }
}
