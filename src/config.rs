//! Proxy configuration loaded from `gtbridge.json`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gtbridge_proto::DecodeLog;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "gtbridge.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub host: HostConfig,
    pub web: WebConfig,
    pub server: ServerConfig,
    pub dns: DnsConfig,
    pub cache: CacheConfig,
    pub log: LogConfig,
}

/// The proxy's own ENet listener.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HostConfig {
    /// UDP port the game client is pointed at.
    pub port: u16,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self { port: 16999 }
    }
}

/// The HTTPS bootstrap listener.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WebConfig {
    /// TCP port for `server_data.php`. The client insists on 443, so
    /// anything else is only useful behind a port forward.
    pub port: u16,
    /// Directory the serving certificate is persisted under.
    pub resource_dir: PathBuf,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: 443,
            resource_dir: PathBuf::from("resources"),
        }
    }
}

/// The real server this proxy fronts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Hostname or IP serving the real `server_data.php`.
    pub address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "www.growtopia1.com".to_string(),
        }
    }
}

/// DNS-over-HTTPS settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DnsConfig {
    /// Provider name, `google` or `cloudflare`.
    pub provider: String,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            provider: "google".to_string(),
        }
    }
}

/// On-disk caches.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Where the downloaded `items.dat` is kept between sessions.
    pub items: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            items: PathBuf::from("cache/items.dat"),
        }
    }
}

/// Which decoded frames get dumped to the trace log.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    pub print_message: bool,
    pub print_game_update_packet: bool,
    pub print_variant: bool,
    pub print_extra: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            print_message: true,
            print_game_update_packet: false,
            print_variant: true,
            print_extra: false,
        }
    }
}

impl LogConfig {
    pub fn decode_log(&self) -> DecodeLog {
        DecodeLog {
            print_message: self.print_message,
            print_game_update_packet: self.print_game_update_packet,
            print_variant: self.print_variant,
            print_extra: self.print_extra,
        }
    }
}

impl Config {
    /// Reads the configuration, writing a default file when none exists.
    /// A file that exists but does not parse fails startup.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let config = serde_json::from_str(&contents).with_context(|| {
                    format!("Failed to parse configuration file {}", path.display())
                })?;
                info!(
                    "Config file \"{}\" is all loaded up and ready to go!",
                    path.display()
                );
                Ok(config)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(
                    "Configuration file \"{}\" not found. Creating default configuration file...",
                    path.display()
                );
                let config = Self::default();
                config.save(path).with_context(|| {
                    format!(
                        "Failed to create default configuration file {}",
                        path.display()
                    )
                })?;
                info!(
                    "Default configuration file \"{}\" created successfully.",
                    path.display()
                );
                Ok(config)
            }
            Err(err) => Err(err).with_context(|| {
                format!("Failed to read configuration file {}", path.display())
            }),
        }
    }

    fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
