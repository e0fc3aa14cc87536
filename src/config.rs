use anyhow::Context;
use serde::Deserialize;
use std::{path::Path, time::Duration};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub version: u32,
    pub app: AppConfig,
    #[serde(default)]
    pub library: LibraryConfig,
    pub http: HttpConfig,
    /// socket feed is disabled when absent
    pub socket: Option<SocketConfig>,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.to_string_lossy()))?;
        toml::from_str(&contents).with_context(|| "Failed to parse config TOML")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// origin in-process messages must come from
    pub origin: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LibraryConfig {
    #[serde(default)]
    pub seed_sample: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub bind_addr: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SocketConfig {
    pub addr: String,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

fn default_reconnect_delay_ms() -> u64 {
    3000
}

impl SocketConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}
