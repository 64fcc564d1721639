// src/config.rs
use governor::Quota;
use log::error;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::fs;
use std::num::NonZeroU32;
use std::time::Duration;

// One game server to watch. The configured name is only a fallback; live
// replies overwrite it.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerEntry {
    pub name: String,
    pub address: String,
    pub query_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Game servers to poll, in display-contract order.
    pub servers: Vec<ServerEntry>,
    // Channel the bulletin board lives in.
    pub channel: u64,
    #[serde(default = "default_query_interval")]
    pub query_interval_secs: u64,

    // Rate limiting configs
    #[serde(default = "default_write_period")]
    pub write_period_secs: u64,
    #[serde(default = "default_write_burst")]
    pub write_burst_limit: u32,
    #[serde(default = "default_status_period")]
    pub status_period_secs: u64,
    #[serde(default = "default_status_burst")]
    pub status_burst_limit: u32,
}

fn default_query_interval() -> u64 {
    30
}

fn default_write_period() -> u64 {
    1
}

fn default_write_burst() -> u32 {
    5
}

// Discord allows two topic updates per channel per ten minutes.
fn default_status_period() -> u64 {
    300
}

fn default_status_burst() -> u32 {
    2
}

impl Default for Config {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            channel: 0,
            query_interval_secs: default_query_interval(),
            write_period_secs: default_write_period(),
            write_burst_limit: default_write_burst(),
            status_period_secs: default_status_period(),
            status_burst_limit: default_status_burst(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "Could not read configuration file: {}", e),
            Self::Parse(e) => write!(f, "Could not parse configuration file: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    // Reads the JSON file named by CONFIG_PATH (default ./config.json).
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.json".to_string());
        let raw = fs::read_to_string(&path).map_err(|e| {
            error!("Configuration file {} is not readable", path);
            ConfigError::Io(e)
        })?;
        serde_json::from_str(&raw).map_err(ConfigError::Parse)
    }

    pub fn write_quota(&self) -> Quota {
        Quota::with_period(Duration::from_secs(self.write_period_secs))
            .unwrap()
            .allow_burst(NonZeroU32::new(self.write_burst_limit).unwrap())
    }

    pub fn status_quota(&self) -> Quota {
        Quota::with_period(Duration::from_secs(self.status_period_secs))
            .unwrap()
            .allow_burst(NonZeroU32::new(self.status_burst_limit).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config_with_defaults() {
        let raw = r#"{
            "servers": [
                {"name": "Darklight", "address": "10.0.0.1", "query_port": 7758}
            ],
            "channel": 1234567890
        }"#;
        let config: Config = serde_json::from_str(raw).unwrap();
        assert_eq!(config.servers.len(), 1);
        assert_eq!(config.servers[0].query_port, 7758);
        assert_eq!(config.channel, 1234567890);
        assert_eq!(config.query_interval_secs, 30);
        assert_eq!(config.status_burst_limit, 2);
    }

    #[test]
    fn default_quotas_are_constructible() {
        let config = Config::default();
        config.write_quota();
        config.status_quota();
    }
}
