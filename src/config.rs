use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    /// Predefined sites offered on the setup surface.
    #[serde(default = "default_popular_sites")]
    pub popular_sites: Vec<String>,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub rules: RulesConfig,

    #[serde(default)]
    pub passcode: PasscodeConfig,

    #[serde(default)]
    pub relay: RelayConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_backend")]
    pub backend: String,
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RulesConfig {
    #[serde(default = "default_max_rules")]
    pub max_rules: usize,
    #[serde(default = "default_block_page_url")]
    pub block_page_url: String,
    #[serde(default = "default_priority")]
    pub priority: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PasscodeConfig {
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: u64,
    #[serde(default = "default_passcode_length")]
    pub length: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RelayConfig {
    #[serde(default = "default_relay_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_relay_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_product_name")]
    pub product_name: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Defaults
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_popular_sites() -> Vec<String> {
    [
        "youtube.com",
        "facebook.com",
        "instagram.com",
        "twitter.com",
        "x.com",
        "reddit.com",
        "tiktok.com",
        "netflix.com",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_store_backend() -> String {
    "sqlite".to_string()
}
fn default_sqlite_path() -> String {
    "focus-blocker.db".to_string()
}
fn default_max_rules() -> usize {
    1000
}
fn default_block_page_url() -> String {
    "http://127.0.0.1:8080/blocked.html".to_string()
}
fn default_priority() -> u32 {
    1
}
fn default_ttl_minutes() -> u64 {
    10
}
fn default_passcode_length() -> usize {
    6
}
fn default_relay_endpoint() -> String {
    "https://api.emailjs.com/api/v1.0/email/send".to_string()
}
fn default_relay_timeout() -> u64 {
    15
}
fn default_product_name() -> String {
    "Focus Blocker".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            popular_sites: default_popular_sites(),
            store: StoreConfig::default(),
            rules: RulesConfig::default(),
            passcode: PasscodeConfig::default(),
            relay: RelayConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            sqlite_path: default_sqlite_path(),
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            max_rules: default_max_rules(),
            block_page_url: default_block_page_url(),
            priority: default_priority(),
        }
    }
}

impl Default for PasscodeConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_ttl_minutes(),
            length: default_passcode_length(),
        }
    }
}

impl PasscodeConfig {
    pub fn ttl_millis(&self) -> u64 {
        self.ttl_minutes * 60 * 1000
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            endpoint: default_relay_endpoint(),
            timeout_secs: default_relay_timeout(),
            product_name: default_product_name(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse config TOML")
    }
}
