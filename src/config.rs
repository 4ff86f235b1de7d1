//! Configuration structs (serde + toml, following the teacher's
//! `#[serde(default = "...")]` convention for every knob that has a
//! sensible default).

use std::time::Duration;

use serde::Deserialize;

use crate::error::Error;

fn default_retries() -> u32 {
    3
}

fn default_retry_interval_ms() -> u64 {
    3000
}

fn default_blacklist_ttl_ms() -> u64 {
    60_000
}

fn default_fail_count_threshold() -> u32 {
    3
}

/// Client-side tuning knobs (spec.md §6).
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
    #[serde(default = "default_blacklist_ttl_ms")]
    pub blacklist_ttl_ms: u64,
    #[serde(default = "default_fail_count_threshold")]
    pub fail_count_threshold: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            retry_interval_ms: default_retry_interval_ms(),
            blacklist_ttl_ms: default_blacklist_ttl_ms(),
            fail_count_threshold: default_fail_count_threshold(),
        }
    }
}

impl ClientConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn blacklist_ttl(&self) -> Duration {
        Duration::from_millis(self.blacklist_ttl_ms)
    }

    /// Parse a client configuration from a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, Error> {
        toml::from_str(text).map_err(|e| Error::MalformedPacket(format!("invalid client config: {e}")))
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_auth_port() -> u16 {
    1812
}

fn default_acct_port() -> u16 {
    1813
}

/// Server-side bind configuration (spec.md §6).
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_auth_port")]
    pub auth_port: u16,
    #[serde(default = "default_acct_port")]
    pub acct_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            auth_port: default_auth_port(),
            acct_port: default_acct_port(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml(text: &str) -> Result<Self, Error> {
        toml::from_str(text).map_err(|e| Error::MalformedPacket(format!("invalid server config: {e}")))
    }
}
