use std::path::{Path, PathBuf};
use std::time::Duration;

use rc_backend::DEFAULT_UPSTREAM_URL;
use serde::Deserialize;
use tracing::warn;

pub const UPSTREAM_URL_ENV: &str = "RELAYCHAT_UPSTREAM_URL";
pub const HOST_ENV: &str = "RELAYCHAT_HOST";
pub const PORT_ENV: &str = "RELAYCHAT_PORT";

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub upstream: UpstreamConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Chat-context endpoint that receives the streaming request.
    pub url: String,
    /// Ceiling for connecting and for the whole streamed response.
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_UPSTREAM_URL.to_string(),
            timeout_secs: 60,
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 7860,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Config {
    /// Load the config file, then apply environment overrides.
    pub fn load_or_default() -> Self {
        let mut config = Self::load_from(&config_path());
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Parse `path`. A missing file yields defaults; a malformed one is
    /// reported and also yields defaults.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                warn!("failed to parse {}: {e}", path.display());
                Config::default()
            }),
            Err(_) => Config::default(),
        }
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(UPSTREAM_URL_ENV).filter(|v| !v.is_empty()) {
            self.upstream.url = url;
        }
        if let Some(host) = lookup(HOST_ENV).filter(|v| !v.is_empty()) {
            self.server.host = host;
        }
        if let Some(port) = lookup(PORT_ENV) {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!("ignoring invalid {PORT_ENV}={port:?}"),
            }
        }
    }
}

fn config_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("relaychat").join("config.toml")
}
