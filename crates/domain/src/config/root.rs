use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::Path;
use url::{Host, Url};

use super::errors::ConfigError;
use super::logging::LoggingConfig;
use super::metrics::MetricsConfig;
use super::proxy::ProxyConfig;
use super::server::ServerConfig;
use super::upstream::{DohClientConfig, MAX_CONCURRENT_REQUESTS};
use crate::network::resolve_public_addr;

const LOCAL_CONFIG_PATH: &str = "dohproxy.json";
const SYSTEM_CONFIG_PATH: &str = "/etc/dohproxy/config.json";

/// Main configuration structure for dohproxy
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default, rename = "metricsConfiguration")]
    pub metrics: MetricsConfig,

    #[serde(default, rename = "dnsServerConfiguration")]
    pub server: ServerConfig,

    #[serde(default, rename = "dohClientConfiguration")]
    pub doh_client: DohClientConfig,

    #[serde(default, rename = "dnsProxyConfiguration")]
    pub proxy: ProxyConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file or use defaults
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. dohproxy.json in current directory
    /// 3. /etc/dohproxy/config.json
    /// 4. Default configuration
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if Path::new(LOCAL_CONFIG_PATH).exists() {
            Self::from_file(LOCAL_CONFIG_PATH)?
        } else if Path::new(SYSTEM_CONFIG_PATH).exists() {
            Self::from_file(SYSTEM_CONFIG_PATH)?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides);
        Ok(config)
    }

    /// Load configuration from a specific file. `.toml` files are parsed as
    /// TOML, everything else as JSON.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;

        let is_toml = Path::new(path)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Self::from_json(&contents)
        }
    }

    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(host) = overrides.listen_host {
            self.server.listen_address.host = host;
        }
        if let Some(port) = overrides.listen_port {
            self.server.listen_address.port = port.to_string();
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let listen = &self.server.listen_address;
        let listen_addr = listen.socket_addr().ok_or_else(|| {
            ConfigError::Validation(format!("Invalid listen address: {}", listen.join()))
        })?;
        if listen_addr.port() == 0 {
            return Err(ConfigError::Validation("Listen port cannot be 0".to_string()));
        }

        self.validate_upstream()?;

        if self.doh_client.max_concurrent_requests == 0 {
            return Err(ConfigError::Validation(
                "maxConcurrentRequests must be at least 1".to_string(),
            ));
        }
        if self.doh_client.max_concurrent_requests > MAX_CONCURRENT_REQUESTS {
            return Err(ConfigError::Validation(format!(
                "maxConcurrentRequests ({}) exceeds the limit of {}",
                self.doh_client.max_concurrent_requests, MAX_CONCURRENT_REQUESTS
            )));
        }
        if self.doh_client.request_timeout_milliseconds == 0 {
            return Err(ConfigError::Validation(
                "requestTimeoutMilliseconds must be greater than 0".to_string(),
            ));
        }

        if self.proxy.clamp_min_ttl_seconds > self.proxy.clamp_max_ttl_seconds {
            return Err(ConfigError::Validation(format!(
                "clampMinTTLSeconds ({}) exceeds clampMaxTTLSeconds ({})",
                self.proxy.clamp_min_ttl_seconds, self.proxy.clamp_max_ttl_seconds
            )));
        }

        Ok(())
    }

    fn validate_upstream(&self) -> Result<(), ConfigError> {
        let raw = self.doh_client.url.trim();
        let url = Url::parse(raw)
            .map_err(|e| ConfigError::Validation(format!("Invalid DoH URL '{}': {}", raw, e)))?;

        if !matches!(url.scheme(), "https" | "http") {
            return Err(ConfigError::Validation(format!(
                "DoH URL must use https or http, got '{}'",
                url.scheme()
            )));
        }

        let ip: Option<IpAddr> = match url.host() {
            Some(Host::Ipv4(v4)) => Some(IpAddr::V4(v4)),
            Some(Host::Ipv6(v6)) => Some(IpAddr::V6(v6)),
            Some(Host::Domain(_)) => None,
            None => {
                return Err(ConfigError::Validation(format!(
                    "DoH URL '{}' has no host",
                    raw
                )))
            }
        };

        if let Some(ip) = ip {
            let port = url.port_or_known_default().unwrap_or(443);
            resolve_public_addr(&ip.to_string(), &port.to_string()).map_err(|e| {
                ConfigError::Validation(format!("DoH URL '{}' rejected: {}", raw, e))
            })?;
        }

        Ok(())
    }
}

/// Command-line overrides for configuration
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub listen_host: Option<String>,
    pub listen_port: Option<u16>,
    pub log_level: Option<String>,
}
