use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct HostAndPort {
    pub host: String,

    pub port: String,
}

impl HostAndPort {
    /// Joins host and port the way `host:port` is written on the wire,
    /// bracketing IPv6 literals.
    pub fn join(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.join().parse().ok()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_listen_address")]
    pub listen_address: HostAndPort,

    /// Seconds an idle TCP connection is kept open between queries.
    #[serde(default = "default_tcp_idle_timeout")]
    pub tcp_idle_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            tcp_idle_timeout_seconds: default_tcp_idle_timeout(),
        }
    }
}

fn default_listen_address() -> HostAndPort {
    HostAndPort {
        host: "127.0.0.1".to_string(),
        port: "10053".to_string(),
    }
}

fn default_tcp_idle_timeout() -> u64 {
    10
}
