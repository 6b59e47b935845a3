use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    /// Newline-delimited list of blocked domains. Empty disables blocking.
    #[serde(default)]
    pub blocked_domains_file: String,

    #[serde(default = "default_clamp_min_ttl", rename = "clampMinTTLSeconds")]
    pub clamp_min_ttl_seconds: u32,

    #[serde(default = "default_clamp_max_ttl", rename = "clampMaxTTLSeconds")]
    pub clamp_max_ttl_seconds: u32,
}

impl ProxyConfig {
    pub fn blocked_domains_path(&self) -> Option<&str> {
        let trimmed = self.blocked_domains_file.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            blocked_domains_file: String::new(),
            clamp_min_ttl_seconds: default_clamp_min_ttl(),
            clamp_max_ttl_seconds: default_clamp_max_ttl(),
        }
    }
}

fn default_clamp_min_ttl() -> u32 {
    10
}

fn default_clamp_max_ttl() -> u32 {
    86_400
}
