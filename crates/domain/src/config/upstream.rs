use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest permit count a tokio semaphore accepts (`Semaphore::MAX_PERMITS`).
pub const MAX_CONCURRENT_REQUESTS: usize = usize::MAX >> 3;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DohClientConfig {
    #[serde(default = "default_url")]
    pub url: String,

    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    #[serde(default = "default_semaphore_acquire_timeout")]
    pub semaphore_acquire_timeout_milliseconds: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_milliseconds: u64,
}

impl DohClientConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.semaphore_acquire_timeout_milliseconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_milliseconds)
    }
}

impl Default for DohClientConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            max_concurrent_requests: default_max_concurrent_requests(),
            semaphore_acquire_timeout_milliseconds: default_semaphore_acquire_timeout(),
            request_timeout_milliseconds: default_request_timeout(),
        }
    }
}

fn default_url() -> String {
    "https://dns.google/resolve".to_string()
}

fn default_max_concurrent_requests() -> usize {
    100
}

fn default_semaphore_acquire_timeout() -> u64 {
    1_000
}

fn default_request_timeout() -> u64 {
    5_000
}
