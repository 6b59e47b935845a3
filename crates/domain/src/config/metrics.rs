use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsConfig {
    /// Seconds between two metrics summaries. Zero disables the report.
    #[serde(default = "default_timer_interval")]
    pub timer_interval_seconds: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            timer_interval_seconds: default_timer_interval(),
        }
    }
}

fn default_timer_interval() -> u64 {
    60
}
