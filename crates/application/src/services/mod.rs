pub mod proxy_metrics;
pub mod responses;
pub mod ttl_clamp;

pub use proxy_metrics::{rcode_name, MetricsSnapshot, ProxyMetrics};
pub use ttl_clamp::clamp_ttls;
