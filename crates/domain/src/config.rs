pub mod errors;
pub mod logging;
pub mod metrics;
pub mod proxy;
pub mod root;
pub mod server;
pub mod upstream;

pub use errors::ConfigError;
pub use logging::LoggingConfig;
pub use metrics::MetricsConfig;
pub use proxy::ProxyConfig;
pub use root::{CliOverrides, Config};
pub use server::{HostAndPort, ServerConfig};
pub use upstream::DohClientConfig;
