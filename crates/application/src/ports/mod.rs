mod blocked_domains;
mod response_writer;
mod upstream_client;

pub use blocked_domains::{BlockedDomainMatcher, FilterDecision};
pub use response_writer::ResponseWriter;
pub use upstream_client::UpstreamClient;
