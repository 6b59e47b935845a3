pub mod block_filter;
pub mod forwarding;
pub mod server;
pub mod transport;

pub use block_filter::BlockedDomainTable;
pub use transport::{AdmissionGate, DohJsonClient};
