//! Plain DNS listeners feeding the query handler.
//!
//! UDP spawns one task per datagram. TCP spawns one task per connection and
//! one task per framed query on it, so slow upstream answers never block
//! later queries on the same connection.

mod tcp;
mod udp;

pub use tcp::{serve_tcp, TcpResponseWriter};
pub use udp::{serve_udp, truncate_for_udp, UdpResponseWriter};

use dohproxy_domain::DomainError;
use hickory_proto::op::Message;

fn encode(response: &Message) -> Result<Vec<u8>, DomainError> {
    response
        .to_vec()
        .map_err(|e| DomainError::WriteFailed(format!("failed to encode response: {}", e)))
}
