use super::encode;
use async_trait::async_trait;
use dohproxy_application::ports::ResponseWriter;
use dohproxy_application::use_cases::HandleDnsQueryUseCase;
use dohproxy_domain::DomainError;
use hickory_proto::op::Message;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

const MAX_UDP_DATAGRAM: usize = 4096;

pub struct UdpResponseWriter {
    socket: Arc<UdpSocket>,
    peer: SocketAddr,
}

impl UdpResponseWriter {
    pub fn new(socket: Arc<UdpSocket>, peer: SocketAddr) -> Self {
        Self { socket, peer }
    }
}

#[async_trait]
impl ResponseWriter for UdpResponseWriter {
    async fn write_message(&mut self, response: &Message) -> Result<(), DomainError> {
        let bytes = truncate_for_udp(response)?;
        self.socket
            .send_to(&bytes, self.peer)
            .await
            .map_err(|e| DomainError::WriteFailed(format!("UDP send to {}: {}", self.peer, e)))?;
        Ok(())
    }
}

/// Encodes `response` for a UDP client. A response that does not fit the
/// client's advertised EDNS payload (512 bytes without EDNS) is replaced by
/// an empty one with TC set, telling the client to retry over TCP.
pub fn truncate_for_udp(response: &Message) -> Result<Vec<u8>, DomainError> {
    let bytes = encode(response)?;
    let limit = usize::from(response.max_payload());
    if bytes.len() <= limit {
        return Ok(bytes);
    }

    debug!(id = response.id(), size = bytes.len(), limit, "Truncating UDP response");
    let mut truncated = response.clone();
    truncated.answers_mut().clear();
    truncated.name_servers_mut().clear();
    truncated.additionals_mut().clear();
    truncated.set_truncated(true);
    encode(&truncated)
}

/// Receives datagrams until `shutdown` is cancelled.
pub async fn serve_udp(
    socket: Arc<UdpSocket>,
    handler: Arc<HandleDnsQueryUseCase>,
    shutdown: CancellationToken,
) {
    let local = socket.local_addr().ok();
    let mut recv_buf = [0u8; MAX_UDP_DATAGRAM];

    loop {
        let (len, peer) = tokio::select! {
            _ = shutdown.cancelled() => break,
            result = socket.recv_from(&mut recv_buf) => match result {
                Ok(received) => received,
                Err(e) => {
                    error!(error = %e, "UDP recv error");
                    continue;
                }
            },
        };

        let query: Arc<[u8]> = Arc::from(&recv_buf[..len]);
        let handler = Arc::clone(&handler);
        let socket = Arc::clone(&socket);
        tokio::spawn(async move {
            let mut writer = UdpResponseWriter::new(socket, peer);
            handler.handle_wire(&query, &mut writer).await;
        });
    }

    info!(local = ?local, "UDP listener stopped");
}
