use super::encode;
use async_trait::async_trait;
use dohproxy_application::ports::ResponseWriter;
use dohproxy_application::use_cases::HandleDnsQueryUseCase;
use dohproxy_domain::DomainError;
use hickory_proto::op::Message;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Writes length-prefixed responses onto a connection shared by every
/// query task spawned from it.
#[derive(Clone)]
pub struct TcpResponseWriter {
    stream: Arc<Mutex<OwnedWriteHalf>>,
    peer: SocketAddr,
}

#[async_trait]
impl ResponseWriter for TcpResponseWriter {
    async fn write_message(&mut self, response: &Message) -> Result<(), DomainError> {
        let bytes = encode(response)?;
        let len = u16::try_from(bytes.len()).map_err(|_| {
            DomainError::WriteFailed(format!("response of {} bytes exceeds TCP frame", bytes.len()))
        })?;

        let mut frame = Vec::with_capacity(bytes.len() + 2);
        frame.extend_from_slice(&len.to_be_bytes());
        frame.extend_from_slice(&bytes);

        let mut stream = self.stream.lock().await;
        stream
            .write_all(&frame)
            .await
            .map_err(|e| DomainError::WriteFailed(format!("TCP write to {}: {}", self.peer, e)))
    }
}

/// Accepts connections until `shutdown` is cancelled. Connections idle for
/// longer than `idle_timeout` are closed.
pub async fn serve_tcp(
    listener: TcpListener,
    handler: Arc<HandleDnsQueryUseCase>,
    idle_timeout: Duration,
    shutdown: CancellationToken,
) {
    let local = listener.local_addr().ok();

    loop {
        let (stream, peer) = tokio::select! {
            _ = shutdown.cancelled() => break,
            result = listener.accept() => match result {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!(error = %e, "TCP accept error");
                    continue;
                }
            },
        };

        let handler = Arc::clone(&handler);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            serve_connection(stream, peer, handler, idle_timeout, shutdown).await;
        });
    }

    info!(local = ?local, "TCP listener stopped");
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    handler: Arc<HandleDnsQueryUseCase>,
    idle_timeout: Duration,
    shutdown: CancellationToken,
) {
    let (mut reader, writer) = stream.into_split();
    let writer = TcpResponseWriter {
        stream: Arc::new(Mutex::new(writer)),
        peer,
    };

    loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => break,
            frame = tokio::time::timeout(idle_timeout, read_frame(&mut reader)) => frame,
        };

        let query = match frame {
            Ok(Ok(Some(query))) => query,
            Ok(Ok(None)) => break,
            Ok(Err(e)) => {
                debug!(peer = %peer, error = %e, "TCP read error");
                break;
            }
            Err(_) => {
                debug!(peer = %peer, "Closing idle TCP connection");
                break;
            }
        };

        let handler = Arc::clone(&handler);
        let mut writer = writer.clone();
        tokio::spawn(async move {
            handler.handle_wire(&query, &mut writer).await;
        });
    }
}

/// Reads one length-prefixed message. `Ok(None)` on a clean close before
/// the next frame starts.
async fn read_frame(reader: &mut OwnedReadHalf) -> std::io::Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 2];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let len = u16::from_be_bytes(len_buf) as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(Some(buf))
}
