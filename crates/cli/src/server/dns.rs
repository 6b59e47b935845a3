use dohproxy_application::use_cases::HandleDnsQueryUseCase;
use dohproxy_infrastructure::dns::server::{serve_tcp, serve_udp};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, UdpSocket};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::info;

const SOCKET_BUFFER_SIZE: usize = 512 * 1024;
const TCP_BACKLOG: i32 = 1024;

/// Binds UDP and TCP on the same address and runs both listeners until
/// `shutdown` fires.
pub async fn start_dns_server(
    socket_addr: SocketAddr,
    handler: Arc<HandleDnsQueryUseCase>,
    tcp_idle_timeout: Duration,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let domain = if socket_addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let udp_socket = Arc::new(create_udp_socket(domain, socket_addr)?);
    let tcp_listener = create_tcp_listener(domain, socket_addr)?;

    let mut join_set: JoinSet<()> = JoinSet::new();
    join_set.spawn(serve_udp(udp_socket, handler.clone(), shutdown.clone()));
    join_set.spawn(serve_tcp(tcp_listener, handler, tcp_idle_timeout, shutdown));

    info!(bind_address = %socket_addr, "DNS server ready (udp+tcp)");

    while join_set.join_next().await.is_some() {}
    Ok(())
}

fn create_udp_socket(domain: Domain, socket_addr: SocketAddr) -> anyhow::Result<UdpSocket> {
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    if socket_addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }
    socket.set_reuse_address(true)?;
    socket.set_recv_buffer_size(SOCKET_BUFFER_SIZE)?;
    socket.set_send_buffer_size(SOCKET_BUFFER_SIZE)?;
    socket.bind(&socket_addr.into())?;
    socket.set_nonblocking(true)?;
    let std_socket: std::net::UdpSocket = socket.into();
    Ok(UdpSocket::from_std(std_socket)?)
}

fn create_tcp_listener(domain: Domain, socket_addr: SocketAddr) -> anyhow::Result<TcpListener> {
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    if socket_addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }
    socket.set_reuse_address(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(TCP_BACKLOG)?;
    socket.set_nonblocking(true)?;
    let std_listener: std::net::TcpListener = socket.into();
    Ok(TcpListener::from_std(std_listener)?)
}
