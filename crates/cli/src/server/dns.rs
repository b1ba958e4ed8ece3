use hickory_server::ServerFuture;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use strata_dns_domain::config::ServerConfig;
use strata_dns_infrastructure::dns::server::DnsServerHandler;
use tokio::net::{TcpListener, UdpSocket};
use tracing::info;

pub async fn start_dns_server(
    config: &ServerConfig,
    handler: DnsServerHandler,
) -> anyhow::Result<()> {
    let socket_addr: SocketAddr = config.listen.parse()?;

    info!(bind_address = %socket_addr, udp = config.udp, tcp = config.tcp, "Starting DNS server");

    let mut server = ServerFuture::new(handler);

    if config.udp {
        let domain = if socket_addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };
        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        #[cfg(unix)]
        socket.set_reuse_port(true)?;

        // Default UDP buffers (~256KB) drop bursts; DNS wants several MB.
        socket.set_recv_buffer_size(8 * 1024 * 1024)?;
        socket.set_send_buffer_size(4 * 1024 * 1024)?;

        socket.bind(&socket_addr.into())?;
        socket.set_nonblocking(true)?;

        let std_socket: std::net::UdpSocket = socket.into();
        let udp_socket = UdpSocket::from_std(std_socket)?;
        server.register_socket(udp_socket);
    }

    if config.tcp {
        let tcp_listener = TcpListener::bind(socket_addr).await?;
        server.register_listener(tcp_listener, std::time::Duration::from_secs(10));
    }

    info!("DNS server ready");
    server.block_until_done().await?;
    Ok(())
}
