use rustls::pki_types::ServerName;
use std::net::SocketAddr;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use strata_dns_domain::ResolveError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tracing::debug;

/// Maximum UDP DNS response size with EDNS(0).
const MAX_UDP_RESPONSE_SIZE: usize = 4096;

static TLS_CONFIG: LazyLock<Arc<rustls::ClientConfig>> = LazyLock::new(|| {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    Arc::new(
        rustls::ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth(),
    )
});

pub async fn exchange_udp(
    server: SocketAddr,
    query: &[u8],
    budget: Duration,
) -> Result<Vec<u8>, ResolveError> {
    let bind_addr: SocketAddr = if server.is_ipv4() {
        ([0, 0, 0, 0], 0).into()
    } else {
        (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = UdpSocket::bind(bind_addr)
        .await
        .map_err(|e| ResolveError::UpstreamNetwork(format!("udp bind: {}", e)))?;

    tokio::time::timeout(budget, async {
        socket
            .send_to(query, server)
            .await
            .map_err(|e| ResolveError::UpstreamNetwork(format!("udp send to {}: {}", server, e)))?;

        let mut buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
        loop {
            let (len, from) = socket.recv_from(&mut buf).await.map_err(|e| {
                ResolveError::UpstreamNetwork(format!("udp recv from {}: {}", server, e))
            })?;
            if from.ip() != server.ip() {
                debug!(expected = %server, received_from = %from, "UDP response from unexpected source");
                continue;
            }
            buf.truncate(len);
            return Ok(buf);
        }
    })
    .await
    .map_err(|_| ResolveError::UpstreamTimeout(budget))?
}

pub async fn exchange_tcp(
    server: SocketAddr,
    query: &[u8],
    budget: Duration,
) -> Result<Vec<u8>, ResolveError> {
    tokio::time::timeout(budget, async {
        let stream = TcpStream::connect(server)
            .await
            .map_err(|e| ResolveError::UpstreamNetwork(format!("tcp connect {}: {}", server, e)))?;
        exchange_stream(stream, query, server).await
    })
    .await
    .map_err(|_| ResolveError::UpstreamTimeout(budget))?
}

pub async fn exchange_tls(
    server: SocketAddr,
    server_name: &str,
    query: &[u8],
    budget: Duration,
) -> Result<Vec<u8>, ResolveError> {
    let name = ServerName::try_from(server_name.to_string())
        .map_err(|e| ResolveError::UpstreamNetwork(format!("tls name '{}': {}", server_name, e)))?;

    tokio::time::timeout(budget, async {
        let tcp = TcpStream::connect(server)
            .await
            .map_err(|e| ResolveError::UpstreamNetwork(format!("tls connect {}: {}", server, e)))?;
        let connector = tokio_rustls::TlsConnector::from(Arc::clone(&TLS_CONFIG));
        let stream = connector
            .connect(name, tcp)
            .await
            .map_err(|e| ResolveError::UpstreamNetwork(format!("tls handshake {}: {}", server, e)))?;
        exchange_stream(stream, query, server).await
    })
    .await
    .map_err(|_| ResolveError::UpstreamTimeout(budget))?
}

/// Length-prefixed exchange shared by TCP and TLS.
async fn exchange_stream<S>(
    mut stream: S,
    query: &[u8],
    server: SocketAddr,
) -> Result<Vec<u8>, ResolveError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let len = u16::try_from(query.len())
        .map_err(|_| ResolveError::ClientError("query exceeds 65535 bytes".into()))?;
    let mut framed = Vec::with_capacity(2 + query.len());
    framed.extend_from_slice(&len.to_be_bytes());
    framed.extend_from_slice(query);

    stream
        .write_all(&framed)
        .await
        .map_err(|e| ResolveError::UpstreamNetwork(format!("write to {}: {}", server, e)))?;

    let mut len_buf = [0u8; 2];
    stream
        .read_exact(&mut len_buf)
        .await
        .map_err(|e| ResolveError::UpstreamNetwork(format!("read from {}: {}", server, e)))?;
    let response_len = u16::from_be_bytes(len_buf) as usize;

    let mut response = vec![0u8; response_len];
    stream
        .read_exact(&mut response)
        .await
        .map_err(|e| ResolveError::UpstreamNetwork(format!("read from {}: {}", server, e)))?;
    Ok(response)
}
