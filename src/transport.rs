//! Datagram transport abstraction (C10). The client and server talk to this
//! trait rather than to `tokio::net::UdpSocket` directly, the way the
//! teacher's server abstracts delivery behind `RadiusServerHandler` — it
//! keeps the retry/blacklist/identifier machinery testable without a real
//! socket.

use std::net::SocketAddr;

use async_trait::async_trait;
use socket2::{Domain, Socket, Type};
use tokio::net::UdpSocket;

use crate::error::Error;

/// Send and receive RADIUS datagrams. Implementations are expected to be
/// cheaply cloneable handles (an `Arc` around a socket, typically) since
/// both the client's send loop and any receive loop hold one.
#[async_trait]
pub trait DatagramTransport: Send + Sync {
    async fn send_to(&self, destination: SocketAddr, data: &[u8]) -> Result<(), Error>;
    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), Error>;
    fn local_addr(&self) -> Result<SocketAddr, Error>;
}

/// The production transport: one UDP socket, receive buffers tuned up the
/// way the teacher's `Server::bind` does for a server fielding many
/// concurrent requests.
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Bind a UDP socket at `addr` with 1 MiB send/recv buffers.
    pub async fn bind(addr: SocketAddr) -> Result<Self, Error> {
        let domain = if addr.is_ipv6() { Domain::IPV6 } else { Domain::IPV4 };
        let socket = Socket::new(domain, Type::DGRAM, None).map_err(|e| Error::Transport(e.to_string()))?;
        socket.set_nonblocking(true).map_err(|e| Error::Transport(e.to_string()))?;
        socket.set_recv_buffer_size(1024 * 1024).map_err(|e| Error::Transport(e.to_string()))?;
        socket.set_send_buffer_size(1024 * 1024).map_err(|e| Error::Transport(e.to_string()))?;
        socket.bind(&addr.into()).map_err(|e| Error::Transport(e.to_string()))?;

        let std_socket: std::net::UdpSocket = socket.into();
        let socket = UdpSocket::from_std(std_socket).map_err(|e| Error::Transport(e.to_string()))?;
        Ok(Self { socket })
    }

    /// Wrap an already-bound tokio socket (used by tests that don't need
    /// the buffer tuning `bind` performs).
    pub fn from_socket(socket: UdpSocket) -> Self {
        Self { socket }
    }
}

#[async_trait]
impl DatagramTransport for UdpTransport {
    async fn send_to(&self, destination: SocketAddr, data: &[u8]) -> Result<(), Error> {
        self.socket.send_to(data, destination).await?;
        Ok(())
    }

    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), Error> {
        Ok(self.socket.recv_from(buf).await?)
    }

    fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.socket.local_addr()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn two_bound_transports_exchange_a_datagram() {
        let a = UdpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let b = UdpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let b_addr = b.local_addr().unwrap();

        a.send_to(b_addr, b"hello").await.unwrap();
        let mut buf = [0u8; 16];
        let (len, from) = b.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"hello");
        assert_eq!(from, a.local_addr().unwrap());
    }
}
