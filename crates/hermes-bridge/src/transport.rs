use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use tokio::net::UdpSocket;

use crate::config::ReplySocket;

/// Datagram transport the bridge loop receives requests from and answers through.
pub trait Transport {
    /// Waits for one datagram; returns its length in `buf` and the sender.
    fn recv_from(
        &self,
        buf: &mut [u8],
    ) -> impl Future<Output = io::Result<(usize, SocketAddr)>> + Send;

    /// Sends `bytes` as one datagram to `peer`.
    fn send_to(
        &self,
        bytes: &[u8],
        peer: SocketAddr,
    ) -> impl Future<Output = io::Result<usize>> + Send;
}

/// UDP transport bound to the bridge's listening address.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    reply_socket: ReplySocket,
}

impl UdpTransport {
    pub async fn bind(addr: SocketAddr, reply_socket: ReplySocket) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self {
            socket,
            reply_socket,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl Transport for UdpTransport {
    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.socket.recv_from(buf).await
    }

    async fn send_to(&self, bytes: &[u8], peer: SocketAddr) -> io::Result<usize> {
        match self.reply_socket {
            ReplySocket::Listener => self.socket.send_to(bytes, peer).await,
            ReplySocket::Ephemeral => {
                let local = match peer {
                    SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
                    SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
                };
                let socket = UdpSocket::bind(local).await?;
                socket.send_to(bytes, peer).await
            }
        }
    }
}
