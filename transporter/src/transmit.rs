use std::io;
use std::net::{SocketAddr, UdpSocket};

/// Sends datagrams to arbitrary peers from one local address.
pub trait Transmit: Send + Sync {
    fn send_to(&self, bytes: &[u8], peer: SocketAddr) -> io::Result<usize>;
}

impl Transmit for UdpSocket {
    fn send_to(&self, bytes: &[u8], peer: SocketAddr) -> io::Result<usize> {
        Self::send_to(self, bytes, peer)
    }
}
