//! The authenticated per-identity duplex channel contract.
//!
//! Pumps and the registry work against [`TunnelChannel`] so that any protocol
//! engine that authenticates peers by identity can plug into them.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use wire::Identity;

use crate::error::TunnelResult;

/// Destination for IPv6 datagrams leaving a tunnel towards the local network.
pub trait PacketSink: Send + Sync {
    /// Writes one complete IPv6 datagram.
    fn write_datagram(&self, datagram: &[u8]) -> io::Result<()>;
}

pub type SharedSink = Arc<dyn PacketSink>;

/// Outcome of one inbound packet.
pub enum ForwardAction<'a> {
    NoAction,
    /// Write `payload` to `sink`, the sink recorded when the packet arrived.
    Deliver {
        payload: &'a [u8],
        sink: SharedSink,
    },
}

impl ForwardAction<'_> {
    #[must_use]
    pub const fn is_deliver(&self) -> bool {
        matches!(self, Self::Deliver { .. })
    }
}

impl fmt::Debug for ForwardAction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAction => f.write_str("NoAction"),
            Self::Deliver { payload, .. } => f
                .debug_struct("Deliver")
                .field("payload_len", &payload.len())
                .finish_non_exhaustive(),
        }
    }
}

/// A packet ready to be sent to a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub bytes: Vec<u8>,
    pub peer: SocketAddr,
}

/// An authenticated duplex channel to one remote identity.
pub trait TunnelChannel: Send + Sync {
    fn identity(&self) -> Identity;

    /// Peer address while connected.
    fn peer_addr(&self) -> Option<SocketAddr>;

    /// Connection state; may close the channel as a side effect when the
    /// peer has gone silent.
    fn is_connected(&self) -> bool;

    fn connect(&self, sink: SharedSink, peer: SocketAddr) -> TunnelResult<()>;

    /// Atomically closes and connects to a new peer.
    fn reconnect(&self, sink: SharedSink, peer: SocketAddr) -> TunnelResult<()>;

    /// Idempotent.
    fn close(&self);

    fn receive_inbound<'a>(&self, packet: &'a [u8]) -> TunnelResult<ForwardAction<'a>>;

    fn send_outbound(&self, datagram: &[u8]) -> TunnelResult<Outbound>;
}
