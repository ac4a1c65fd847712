//! Error types for session and registry operations.

use std::fmt;

use wire::Identity;

/// Result type for tunnel operations.
pub type TunnelResult<T> = Result<T, TunnelError>;

/// Errors surfaced to the owner of a session.
///
/// Malformed or unauthenticated packets are never reported here; they are
/// counted and dropped inside the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TunnelError {
    /// The session has no peer; it was never connected or has been closed.
    NotConnected { identity: Identity },

    /// `connect` was called on a connected session.
    AlreadyConnected { identity: Identity },

    /// Inbound buffer cannot even hold a packet header.
    PacketTooShort { actual: usize, required: usize },

    /// Outbound datagram exceeds the tunnel MTU.
    PayloadTooLarge { actual: usize, mtu: usize },

    /// Tunnel record cannot back a session.
    InvalidConfig {
        tunnel_id: String,
        reason: ConfigReason,
    },
}

/// Why a tunnel record was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigReason {
    /// User or administrator disabled the tunnel.
    Disabled,
    ZeroMtu,
    EmptyPassword,
    /// The record has no PoP IPv4 address bound.
    MissingIpv4Pop,
}

impl fmt::Display for TunnelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected { identity } => {
                write!(f, "tunnel {identity} is not connected")
            }
            Self::AlreadyConnected { identity } => {
                write!(f, "tunnel {identity} is already connected")
            }
            Self::PacketTooShort { actual, required } => {
                write!(
                    f,
                    "packet too short: {actual} bytes, at least {required} required"
                )
            }
            Self::PayloadTooLarge { actual, mtu } => {
                write!(f, "payload of {actual} bytes exceeds tunnel mtu {mtu}")
            }
            Self::InvalidConfig { tunnel_id, reason } => {
                write!(f, "tunnel {tunnel_id} cannot be used: {reason}")
            }
        }
    }
}

impl fmt::Display for ConfigReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "tunnel is disabled"),
            Self::ZeroMtu => write!(f, "mtu is zero"),
            Self::EmptyPassword => write!(f, "password is empty"),
            Self::MissingIpv4Pop => write!(f, "no PoP IPv4 address"),
        }
    }
}

impl std::error::Error for TunnelError {}

impl TunnelError {
    /// Whether the error reflects the session's connection state rather than
    /// bad input.
    #[must_use]
    pub const fn is_state_error(&self) -> bool {
        matches!(
            self,
            Self::NotConnected { .. } | Self::AlreadyConnected { .. }
        )
    }
}
