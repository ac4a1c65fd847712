//! Tunnel identity: the 16-byte IPv6 address naming one tunnel.

use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;

use crate::header::IDENTITY_LEN;

/// Canonical fixed-width identity of a tunnel endpoint.
///
/// The same bytes appear in the packet header, in the IPv6 datagrams routed
/// through the tunnel and as the registry key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Identity([u8; IDENTITY_LEN]);

impl Identity {
    /// The all-zero identity (`::`).
    pub const UNSPECIFIED: Self = Self([0; IDENTITY_LEN]);

    /// Creates an identity from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self(bytes)
    }

    /// Reads an identity from the first 16 bytes of `bytes`.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let raw: [u8; IDENTITY_LEN] = bytes.get(..IDENTITY_LEN)?.try_into().ok()?;
        Some(Self(raw))
    }

    /// Returns the raw identity bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; IDENTITY_LEN] {
        &self.0
    }

    /// Returns the identity as an IPv6 address.
    #[must_use]
    pub fn to_ipv6(self) -> Ipv6Addr {
        Ipv6Addr::from(self.0)
    }
}

impl From<[u8; IDENTITY_LEN]> for Identity {
    fn from(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self(bytes)
    }
}

impl From<Ipv6Addr> for Identity {
    fn from(addr: Ipv6Addr) -> Self {
        Self(addr.octets())
    }
}

impl From<Identity> for Ipv6Addr {
    fn from(identity: Identity) -> Self {
        Self::from(identity.0)
    }
}

impl FromStr for Identity {
    type Err = std::net::AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<Ipv6Addr>().map(Self::from)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Ipv6Addr::from(self.0), f)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({self})")
    }
}
