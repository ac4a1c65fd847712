//! Tunnel records supplied by the directory.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use wire::{Identity, SharedKey};

use crate::error::{ConfigReason, TunnelError, TunnelResult};

/// User or administrator state of a tunnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TunnelState {
    #[default]
    Enabled,
    Disabled,
}

/// Configuration of one tunnel.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TunnelConfig {
    pub tunnel_id: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub tunnel_name: String,
    /// Client endpoint; also the tunnel's identity.
    pub ipv6_endpoint: Ipv6Addr,
    /// Server side of the tunnel.
    pub ipv6_pop: Ipv6Addr,
    #[cfg_attr(feature = "serde", serde(default = "default_prefix_length"))]
    pub prefix_length: u8,
    #[cfg_attr(feature = "serde", serde(default))]
    pub pop_name: String,
    /// Bound to the listening socket on load; not stored in the directory.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing))]
    pub ipv4_pop: Option<Ipv4Addr>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub user_state: TunnelState,
    #[cfg_attr(feature = "serde", serde(default))]
    pub admin_state: TunnelState,
    pub password: String,
    /// Seconds between heartbeats.
    pub heartbeat_interval: u32,
    pub mtu: u16,
}

#[cfg(feature = "serde")]
const fn default_prefix_length() -> u8 {
    64
}

impl TunnelConfig {
    /// Creates an enabled tunnel record with a 60 second heartbeat and 1280
    /// byte MTU.
    #[must_use]
    pub fn new(
        tunnel_id: impl Into<String>,
        ipv6_endpoint: Ipv6Addr,
        ipv6_pop: Ipv6Addr,
        password: impl Into<String>,
    ) -> Self {
        Self {
            tunnel_id: tunnel_id.into(),
            tunnel_name: String::new(),
            ipv6_endpoint,
            ipv6_pop,
            prefix_length: 64,
            pop_name: String::new(),
            ipv4_pop: None,
            user_state: TunnelState::Enabled,
            admin_state: TunnelState::Enabled,
            password: password.into(),
            heartbeat_interval: 60,
            mtu: 1280,
        }
    }

    /// Enabled only when both the user and the administrator enabled it.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.user_state == TunnelState::Enabled && self.admin_state == TunnelState::Enabled
    }

    /// Checks that the record can back a session.
    pub fn validate(&self) -> TunnelResult<()> {
        let reason = if !self.is_enabled() {
            Some(ConfigReason::Disabled)
        } else if self.mtu == 0 {
            Some(ConfigReason::ZeroMtu)
        } else if self.password.is_empty() {
            Some(ConfigReason::EmptyPassword)
        } else if self.ipv4_pop.is_none() {
            Some(ConfigReason::MissingIpv4Pop)
        } else {
            None
        };
        match reason {
            Some(reason) => Err(TunnelError::InvalidConfig {
                tunnel_id: self.tunnel_id.clone(),
                reason,
            }),
            None => Ok(()),
        }
    }

    #[must_use]
    pub fn remote_identity(&self) -> Identity {
        Identity::from(self.ipv6_endpoint)
    }

    #[must_use]
    pub fn pop_identity(&self) -> Identity {
        Identity::from(self.ipv6_pop)
    }

    #[must_use]
    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(u64::from(self.heartbeat_interval))
    }

    #[must_use]
    pub fn shared_key(&self) -> SharedKey {
        SharedKey::derive(&self.password)
    }
}
