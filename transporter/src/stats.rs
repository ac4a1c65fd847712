//! Packet counters shared by the pumps and the scheduler.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};
use tunnel::TunnelError;
use wire::Identity;

/// Live counters, updated without locking.
#[derive(Debug, Default)]
pub struct PumpStats {
    /// UDP datagrams read from the socket.
    pub received: AtomicU64,
    /// Datagrams failing the stateless header check.
    pub precheck_drops: AtomicU64,
    /// Datagrams from identities with no tunnel.
    pub unknown_tunnel_drops: AtomicU64,
    /// Payloads written to the local sink.
    pub delivered: AtomicU64,
    /// Local reads that did not split into IPv6 datagrams.
    pub framing_errors: AtomicU64,
    /// Local datagrams with no connected tunnel.
    pub no_route_drops: AtomicU64,
    /// Local datagrams handed to the pass-through sink.
    pub passed_unhandled: AtomicU64,
    /// Packets sent to peers, heartbeats included.
    pub sent: AtomicU64,
    pub heartbeats: AtomicU64,
    pub send_errors: AtomicU64,
    pub sink_errors: AtomicU64,
    /// Session calls refused because the tunnel was not, or already, connected.
    pub state_errors: AtomicU64,
    /// Session calls refused for a short packet or an oversized datagram.
    pub rejected: AtomicU64,
    pub timeouts: AtomicU64,
}

/// Point-in-time copy of [`PumpStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct StatsSnapshot {
    pub received: u64,
    pub precheck_drops: u64,
    pub unknown_tunnel_drops: u64,
    pub delivered: u64,
    pub framing_errors: u64,
    pub no_route_drops: u64,
    pub passed_unhandled: u64,
    pub sent: u64,
    pub heartbeats: u64,
    pub send_errors: u64,
    pub sink_errors: u64,
    pub state_errors: u64,
    pub rejected: u64,
    pub timeouts: u64,
}

impl PumpStats {
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        StatsSnapshot {
            received: load(&self.received),
            precheck_drops: load(&self.precheck_drops),
            unknown_tunnel_drops: load(&self.unknown_tunnel_drops),
            delivered: load(&self.delivered),
            framing_errors: load(&self.framing_errors),
            no_route_drops: load(&self.no_route_drops),
            passed_unhandled: load(&self.passed_unhandled),
            sent: load(&self.sent),
            heartbeats: load(&self.heartbeats),
            send_errors: load(&self.send_errors),
            sink_errors: load(&self.sink_errors),
            state_errors: load(&self.state_errors),
            rejected: load(&self.rejected),
            timeouts: load(&self.timeouts),
        }
    }

    /// Counts a refused session call.
    ///
    /// Connection state refusals race with timeouts and reloads and log at
    /// debug; refused input logs at warn.
    pub(crate) fn refused(&self, tunnel: Identity, err: &TunnelError, action: &'static str) {
        if err.is_state_error() {
            debug!(%tunnel, error = %err, action, "session call refused");
            bump(&self.state_errors);
        } else {
            warn!(%tunnel, error = %err, action, "session call refused");
            bump(&self.rejected);
        }
    }
}

pub(crate) fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}
