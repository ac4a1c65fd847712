//! Per-tunnel session state machine.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info};
use wire::{
    encode_packet, verify_packet, Identity, Limits, OpCode, PacketHeader, SharedKey, HEADER_SIZE,
};

use crate::channel::{ForwardAction, Outbound, SharedSink, TunnelChannel};
use crate::clock::Clock;
use crate::config::TunnelConfig;
use crate::error::{TunnelError, TunnelResult};

/// Silence tolerated beyond the heartbeat interval before a session is
/// considered gone.
pub const LIVENESS_GRACE: Duration = Duration::from_secs(10);

struct Link {
    sink: SharedSink,
    peer: SocketAddr,
}

struct SessionState {
    link: Option<Link>,
    last_received: Instant,
    last_sent: Instant,
}

/// One tunnel endpoint: its key, its current peer and its liveness.
///
/// Connection state lives behind a single lock, so `connect`, `reconnect`
/// and `close` are mutually exclusive with each other and with the state
/// checks of the packet operations.
pub struct Session {
    identity: Identity,
    pop_identity: Identity,
    tunnel_id: String,
    key: SharedKey,
    mtu: usize,
    heartbeat_interval: Duration,
    limits: Limits,
    clock: Arc<dyn Clock>,
    state: Mutex<SessionState>,
    valid_packet_received: AtomicBool,
    invalid_packets: AtomicU64,
}

impl Session {
    /// Creates a disconnected session for an enabled, valid tunnel record.
    pub fn new(config: &TunnelConfig, clock: Arc<dyn Clock>) -> TunnelResult<Self> {
        config.validate()?;
        let now = clock.now();
        Ok(Self {
            identity: config.remote_identity(),
            pop_identity: config.pop_identity(),
            tunnel_id: config.tunnel_id.clone(),
            key: config.shared_key(),
            mtu: usize::from(config.mtu),
            heartbeat_interval: config.heartbeat(),
            limits: Limits::default(),
            clock,
            state: Mutex::new(SessionState {
                link: None,
                last_received: now,
                last_sent: now,
            }),
            valid_packet_received: AtomicBool::new(false),
            invalid_packets: AtomicU64::new(0),
        })
    }

    #[must_use]
    pub const fn identity(&self) -> Identity {
        self.identity
    }

    #[must_use]
    pub const fn pop_identity(&self) -> Identity {
        self.pop_identity
    }

    #[must_use]
    pub fn tunnel_id(&self) -> &str {
        &self.tunnel_id
    }

    #[must_use]
    pub const fn mtu(&self) -> usize {
        self.mtu
    }

    #[must_use]
    pub const fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    #[must_use]
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.state.lock().link.as_ref().map(|link| link.peer)
    }

    #[must_use]
    pub fn last_packet_received(&self) -> Instant {
        self.state.lock().last_received
    }

    #[must_use]
    pub fn last_packet_sent(&self) -> Instant {
        self.state.lock().last_sent
    }

    /// Whether any authentic NOOP or FORWARD packet was ever received.
    #[must_use]
    pub fn is_valid_packet_received(&self) -> bool {
        self.valid_packet_received.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn invalid_packet_count(&self) -> u64 {
        self.invalid_packets.load(Ordering::Relaxed)
    }

    /// Records the peer and resets both liveness timestamps.
    pub fn connect(&self, sink: SharedSink, peer: SocketAddr) -> TunnelResult<()> {
        let mut state = self.state.lock();
        if state.link.is_some() {
            return Err(TunnelError::AlreadyConnected {
                identity: self.identity,
            });
        }
        self.attach(&mut state, sink, peer);
        info!(tunnel = %self.identity, %peer, "tunnel connected");
        Ok(())
    }

    /// Moves a connected session to a new peer under one lock acquisition.
    pub fn reconnect(&self, sink: SharedSink, peer: SocketAddr) -> TunnelResult<()> {
        let mut state = self.state.lock();
        let previous = state
            .link
            .take()
            .ok_or(TunnelError::NotConnected {
                identity: self.identity,
            })?
            .peer;
        self.attach(&mut state, sink, peer);
        info!(tunnel = %self.identity, from = %previous, to = %peer, "tunnel reconnected");
        Ok(())
    }

    fn attach(&self, state: &mut SessionState, sink: SharedSink, peer: SocketAddr) {
        let now = self.clock.now();
        state.link = Some(Link { sink, peer });
        state.last_received = now;
        state.last_sent = now;
    }

    /// Connection state with the liveness check applied.
    ///
    /// A session silent for longer than its heartbeat interval plus
    /// [`LIVENESS_GRACE`] is closed here.
    pub fn is_connected(&self) -> bool {
        let mut state = self.state.lock();
        if state.link.is_none() {
            return false;
        }
        let silence = self
            .clock
            .now()
            .saturating_duration_since(state.last_received);
        if silence > self.heartbeat_interval + LIVENESS_GRACE {
            state.link = None;
            info!(
                tunnel = %self.identity,
                silent_secs = silence.as_secs(),
                "tunnel timed out"
            );
            return false;
        }
        true
    }

    /// Idempotent.
    pub fn close(&self) {
        if let Some(link) = self.state.lock().link.take() {
            info!(tunnel = %self.identity, peer = %link.peer, "tunnel closed");
        }
    }

    /// Validates a packet from the peer and decides what to do with it.
    ///
    /// Any packet long enough to carry a header refreshes the liveness clock,
    /// authentic or not. Packets that fail validation, and authentic packets
    /// with an opcode other than NOOP or FORWARD, only increment the invalid
    /// packet counter.
    pub fn receive_inbound<'a>(&self, packet: &'a [u8]) -> TunnelResult<ForwardAction<'a>> {
        let sink = {
            let mut state = self.state.lock();
            let sink = match &state.link {
                Some(link) => Arc::clone(&link.sink),
                None => {
                    return Err(TunnelError::NotConnected {
                        identity: self.identity,
                    })
                }
            };
            if packet.len() < HEADER_SIZE {
                return Err(TunnelError::PacketTooShort {
                    actual: packet.len(),
                    required: HEADER_SIZE,
                });
            }
            state.last_received = self.clock.now();
            sink
        };

        let verified = match verify_packet(
            packet,
            &self.key,
            &[self.identity, self.pop_identity],
            self.clock.epoch(),
            &self.limits,
        ) {
            Ok(verified) => verified,
            Err(err) => {
                debug!(tunnel = %self.identity, error = %err, "dropping invalid packet");
                self.invalid_packets.fetch_add(1, Ordering::Relaxed);
                return Ok(ForwardAction::NoAction);
            }
        };

        match verified.header.opcode {
            opcode if !opcode.is_actionable() => {
                debug!(tunnel = %self.identity, ?opcode, "dropping unhandled packet");
                self.invalid_packets.fetch_add(1, Ordering::Relaxed);
                Ok(ForwardAction::NoAction)
            }
            OpCode::Forward if verified.payload.is_empty() => {
                debug!(tunnel = %self.identity, "dropping empty forward");
                self.invalid_packets.fetch_add(1, Ordering::Relaxed);
                Ok(ForwardAction::NoAction)
            }
            OpCode::Forward => {
                self.valid_packet_received.store(true, Ordering::Relaxed);
                Ok(ForwardAction::Deliver {
                    payload: verified.payload,
                    sink,
                })
            }
            _ => {
                self.valid_packet_received.store(true, Ordering::Relaxed);
                Ok(ForwardAction::NoAction)
            }
        }
    }

    /// Wraps an IPv6 datagram into a FORWARD packet for the current peer.
    pub fn send_outbound(&self, datagram: &[u8]) -> TunnelResult<Outbound> {
        if datagram.len() > self.mtu {
            return Err(TunnelError::PayloadTooLarge {
                actual: datagram.len(),
                mtu: self.mtu,
            });
        }
        self.build(PacketHeader::forward(self.identity, self.clock.epoch()), datagram)
    }

    /// Builds a NOOP heartbeat for the current peer.
    pub fn beat(&self) -> TunnelResult<Outbound> {
        self.build(PacketHeader::heartbeat(self.identity, self.clock.epoch()), &[])
    }

    /// Whether the session is connected and nothing has been sent for a
    /// full heartbeat interval.
    #[must_use]
    pub fn heartbeat_due(&self) -> bool {
        let state = self.state.lock();
        state.link.is_some()
            && self.clock.now().saturating_duration_since(state.last_sent)
                >= self.heartbeat_interval
    }

    fn build(&self, header: PacketHeader, payload: &[u8]) -> TunnelResult<Outbound> {
        let mut state = self.state.lock();
        let peer = state
            .link
            .as_ref()
            .ok_or(TunnelError::NotConnected {
                identity: self.identity,
            })?
            .peer;
        let bytes = encode_packet(&header, &self.key, payload);
        state.last_sent = self.clock.now();
        Ok(Outbound { bytes, peer })
    }
}

impl TunnelChannel for Session {
    fn identity(&self) -> Identity {
        self.identity
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        Self::peer_addr(self)
    }

    fn is_connected(&self) -> bool {
        Self::is_connected(self)
    }

    fn connect(&self, sink: SharedSink, peer: SocketAddr) -> TunnelResult<()> {
        Self::connect(self, sink, peer)
    }

    fn reconnect(&self, sink: SharedSink, peer: SocketAddr) -> TunnelResult<()> {
        Self::reconnect(self, sink, peer)
    }

    fn close(&self) {
        Self::close(self);
    }

    fn receive_inbound<'a>(&self, packet: &'a [u8]) -> TunnelResult<ForwardAction<'a>> {
        Self::receive_inbound(self, packet)
    }

    fn send_outbound(&self, datagram: &[u8]) -> TunnelResult<Outbound> {
        Self::send_outbound(self, datagram)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .field("tunnel_id", &self.tunnel_id)
            .field("peer", &self.peer_addr())
            .field("invalid_packets", &self.invalid_packet_count())
            .finish_non_exhaustive()
    }
}
