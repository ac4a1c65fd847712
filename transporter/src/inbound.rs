//! UDP to local network.

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};
use tunnel::{Clock, ForwardAction, Registry, SharedSink, TunnelChannel};
use wire::{precheck, Limits};

use crate::stats::{bump, PumpStats};

/// Reads tunnel packets from the UDP socket and delivers their payloads.
pub struct InboundPump<C> {
    registry: Arc<Registry<C>>,
    sink: SharedSink,
    clock: Arc<dyn Clock>,
    stats: Arc<PumpStats>,
}

impl<C: TunnelChannel> InboundPump<C> {
    pub fn new(
        registry: Arc<Registry<C>>,
        sink: SharedSink,
        clock: Arc<dyn Clock>,
        stats: Arc<PumpStats>,
    ) -> Self {
        Self {
            registry,
            sink,
            clock,
            stats,
        }
    }

    /// Handles one datagram received from `from`.
    ///
    /// The datagram's source becomes the tunnel's peer before the packet is
    /// authenticated, so a roaming client is followed on its first packet.
    pub fn handle_datagram(&self, bytes: &[u8], from: SocketAddr) {
        bump(&self.stats.received);
        let Some(sender) = precheck(bytes, self.clock.epoch()) else {
            bump(&self.stats.precheck_drops);
            return;
        };
        let Some(channel) = self.registry.lookup(&sender) else {
            debug!(%sender, %from, "no tunnel for sender");
            bump(&self.stats.unknown_tunnel_drops);
            return;
        };

        let attached = if !channel.is_connected() {
            channel.connect(Arc::clone(&self.sink), from)
        } else if channel.peer_addr() != Some(from) {
            channel.reconnect(Arc::clone(&self.sink), from)
        } else {
            Ok(())
        };
        if let Err(err) = attached {
            self.stats.refused(sender, &err, "attach peer");
            return;
        }

        match channel.receive_inbound(bytes) {
            Ok(ForwardAction::Deliver { payload, sink }) => match sink.write_datagram(payload) {
                Ok(()) => bump(&self.stats.delivered),
                Err(err) => {
                    warn!(tunnel = %sender, error = %err, "local sink write failed");
                    bump(&self.stats.sink_errors);
                }
            },
            Ok(ForwardAction::NoAction) => {}
            Err(err) => self.stats.refused(sender, &err, "receive"),
        }
    }

    /// Receives until `shutdown` is set.
    ///
    /// The socket needs a read timeout for the flag to be polled.
    pub fn run(&self, socket: &UdpSocket, shutdown: &AtomicBool) {
        info!("listening for tunnel packets");
        let mut buf = vec![0u8; Limits::default().max_packet_bytes];
        while !shutdown.load(Ordering::Relaxed) {
            match socket.recv_from(&mut buf) {
                Ok((len, from)) => self.handle_datagram(&buf[..len], from),
                Err(err)
                    if matches!(
                        err.kind(),
                        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                    ) => {}
                Err(err) => warn!(error = %err, "udp receive failed"),
            }
        }
        info!("inbound pump stopped");
    }
}
