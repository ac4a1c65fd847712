//! Local network to UDP.

use std::io::{self, ErrorKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};
use tunnel::{Registry, SharedSink, TunnelChannel};
use wire::{ipv6_destination, split_datagrams, Limits};

use crate::local::PacketSource;
use crate::stats::{bump, PumpStats};
use crate::transmit::Transmit;

/// Wraps local IPv6 datagrams into tunnel packets for their destination.
pub struct OutboundPump<C> {
    registry: Arc<Registry<C>>,
    socket: Arc<dyn Transmit>,
    unhandled: Option<SharedSink>,
    stats: Arc<PumpStats>,
}

impl<C: TunnelChannel> OutboundPump<C> {
    pub fn new(
        registry: Arc<Registry<C>>,
        socket: Arc<dyn Transmit>,
        stats: Arc<PumpStats>,
    ) -> Self {
        Self {
            registry,
            socket,
            unhandled: None,
            stats,
        }
    }

    /// Passes datagrams without a tunnel to `sink` instead of dropping them.
    #[must_use]
    pub fn with_unhandled(mut self, sink: SharedSink) -> Self {
        self.unhandled = Some(sink);
        self
    }

    /// Handles one read from the local source.
    pub fn handle_read(&self, bytes: &[u8]) {
        let datagrams = match split_datagrams(bytes) {
            Ok(datagrams) => datagrams,
            Err(err) => {
                debug!(error = %err, len = bytes.len(), "dropping unframed local read");
                bump(&self.stats.framing_errors);
                return;
            }
        };
        for datagram in datagrams {
            self.route(datagram);
        }
    }

    fn route(&self, datagram: &[u8]) {
        let channel = ipv6_destination(datagram)
            .and_then(|destination| self.registry.lookup(&destination))
            .filter(|channel| channel.is_connected());
        let Some(channel) = channel else {
            self.pass_unhandled(datagram);
            return;
        };

        match channel.send_outbound(datagram) {
            Ok(outbound) => match self.socket.send_to(&outbound.bytes, outbound.peer) {
                Ok(_) => bump(&self.stats.sent),
                Err(err) => {
                    warn!(peer = %outbound.peer, error = %err, "udp send failed");
                    bump(&self.stats.send_errors);
                }
            },
            Err(err) => self.stats.refused(channel.identity(), &err, "send"),
        }
    }

    fn pass_unhandled(&self, datagram: &[u8]) {
        let Some(sink) = &self.unhandled else {
            bump(&self.stats.no_route_drops);
            return;
        };
        match sink.write_datagram(datagram) {
            Ok(()) => bump(&self.stats.passed_unhandled),
            Err(err) => {
                warn!(error = %err, "pass-through write failed");
                bump(&self.stats.sink_errors);
            }
        }
    }

    /// Reads from `source` until it is exhausted or `shutdown` is set.
    ///
    /// Read errors other than interruptions end the pump.
    pub fn run(&self, source: &mut dyn PacketSource, shutdown: &AtomicBool) -> io::Result<()> {
        info!("reading local datagrams");
        let mut buf = vec![0u8; Limits::default().max_packet_bytes];
        while !shutdown.load(Ordering::Relaxed) {
            let len = match source.read_datagrams(&mut buf) {
                Ok(0) => {
                    info!("local source closed");
                    return Ok(());
                }
                Ok(len) => len,
                Err(err)
                    if matches!(
                        err.kind(),
                        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                    ) =>
                {
                    continue
                }
                Err(err) => return Err(err),
            };
            self.handle_read(&buf[..len]);
        }
        Ok(())
    }
}
