//! Identity-keyed registry of tunnel channels.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;
use wire::Identity;

use crate::channel::{SharedSink, TunnelChannel};
use crate::error::TunnelResult;

/// Maps each tunnel identity to its channel.
///
/// Mutations lock only the entry's shard; lookups from the pumps never wait
/// on unrelated identities.
pub struct Registry<C> {
    channels: DashMap<Identity, Arc<C>>,
}

impl<C: TunnelChannel> Registry<C> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Maps the channel's identity to it and connects it to `peer`.
    ///
    /// A different channel previously mapped to the identity is closed first
    /// and returned. An already connected channel is reconnected.
    pub fn install_or_replace(
        &self,
        channel: Arc<C>,
        sink: SharedSink,
        peer: SocketAddr,
    ) -> TunnelResult<Option<Arc<C>>> {
        let identity = channel.identity();
        match self.channels.entry(identity) {
            Entry::Occupied(mut entry) => {
                let previous = entry.insert(Arc::clone(&channel));
                let replaced = if Arc::ptr_eq(&previous, &channel) {
                    None
                } else {
                    previous.close();
                    Some(previous)
                };
                attach(&*channel, sink, peer)?;
                Ok(replaced)
            }
            Entry::Vacant(entry) => {
                let _guard = entry.insert(Arc::clone(&channel));
                attach(&*channel, sink, peer)?;
                Ok(None)
            }
        }
    }

    /// Maps the channel without connecting it; a different channel
    /// previously mapped is closed and returned.
    pub fn install(&self, channel: Arc<C>) -> Option<Arc<C>> {
        let identity = channel.identity();
        let previous = self.channels.insert(identity, Arc::clone(&channel))?;
        if Arc::ptr_eq(&previous, &channel) {
            return None;
        }
        previous.close();
        Some(previous)
    }

    #[must_use]
    pub fn lookup(&self, identity: &Identity) -> Option<Arc<C>> {
        self.channels
            .get(identity)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Unmaps and closes the channel for `identity`.
    pub fn remove(&self, identity: &Identity) -> Option<Arc<C>> {
        let (_, channel) = self.channels.remove(identity)?;
        channel.close();
        Some(channel)
    }

    /// Channels mapped at the time of the call.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<C>> {
        self.channels
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Visits a snapshot; `f` may freely mutate the registry.
    pub fn for_each(&self, mut f: impl FnMut(&C)) {
        for channel in self.snapshot() {
            f(&channel);
        }
    }

    /// Replaces the whole mapping with `channels`.
    ///
    /// Each identity is swapped in place, so lookups keep resolving while the
    /// reload runs; identities absent from `channels` are removed afterwards.
    /// Every channel displaced is closed. When two channels share an identity
    /// the later one wins. Returns the number of identities installed.
    pub fn replace_all(&self, channels: impl IntoIterator<Item = Arc<C>>) -> usize {
        let mut installed = HashSet::new();
        for channel in channels {
            let identity = channel.identity();
            self.install(channel);
            if !installed.insert(identity) {
                debug!(tunnel = %identity, "duplicate identity in reload, later record wins");
            }
        }

        let stale: Vec<Identity> = self
            .channels
            .iter()
            .map(|entry| *entry.key())
            .filter(|identity| !installed.contains(identity))
            .collect();
        for identity in &stale {
            self.remove(identity);
        }
        debug!(installed = installed.len(), removed = stale.len(), "registry replaced");
        installed.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Number of connected channels; applies each channel's liveness check.
    #[must_use]
    pub fn connected_count(&self) -> usize {
        self.snapshot()
            .iter()
            .filter(|channel| channel.is_connected())
            .count()
    }
}

impl<C: TunnelChannel> Default for Registry<C> {
    fn default() -> Self {
        Self::new()
    }
}

fn attach<C: TunnelChannel + ?Sized>(
    channel: &C,
    sink: SharedSink,
    peer: SocketAddr,
) -> TunnelResult<()> {
    if channel.is_connected() {
        channel.reconnect(sink, peer)
    } else {
        channel.connect(sink, peer)
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::net::Ipv4Addr;

    use parking_lot::Mutex;

    use super::*;
    use crate::channel::{ForwardAction, Outbound, PacketSink};
    use crate::error::TunnelError;

    /// Minimal channel tracking connection state only.
    struct FakeChannel {
        identity: Identity,
        peer: Mutex<Option<SocketAddr>>,
    }

    impl FakeChannel {
        fn new(last: u8) -> Arc<Self> {
            let mut bytes = [0u8; 16];
            bytes[0] = 0x20;
            bytes[15] = last;
            Arc::new(Self {
                identity: Identity::new(bytes),
                peer: Mutex::new(None),
            })
        }
    }

    impl TunnelChannel for FakeChannel {
        fn identity(&self) -> Identity {
            self.identity
        }

        fn peer_addr(&self) -> Option<SocketAddr> {
            *self.peer.lock()
        }

        fn is_connected(&self) -> bool {
            self.peer.lock().is_some()
        }

        fn connect(&self, _sink: SharedSink, peer: SocketAddr) -> TunnelResult<()> {
            let mut current = self.peer.lock();
            if current.is_some() {
                return Err(TunnelError::AlreadyConnected {
                    identity: self.identity,
                });
            }
            *current = Some(peer);
            Ok(())
        }

        fn reconnect(&self, _sink: SharedSink, peer: SocketAddr) -> TunnelResult<()> {
            let mut current = self.peer.lock();
            if current.is_none() {
                return Err(TunnelError::NotConnected {
                    identity: self.identity,
                });
            }
            *current = Some(peer);
            Ok(())
        }

        fn close(&self) {
            *self.peer.lock() = None;
        }

        fn receive_inbound<'a>(&self, _packet: &'a [u8]) -> TunnelResult<ForwardAction<'a>> {
            Ok(ForwardAction::NoAction)
        }

        fn send_outbound(&self, datagram: &[u8]) -> TunnelResult<Outbound> {
            let peer = self.peer_addr().ok_or(TunnelError::NotConnected {
                identity: self.identity,
            })?;
            Ok(Outbound {
                bytes: datagram.to_vec(),
                peer,
            })
        }
    }

    struct NullSink;

    impl PacketSink for NullSink {
        fn write_datagram(&self, _datagram: &[u8]) -> io::Result<()> {
            Ok(())
        }
    }

    fn sink() -> SharedSink {
        Arc::new(NullSink)
    }

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, port))
    }

    #[test]
    fn install_or_replace_connects() {
        let registry = Registry::new();
        let channel = FakeChannel::new(1);
        let replaced = registry
            .install_or_replace(Arc::clone(&channel), sink(), addr(10))
            .unwrap();
        assert!(replaced.is_none());
        assert_eq!(channel.peer_addr(), Some(addr(10)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn reinstalling_same_channel_reconnects() {
        let registry = Registry::new();
        let channel = FakeChannel::new(1);
        registry
            .install_or_replace(Arc::clone(&channel), sink(), addr(10))
            .unwrap();
        let replaced = registry
            .install_or_replace(Arc::clone(&channel), sink(), addr(11))
            .unwrap();
        assert!(replaced.is_none());
        assert_eq!(channel.peer_addr(), Some(addr(11)));
    }

    #[test]
    fn remove_closes() {
        let registry = Registry::new();
        let channel = FakeChannel::new(1);
        registry
            .install_or_replace(Arc::clone(&channel), sink(), addr(10))
            .unwrap();
        let removed = registry.remove(&channel.identity()).unwrap();
        assert!(Arc::ptr_eq(&removed, &channel));
        assert!(!channel.is_connected());
        assert!(registry.is_empty());
        assert!(registry.remove(&channel.identity()).is_none());
    }

    #[test]
    fn for_each_tolerates_mutation() {
        let registry = Registry::new();
        for last in 1..=4 {
            registry.install(FakeChannel::new(last));
        }
        let mut visited = 0;
        registry.for_each(|channel| {
            registry.remove(&channel.identity());
            visited += 1;
        });
        assert_eq!(visited, 4);
        assert!(registry.is_empty());
    }

    #[test]
    fn replace_all_closes_old_channels() {
        let registry = Registry::new();
        let old = FakeChannel::new(1);
        registry
            .install_or_replace(Arc::clone(&old), sink(), addr(10))
            .unwrap();

        let installed = registry.replace_all(vec![FakeChannel::new(2), FakeChannel::new(3)]);
        assert_eq!(installed, 2);
        assert_eq!(registry.len(), 2);
        assert!(!old.is_connected());
        assert!(registry.lookup(&old.identity()).is_none());
        assert_eq!(registry.connected_count(), 0);
    }

    #[test]
    fn replace_all_counts_duplicate_identity_once() {
        let registry = Registry::new();
        let first = FakeChannel::new(7);
        let second = FakeChannel::new(7);

        let installed = registry.replace_all(vec![Arc::clone(&first), Arc::clone(&second)]);
        assert_eq!(installed, 1);
        assert_eq!(installed, registry.len());
        assert!(Arc::ptr_eq(&registry.lookup(&second.identity()).unwrap(), &second));
    }

    #[test]
    fn replace_all_swaps_retained_identity_in_place() {
        let registry = Registry::new();
        let kept = FakeChannel::new(1);
        let dropped = FakeChannel::new(2);
        registry
            .install_or_replace(Arc::clone(&kept), sink(), addr(10))
            .unwrap();
        registry
            .install_or_replace(Arc::clone(&dropped), sink(), addr(11))
            .unwrap();

        let fresh = FakeChannel::new(1);
        let mut seen_during_reload = Vec::new();
        let reload = vec![Arc::clone(&fresh), FakeChannel::new(3)]
            .into_iter()
            .inspect(|_| seen_during_reload.push(registry.lookup(&kept.identity()).is_some()));
        let installed = registry.replace_all(reload);

        assert_eq!(installed, 2);
        assert_eq!(seen_during_reload, vec![true, true]);
        assert!(Arc::ptr_eq(&registry.lookup(&kept.identity()).unwrap(), &fresh));
        assert!(!kept.is_connected());
        assert!(!dropped.is_connected());
        assert!(registry.lookup(&dropped.identity()).is_none());
        assert_eq!(registry.len(), 2);
    }
}
