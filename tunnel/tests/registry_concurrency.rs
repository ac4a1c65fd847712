use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::thread;

use tunnel::{ManualClock, PacketSink, Registry, Session, SharedSink, TunnelConfig};
use wire::Identity;

struct NullSink;

impl PacketSink for NullSink {
    fn write_datagram(&self, _datagram: &[u8]) -> io::Result<()> {
        Ok(())
    }
}

fn session(index: u16, clock: &Arc<ManualClock>) -> Arc<Session> {
    let endpoint = format!("2001:db8:{index:x}::2");
    let pop = format!("2001:db8:{index:x}::1");
    let mut config = TunnelConfig::new(
        format!("T{index}"),
        endpoint.parse().unwrap(),
        pop.parse().unwrap(),
        "pw",
    );
    config.ipv4_pop = Some(Ipv4Addr::LOCALHOST);
    Arc::new(Session::new(&config, clock.clone()).unwrap())
}

fn identity(index: u16) -> Identity {
    format!("2001:db8:{index:x}::2").parse().unwrap()
}

#[test]
fn concurrent_install_and_lookup() {
    let clock = Arc::new(ManualClock::new(1_700_000_000));
    let registry: Arc<Registry<Session>> = Arc::new(Registry::new());
    let sink: SharedSink = Arc::new(NullSink);

    let writers: Vec<_> = (0..4u16)
        .map(|worker| {
            let registry = Arc::clone(&registry);
            let clock = Arc::clone(&clock);
            let sink = Arc::clone(&sink);
            thread::spawn(move || {
                for round in 0..50u16 {
                    let index = worker * 50 + round;
                    let peer = SocketAddr::from((Ipv4Addr::LOCALHOST, 10_000 + index));
                    registry
                        .install_or_replace(session(index, &clock), Arc::clone(&sink), peer)
                        .unwrap();
                }
            })
        })
        .collect();

    let reader = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            let mut hits = 0usize;
            for _ in 0..20 {
                for index in 0..200u16 {
                    if registry.lookup(&identity(index)).is_some() {
                        hits += 1;
                    }
                }
            }
            hits
        })
    };

    for writer in writers {
        writer.join().unwrap();
    }
    reader.join().unwrap();

    assert_eq!(registry.len(), 200);
    assert_eq!(registry.connected_count(), 200);
    for index in 0..200u16 {
        let session = registry.lookup(&identity(index)).unwrap();
        assert_eq!(
            session.peer_addr(),
            Some(SocketAddr::from((Ipv4Addr::LOCALHOST, 10_000 + index)))
        );
    }
}

#[test]
fn concurrent_replace_keeps_single_connected_session() {
    let clock = Arc::new(ManualClock::new(1_700_000_000));
    let registry: Arc<Registry<Session>> = Arc::new(Registry::new());
    let sink: SharedSink = Arc::new(NullSink);

    let handles: Vec<_> = (0..8u16)
        .map(|worker| {
            let registry = Arc::clone(&registry);
            let clock = Arc::clone(&clock);
            let sink = Arc::clone(&sink);
            thread::spawn(move || {
                let mut installed = Vec::new();
                for round in 0..25u16 {
                    let session = session(7, &clock);
                    let peer = SocketAddr::from((Ipv4Addr::LOCALHOST, worker * 100 + round + 1));
                    registry
                        .install_or_replace(Arc::clone(&session), Arc::clone(&sink), peer)
                        .unwrap();
                    installed.push(session);
                }
                installed
            })
        })
        .collect();

    let all: Vec<Arc<Session>> = handles
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect();

    let current = registry.lookup(&identity(7)).unwrap();
    let connected: Vec<_> = all.iter().filter(|session| session.is_connected()).collect();
    assert_eq!(connected.len(), 1);
    assert!(Arc::ptr_eq(connected[0], &current));
}
