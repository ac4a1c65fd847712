//! Wiring of socket, registry, pumps and scheduler.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{error, info, warn};
use tunnel::{Clock, Registry, Session, SharedSink};

use crate::admin::AdminCommand;
use crate::directory::Directory;
use crate::error::{DirectoryError, TransporterError, TransporterResult};
use crate::inbound::InboundPump;
use crate::local::PacketSource;
use crate::outbound::OutboundPump;
use crate::scheduler::Scheduler;
use crate::stats::{PumpStats, StatsSnapshot};

/// Runtime settings of a transporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Local UDP address for all tunnels.
    pub bind: SocketAddr,
    /// Scheduler period.
    pub heartbeat_tick: Duration,
    /// Socket read timeout; bounds how late the inbound pump sees shutdown.
    pub poll_interval: Duration,
    /// How often worker threads are checked while no command arrives.
    pub monitor_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 5072)),
            heartbeat_tick: Duration::from_secs(1),
            poll_interval: Duration::from_millis(500),
            monitor_interval: Duration::from_secs(10),
        }
    }
}

/// Counts from one directory reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadReport {
    pub installed: usize,
    pub skipped: usize,
}

/// Local endpoints of the tunnels.
pub struct LocalLink {
    pub source: Box<dyn PacketSource>,
    pub sink: SharedSink,
    /// Receives local datagrams no tunnel claims.
    pub unhandled: Option<SharedSink>,
}

/// The tunnel server: one UDP socket multiplexing every configured tunnel.
pub struct Transporter {
    settings: Settings,
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    registry: Arc<Registry<Session>>,
    directory: Box<dyn Directory>,
    clock: Arc<dyn Clock>,
    stats: Arc<PumpStats>,
    shutdown: Arc<AtomicBool>,
}

impl Transporter {
    /// Binds the UDP socket. No tunnels are loaded yet.
    pub fn bind(
        settings: Settings,
        directory: Box<dyn Directory>,
        clock: Arc<dyn Clock>,
    ) -> TransporterResult<Self> {
        let socket = UdpSocket::bind(settings.bind).map_err(|source| TransporterError::Bind {
            addr: settings.bind,
            source,
        })?;
        socket
            .set_read_timeout(Some(settings.poll_interval))
            .map_err(TransporterError::Socket)?;
        let local_addr = socket.local_addr().map_err(TransporterError::Socket)?;
        info!(%local_addr, "listening for tunnel packets");

        Ok(Self {
            settings,
            socket: Arc::new(socket),
            local_addr,
            registry: Arc::new(Registry::new()),
            directory,
            clock,
            stats: Arc::new(PumpStats::default()),
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<Registry<Session>> {
        &self.registry
    }

    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Replaces every session with the directory's current records.
    ///
    /// The PoP IPv4 address of each record is the listening address.
    /// Records that cannot back a session are skipped. On a directory
    /// failure the current sessions stay untouched.
    pub fn reload(&self) -> Result<ReloadReport, DirectoryError> {
        let records = self.directory.load()?;
        let ipv4_pop = match self.local_addr.ip() {
            IpAddr::V4(ip) => ip,
            IpAddr::V6(ip) => ip.to_ipv4_mapped().unwrap_or(Ipv4Addr::UNSPECIFIED),
        };

        let mut sessions = Vec::with_capacity(records.len());
        let mut skipped = 0;
        for mut record in records {
            record.ipv4_pop = Some(ipv4_pop);
            match Session::new(&record, Arc::clone(&self.clock)) {
                Ok(session) => sessions.push(Arc::new(session)),
                Err(err) => {
                    warn!(tunnel_id = %record.tunnel_id, error = %err, "skipping tunnel");
                    skipped += 1;
                }
            }
        }
        let installed = self.registry.replace_all(sessions);
        info!(installed, skipped, "tunnels loaded");
        Ok(ReloadReport { installed, skipped })
    }

    /// Logs every tunnel and the packet counters.
    pub fn dump(&self) {
        self.registry.for_each(|session| {
            let peer = session.peer_addr();
            info!(
                tunnel = %session.identity(),
                tunnel_id = session.tunnel_id(),
                peer = ?peer,
                connected = session.is_connected(),
                valid_seen = session.is_valid_packet_received(),
                invalid = session.invalid_packet_count(),
                "tunnel"
            );
        });
        match serde_json::to_string(&self.stats.snapshot()) {
            Ok(stats) => info!(%stats, "packet counters"),
            Err(err) => warn!(error = %err, "cannot render packet counters"),
        }
    }

    /// Handles one administrative command; returns false on shutdown.
    pub fn handle_command(&self, command: AdminCommand) -> bool {
        match command {
            AdminCommand::Reload => {
                if let Err(err) = self.reload() {
                    error!(error = %err, "reload failed, keeping current tunnels");
                }
                true
            }
            AdminCommand::Dump => {
                self.dump();
                true
            }
            AdminCommand::Shutdown => false,
        }
    }

    /// Loads the tunnels, starts the workers and serves until shutdown.
    ///
    /// A worker that stops on its own ends the transporter with an error.
    pub fn run(self, local: LocalLink, commands: &Receiver<AdminCommand>) -> TransporterResult<()> {
        self.reload()?;

        let mut workers = vec![
            self.spawn_inbound(Arc::clone(&local.sink))?,
            self.spawn_outbound(local.source, local.unhandled)?,
            self.spawn_scheduler()?,
        ];

        let result = loop {
            match commands.recv_timeout(self.settings.monitor_interval) {
                Ok(command) => {
                    if !self.handle_command(command) {
                        info!("shutting down");
                        break Ok(());
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break Ok(()),
                Err(RecvTimeoutError::Timeout) => {}
            }
            if let Some(index) = workers.iter().position(|worker| worker.handle.is_finished()) {
                let worker = workers.swap_remove(index);
                error!(worker = worker.name, "worker stopped, terminating");
                break Err(worker.into_error());
            }
        };

        self.shutdown.store(true, Ordering::Relaxed);
        self.registry.for_each(|session| session.close());
        // the outbound pump may stay blocked on its source; it is not joined
        for worker in workers {
            if worker.name != OUTBOUND {
                worker.join();
            }
        }
        result
    }

    fn spawn_inbound(&self, sink: SharedSink) -> TransporterResult<Worker> {
        let pump = InboundPump::new(
            Arc::clone(&self.registry),
            sink,
            Arc::clone(&self.clock),
            Arc::clone(&self.stats),
        );
        let socket = Arc::clone(&self.socket);
        let shutdown = Arc::clone(&self.shutdown);
        Worker::spawn(INBOUND, move || {
            pump.run(&socket, &shutdown);
            Ok(())
        })
    }

    fn spawn_outbound(
        &self,
        mut source: Box<dyn PacketSource>,
        unhandled: Option<SharedSink>,
    ) -> TransporterResult<Worker> {
        let mut pump = OutboundPump::new(
            Arc::clone(&self.registry),
            self.socket.clone(),
            Arc::clone(&self.stats),
        );
        if let Some(sink) = unhandled {
            pump = pump.with_unhandled(sink);
        }
        let shutdown = Arc::clone(&self.shutdown);
        Worker::spawn(OUTBOUND, move || pump.run(source.as_mut(), &shutdown))
    }

    fn spawn_scheduler(&self) -> TransporterResult<Worker> {
        let scheduler = Scheduler::new(
            Arc::clone(&self.registry),
            self.socket.clone(),
            Arc::clone(&self.stats),
        );
        let period = self.settings.heartbeat_tick;
        let shutdown = Arc::clone(&self.shutdown);
        Worker::spawn(SCHEDULER, move || {
            scheduler.run(period, &shutdown);
            Ok(())
        })
    }
}

const INBOUND: &str = "inbound";
const OUTBOUND: &str = "outbound";
const SCHEDULER: &str = "scheduler";

struct Worker {
    name: &'static str,
    handle: JoinHandle<std::io::Result<()>>,
}

impl Worker {
    fn spawn(
        name: &'static str,
        body: impl FnOnce() -> std::io::Result<()> + Send + 'static,
    ) -> TransporterResult<Self> {
        let handle = thread::Builder::new()
            .name(name.into())
            .spawn(body)
            .map_err(|source| TransporterError::Spawn { name, source })?;
        Ok(Self { name, handle })
    }

    /// Waits for the worker; a failure or panic is logged and yields false.
    fn join(self) -> bool {
        match self.handle.join() {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                warn!(worker = self.name, error = %err, "worker failed during shutdown");
                false
            }
            Err(_) => {
                warn!(worker = self.name, "worker panicked during shutdown");
                false
            }
        }
    }

    fn into_error(self) -> TransporterError {
        let source = match self.handle.join() {
            Ok(Ok(())) | Err(_) => None,
            Ok(Err(err)) => Some(err),
        };
        TransporterError::WorkerStopped {
            name: self.name,
            source,
        }
    }
}
