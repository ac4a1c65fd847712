//! Heartbeats and the liveness sweep.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use tunnel::{Registry, Session};

use crate::stats::{bump, PumpStats};
use crate::transmit::Transmit;

/// Outcome of one scheduler pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub connected: usize,
    pub timed_out: usize,
    pub heartbeats: usize,
}

/// Periodically expires silent sessions and sends due heartbeats.
pub struct Scheduler {
    registry: Arc<Registry<Session>>,
    socket: Arc<dyn Transmit>,
    stats: Arc<PumpStats>,
}

impl Scheduler {
    pub fn new(
        registry: Arc<Registry<Session>>,
        socket: Arc<dyn Transmit>,
        stats: Arc<PumpStats>,
    ) -> Self {
        Self {
            registry,
            socket,
            stats,
        }
    }

    /// Runs one pass over a snapshot of the registry.
    pub fn tick(&self) -> TickReport {
        let mut report = TickReport::default();
        self.registry.for_each(|session| {
            let was_connected = session.peer_addr().is_some();
            if !session.is_connected() {
                if was_connected {
                    report.timed_out += 1;
                    bump(&self.stats.timeouts);
                }
                return;
            }
            report.connected += 1;
            if !session.heartbeat_due() {
                return;
            }
            match session.beat() {
                Ok(outbound) => match self.socket.send_to(&outbound.bytes, outbound.peer) {
                    Ok(_) => {
                        report.heartbeats += 1;
                        bump(&self.stats.heartbeats);
                        bump(&self.stats.sent);
                    }
                    Err(err) => {
                        warn!(peer = %outbound.peer, error = %err, "heartbeat send failed");
                        bump(&self.stats.send_errors);
                    }
                },
                // closed since the check above
                Err(err) => self.stats.refused(session.identity(), &err, "heartbeat"),
            }
        });
        report
    }

    /// Ticks every `period` until `shutdown` is set.
    pub fn run(&self, period: Duration, shutdown: &AtomicBool) {
        info!(period_ms = period.as_millis(), "scheduler started");
        let step = period.min(Duration::from_millis(200));
        let mut next = Instant::now() + period;
        while !shutdown.load(Ordering::Relaxed) {
            let now = Instant::now();
            if now < next {
                thread::sleep(step.min(next - now));
                continue;
            }
            let report = self.tick();
            if report.timed_out > 0 || report.heartbeats > 0 {
                debug!(?report, "scheduler tick");
            }
            next = now + period;
        }
        info!("scheduler stopped");
    }
}
