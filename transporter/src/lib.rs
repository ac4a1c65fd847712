//! Runtime of the AYIYA tunnel transporter.
//!
//! One UDP socket carries every tunnel. The inbound pump authenticates
//! packets arriving on it and delivers their IPv6 payloads to the local
//! sink; the outbound pump wraps local IPv6 datagrams for the tunnel of
//! their destination. A scheduler thread sends heartbeats and expires
//! silent sessions.

mod admin;
mod directory;
mod error;
mod inbound;
mod local;
mod outbound;
mod scheduler;
mod server;
mod stats;
mod transmit;

pub use admin::{spawn_signal_listener, AdminCommand};
pub use directory::{Directory, JsonDirectory, StaticDirectory};
pub use error::{DirectoryError, TransporterError, TransporterResult};
pub use inbound::InboundPump;
pub use local::{PacketSource, PipeSink, PipeSource};
pub use outbound::OutboundPump;
pub use scheduler::{Scheduler, TickReport};
pub use server::{LocalLink, ReloadReport, Settings, Transporter};
pub use stats::{PumpStats, StatsSnapshot};
pub use transmit::Transmit;
