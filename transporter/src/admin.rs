//! Administrative commands and their signal bindings.

use std::io;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;
use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM, SIGUSR2};
use signal_hook::iterator::{Handle, Signals};
use tracing::info;

/// Requests handled by the transporter's control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCommand {
    /// Replace all tunnels with a fresh load from the directory.
    Reload,
    /// Log every tunnel with its peer, and the packet counters.
    Dump,
    Shutdown,
}

impl AdminCommand {
    #[must_use]
    pub const fn from_signal(signal: i32) -> Option<Self> {
        match signal {
            SIGHUP => Some(Self::Reload),
            SIGUSR2 => Some(Self::Dump),
            SIGINT | SIGTERM => Some(Self::Shutdown),
            _ => None,
        }
    }
}

/// Forwards SIGHUP, SIGUSR2, SIGINT and SIGTERM as commands.
///
/// The returned handle stops the listener thread.
pub fn spawn_signal_listener(
    commands: Sender<AdminCommand>,
) -> io::Result<(Handle, JoinHandle<()>)> {
    let mut signals = Signals::new([SIGHUP, SIGUSR2, SIGINT, SIGTERM])?;
    let handle = signals.handle();
    let thread = thread::Builder::new()
        .name("signals".into())
        .spawn(move || {
            for signal in signals.forever() {
                let Some(command) = AdminCommand::from_signal(signal) else {
                    continue;
                };
                info!(signal, ?command, "signal received");
                if commands.send(command).is_err() {
                    break;
                }
            }
        })?;
    Ok((handle, thread))
}
