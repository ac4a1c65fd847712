//! Tunnel sessions for the AYIYA tunnel transporter.
//!
//! A [`Session`] owns one tunnel's key, its current UDP peer and its
//! liveness bookkeeping. The [`Registry`] maps tunnel identities to sessions
//! for the packet pumps. Both are safe to share between threads.
//!
//! Sessions hold no timers: heartbeats and the liveness sweep are driven by
//! the caller through [`Session::beat`] and [`Session::is_connected`].

mod channel;
mod clock;
mod config;
mod error;
mod registry;
mod session;

pub use channel::{ForwardAction, Outbound, PacketSink, SharedSink, TunnelChannel};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{TunnelConfig, TunnelState};
pub use error::{ConfigReason, TunnelError, TunnelResult};
pub use registry::Registry;
pub use session::{Session, LIVENESS_GRACE};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_api_exports() {
        let _ = LIVENESS_GRACE;
        let _ = SystemClock;
        let _: Registry<Session> = Registry::new();
        let _: TunnelResult<()> = Ok(());
    }

    #[test]
    fn shared_types_are_thread_safe() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Session>();
        assert_send_sync::<Registry<Session>>();
    }
}
