//! OS signal handling.
//!
//! # Responsibilities
//! - SIGHUP → re-run the configuration load
//! - SIGINT/SIGTERM → stop the reload loop
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - A reload never interrupts a load in progress; the caller runs loads
//!   one after another

use std::io;

use tracing::info;

/// What a received signal asks the process to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    Reload,
    Shutdown,
}

/// Stream of reload and shutdown requests.
pub struct Signals {
    #[cfg(unix)]
    hangup: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl Signals {
    /// Install the handlers. Must be called inside a Tokio runtime.
    pub fn new() -> io::Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            Ok(Self {
                hangup: signal(SignalKind::hangup())?,
                terminate: signal(SignalKind::terminate())?,
            })
        }
        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Wait for the next signal of interest.
    pub async fn next(&mut self) -> SignalEvent {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = self.hangup.recv() => {
                    info!("SIGHUP received, reloading configuration");
                    SignalEvent::Reload
                }
                _ = self.terminate.recv() => {
                    info!("SIGTERM received, shutting down");
                    SignalEvent::Shutdown
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupt received, shutting down");
                    SignalEvent::Shutdown
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            info!("interrupt received, shutting down");
            SignalEvent::Shutdown
        }
    }
}
