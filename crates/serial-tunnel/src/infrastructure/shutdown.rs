//! Process-wide stop signal.
//!
//! [`StopSignal`] is raised once (Ctrl+C, or a listener that can no longer
//! accept) and never cleared.  The listener races its `accept()` against it,
//! and every session derives its own cancellation token from it with
//! [`StopSignal::session_token`], so raising the signal also tears down the
//! active session.

use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{error, info};

#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    token: CancellationToken,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the signal.  Raising it again has no effect.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    pub fn is_set(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the signal is raised.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// A token for one session: cancelled by the session's own teardown, or
    /// automatically when this signal is raised.
    pub fn session_token(&self) -> CancellationToken {
        self.token.child_token()
    }
}

/// Raises `stop` when the operator presses Ctrl+C (SIGINT on Unix).
pub fn spawn_ctrl_c_handler(stop: StopSignal) -> JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; shutting down tunnel");
                stop.trigger();
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
