//! TCP accept loop.
//!
//! Accepts clients until the stop signal is raised.  The first client to
//! arrive while the slot is free gets a [`RelaySession`]; anyone arriving
//! while it is taken is closed straight away without receiving a byte.
//!
//! Each `accept()` is bounded by `accept_timeout` and raced against the stop
//! signal, so shutdown never waits for a client to show up.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::domain::SessionReport;
use crate::infrastructure::context::TunnelContext;
use crate::infrastructure::error::TunnelError;
use crate::infrastructure::relay_session::RelaySession;

pub struct TunnelListener {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TunnelListener {
    /// Binds the listening socket.
    ///
    /// # Errors
    ///
    /// Returns [`TunnelError::Bind`] if the address is in use or not
    /// permitted.
    pub async fn bind(addr: SocketAddr) -> Result<Self, TunnelError> {
        let bind_error = |source| TunnelError::Bind { addr, source };
        let listener = TcpListener::bind(addr).await.map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;
        info!("listening for clients on {local_addr}");
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// The bound address.  Differs from the requested one when port 0 was
    /// asked for.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Runs the accept loop until the stop signal is raised.
    ///
    /// On the way out the listening socket is closed first, then the active
    /// session (if any) gets up to `drain_timeout` to wind down.
    ///
    /// # Errors
    ///
    /// Returns [`TunnelError::Accept`] if accepting fails while the tunnel is
    /// not stopping.  The stop signal is raised before returning.
    pub async fn run(self, ctx: Arc<TunnelContext>) -> Result<(), TunnelError> {
        let Self {
            listener,
            local_addr,
        } = self;
        let mut active: Option<JoinHandle<SessionReport>> = None;

        let result = loop {
            if active.as_ref().is_some_and(JoinHandle::is_finished) {
                active = None;
            }

            let accepted = tokio::select! {
                biased;
                _ = ctx.stop.cancelled() => {
                    info!("stop signal raised; closing listener on {local_addr}");
                    break Ok(());
                }
                accepted = timeout(ctx.config.accept_timeout, listener.accept()) => accepted,
            };

            match accepted {
                // No client within the timeout; loop to re-check the signal.
                Err(_) => continue,
                Ok(Ok((stream, peer))) => {
                    if let Some(session) = admit(stream, peer, &ctx) {
                        active = Some(session);
                    }
                }
                Ok(Err(e)) if ctx.stop.is_set() => {
                    debug!("accept failed during shutdown: {e}");
                    break Ok(());
                }
                Ok(Err(e)) => {
                    error!("accept on {local_addr} failed: {e}");
                    ctx.stop.trigger();
                    break Err(TunnelError::Accept(e));
                }
            }
        };

        drop(listener);
        drain(active, ctx.config.drain_timeout).await;
        result
    }
}

/// Hands `stream` to a new session if the slot is free, otherwise closes it.
fn admit(
    stream: TcpStream,
    peer: SocketAddr,
    ctx: &Arc<TunnelContext>,
) -> Option<JoinHandle<SessionReport>> {
    if !ctx.slot.try_acquire(peer) {
        match ctx.slot.occupant() {
            Some(holder) => info!(
                "refusing {peer}: tunnel in use by {} for {:.1}s",
                holder.peer,
                holder.held_for().as_secs_f64()
            ),
            None => info!("refusing {peer}: tunnel in use"),
        }
        drop(stream);
        return None;
    }

    if ctx.config.tcp_nodelay {
        if let Err(e) = stream.set_nodelay(true) {
            warn!("could not set TCP_NODELAY for {peer}: {e}");
        }
    }

    let session = RelaySession::new(stream, peer, Arc::clone(ctx));
    info!("accepted {peer} as session {}", session.id());
    Some(session.spawn())
}

/// Waits for the active session to finish, aborting it after `limit`.
async fn drain(active: Option<JoinHandle<SessionReport>>, limit: Duration) {
    let Some(mut session) = active else {
        return;
    };
    match timeout(limit, &mut session).await {
        Ok(Ok(report)) => debug!("session {} drained", report.session_id),
        Ok(Err(e)) => warn!("session task failed: {e}"),
        Err(_) => {
            warn!("session still running after {limit:?}; aborting it");
            session.abort();
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
