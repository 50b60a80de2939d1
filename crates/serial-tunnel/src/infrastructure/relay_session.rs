//! One client session: two pumps and the supervisor that tears them down.
//!
//! # Architecture
//!
//! ```text
//!               ┌───────────────────── RelaySession ─────────────────────┐
//!  serial  ───► │ pump_serial_to_tcp ──► OwnedWriteHalf ──────────────►  │ ──► client
//!  device  ◄─── │ SerialHandle::write_all ◄── pump_tcp_to_serial ◄─ Read  │ ◄── client
//!               │                 ▲                      ▲               │
//!               │                 └──── Teardown (token + reason) ───────┘
//!               └────────────────────────────────────────────────────────┘
//! ```
//!
//! Each pump runs in its own task.  The first pump to hit an error or EOF
//! records the reason on the shared [`Teardown`] and cancels its token; the
//! other pump is parked on that token in a `select!` and exits right away.
//! The supervisor then closes the TCP connection and frees the slot, so the
//! slot is never released while a pump can still touch the device.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::application::{hex_preview, InboundChunk, TrafficStats};
use crate::domain::{SessionReport, TeardownReason};
use crate::infrastructure::context::TunnelContext;
use crate::infrastructure::serial::SerialHandle;

/// Bytes shown in trace-level hex dumps.
const PREVIEW_BYTES: usize = 32;

// ── Teardown ──────────────────────────────────────────────────────────────────

/// Session-wide stop flag that remembers why it was raised.
///
/// Only the first [`Teardown::trigger`] records its reason; later calls still
/// cancel (a no-op by then) but report `false`.
#[derive(Debug)]
pub struct Teardown {
    token: CancellationToken,
    reason: OnceLock<TeardownReason>,
}

impl Teardown {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            reason: OnceLock::new(),
        }
    }

    /// Records `reason` if none is recorded yet and cancels the session.
    ///
    /// Returns `true` if this call's reason was the one recorded.
    pub fn trigger(&self, reason: TeardownReason) -> bool {
        let first = self.reason.set(reason).is_ok();
        self.token.cancel();
        first
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The recorded reason.  A session cancelled without one was stopped by
    /// the process-wide signal.
    pub fn reason(&self) -> TeardownReason {
        self.reason
            .get()
            .copied()
            .unwrap_or(TeardownReason::Shutdown)
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// What both pumps of one session share.
#[derive(Debug, Clone)]
pub struct PumpLink {
    /// Prefix for log lines, e.g. `1b4e28ba (10.0.0.7:51234)`.
    pub label: Arc<str>,
    pub teardown: Arc<Teardown>,
    pub stats: Arc<TrafficStats>,
}

impl PumpLink {
    pub fn new(label: &str, token: CancellationToken) -> Self {
        Self {
            label: Arc::from(label),
            teardown: Arc::new(Teardown::new(token)),
            stats: Arc::new(TrafficStats::new()),
        }
    }

    fn fail(&self, reason: TeardownReason) {
        if self.teardown.trigger(reason) {
            debug!("session {}: teardown requested: {reason}", self.label);
        }
    }
}

// ── Pumps ─────────────────────────────────────────────────────────────────────

/// Device→client pump.
///
/// Polls the device without blocking.  When it has nothing buffered the pump
/// sleeps `poll_interval`, waking early if the session is torn down.  Every
/// byte read is written to the client unchanged and in order.
pub async fn pump_serial_to_tcp<W>(
    serial: &SerialHandle,
    tcp: &mut W,
    link: &PumpLink,
    poll_interval: Duration,
) where
    W: AsyncWrite + Unpin,
{
    let token = link.teardown.token();
    let mut buf = Vec::new();

    loop {
        if token.is_cancelled() {
            break;
        }

        let n = match serial.read_available(&mut buf) {
            Ok(n) => n,
            Err(e) => {
                warn!("session {}: serial read failed: {e}", link.label);
                link.fail(TeardownReason::SerialReadFailed);
                break;
            }
        };

        if n == 0 {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(poll_interval) => continue,
            }
        }

        let written = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            result = tcp.write_all(&buf) => result,
        };
        if let Err(e) = written {
            debug!("session {}: TCP write failed: {e}", link.label);
            link.fail(TeardownReason::TcpWriteFailed);
            break;
        }

        link.stats.record_serial_to_tcp(n);
        trace!(
            "session {}: serial→tcp {n} B [{}]",
            link.label,
            hex_preview(&buf, PREVIEW_BYTES)
        );
    }

    debug!("session {}: serial→tcp pump stopped", link.label);
}

/// Client→device pump.
///
/// Reads up to `recv_buffer_size` bytes at a time and writes the raw chunk to
/// the device, IAC sequences included.  The filtered view is only logged.
pub async fn pump_tcp_to_serial<R>(
    tcp: &mut R,
    serial: &SerialHandle,
    link: &PumpLink,
    recv_buffer_size: usize,
) where
    R: AsyncRead + Unpin,
{
    let token = link.teardown.token();
    let mut buf = vec![0u8; recv_buffer_size.max(1)];

    loop {
        let read = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            result = tcp.read(&mut buf) => result,
        };

        let n = match read {
            Ok(0) => {
                debug!("session {}: client closed the connection", link.label);
                link.fail(TeardownReason::PeerClosed);
                break;
            }
            Ok(n) => n,
            Err(e) => {
                debug!("session {}: TCP read failed: {e}", link.label);
                link.fail(TeardownReason::TcpReadFailed);
                break;
            }
        };

        let chunk = InboundChunk::new(&buf[..n]);
        log_inbound(&link.label, &chunk);

        if let Err(e) = serial.write_all(chunk.raw().to_vec()).await {
            warn!("session {}: serial write failed: {e}", link.label);
            link.fail(TeardownReason::SerialWriteFailed);
            break;
        }
        link.stats.record_tcp_to_serial(&chunk);
    }

    debug!("session {}: tcp→serial pump stopped", link.label);
}

fn log_inbound(label: &str, chunk: &InboundChunk<'_>) {
    for command in chunk.commands() {
        debug!("session {label}: client sent {command}");
    }
    trace!(
        "session {label}: tcp→serial {} B, filtered [{}]",
        chunk.raw().len(),
        hex_preview(chunk.filtered(), PREVIEW_BYTES)
    );
}

// ── Session supervisor ────────────────────────────────────────────────────────

/// Frees the connection slot when the supervisor finishes, even if it
/// unwinds.
struct SlotRelease(Arc<TunnelContext>);

impl Drop for SlotRelease {
    fn drop(&mut self) {
        self.0.slot.release();
    }
}

/// An accepted client that owns the connection slot.
pub struct RelaySession {
    id: Uuid,
    peer: SocketAddr,
    stream: TcpStream,
    ctx: Arc<TunnelContext>,
}

impl RelaySession {
    /// Wraps an accepted connection.  The caller must already hold the slot
    /// for `peer`; the session releases it when it ends.
    pub fn new(stream: TcpStream, peer: SocketAddr, ctx: Arc<TunnelContext>) -> Self {
        Self {
            id: Uuid::new_v4(),
            peer,
            stream,
            ctx,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Runs the session on its own task.
    pub fn spawn(self) -> JoinHandle<SessionReport> {
        tokio::spawn(self.run())
    }

    /// Relays until either pump stops or the tunnel shuts down, then closes
    /// the connection, frees the slot and reports.
    pub async fn run(self) -> SessionReport {
        let Self {
            id,
            peer,
            stream,
            ctx,
        } = self;
        let slot = SlotRelease(Arc::clone(&ctx));
        let started = Instant::now();

        let short_id = id.simple().to_string();
        let label = format!("{} ({peer})", &short_id[..8]);
        let link = PumpLink::new(&label, ctx.stop.session_token());

        info!(
            "session {id}: relaying {} <-> {peer}",
            ctx.serial.name()
        );

        let (mut tcp_read, mut tcp_write) = stream.into_split();

        let serial_to_tcp = tokio::spawn({
            let serial = ctx.serial.clone();
            let link = link.clone();
            let poll_interval = ctx.config.serial_poll_interval;
            async move {
                let _cancel_on_exit = link.teardown.token().clone().drop_guard();
                pump_serial_to_tcp(&serial, &mut tcp_write, &link, poll_interval).await;
                tcp_write
            }
        });

        let tcp_to_serial = tokio::spawn({
            let serial = ctx.serial.clone();
            let link = link.clone();
            let recv_buffer_size = ctx.config.recv_buffer_size;
            async move {
                let _cancel_on_exit = link.teardown.token().clone().drop_guard();
                pump_tcp_to_serial(&mut tcp_read, &serial, &link, recv_buffer_size).await;
                tcp_read
            }
        });

        let (write_half, read_half) = tokio::join!(serial_to_tcp, tcp_to_serial);
        close_connection(&label, write_half, read_half).await;

        let report = SessionReport {
            session_id: id,
            peer,
            reason: link.teardown.reason(),
            duration: started.elapsed(),
            traffic: link.stats.snapshot(),
        };
        if report.reason.is_failure() {
            warn!("{report}");
        } else {
            info!("{report}");
        }

        drop(slot);
        report
    }
}

/// Reassembles the stream and shuts it down.  Errors are irrelevant here:
/// the halves are dropped either way, which closes the socket.
async fn close_connection(
    label: &str,
    write_half: Result<OwnedWriteHalf, JoinError>,
    read_half: Result<OwnedReadHalf, JoinError>,
) {
    match (write_half, read_half) {
        (Ok(write_half), Ok(read_half)) => {
            if let Ok(mut stream) = read_half.reunite(write_half) {
                if let Err(e) = stream.shutdown().await {
                    debug!("session {label}: shutdown of TCP stream failed: {e}");
                }
            }
        }
        (write_half, read_half) => {
            for e in [write_half.err(), read_half.err()].into_iter().flatten() {
                warn!("session {label}: pump task failed: {e}");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
