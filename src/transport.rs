//! TCP transport to the console.
//!
//! [`Transport::open`] returns immediately and connects in a background
//! task; every outcome is reported on the supervisor's event channel as a
//! [`TransportEvent`] tagged with the transport's generation, so events from
//! a transport that has since been replaced can be recognised and ignored.
//!
//! Once connected the same task drives both directions:
//!
//! - inbound bytes go through [`ConsoleCodec`], negotiation refusals are
//!   written straight back, clean text is forwarded as
//!   [`TransportEvent::Data`];
//! - outbound lines arrive on a bounded channel and are written in order.
//!
//! Writes are fire-and-forget. [`Transport::close`] is idempotent and no
//! queued line is written after it returns.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::ConnectionConfig;
use crate::errors::TransportErrorKind;
use crate::telnet::codec::{ConsoleCodec, Outbound};
use crate::{AppError, Result};

/// Outbound lines buffered ahead of the socket before writes are refused.
pub const OUTBOUND_CAPACITY: usize = 64;

/// Monotonic transport identifier assigned by the supervisor.
pub type Generation = u64;

/// Events emitted by a transport task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The TCP connection is established.
    Connected {
        /// Transport that connected.
        generation: Generation,
    },
    /// Clean text received from the console.
    Data {
        /// Transport that received it.
        generation: Generation,
        /// Payload with telnet commands removed.
        text: String,
    },
    /// Connecting failed, or an established connection broke.
    Failed {
        /// Transport that failed.
        generation: Generation,
        /// Failure classification.
        kind: TransportErrorKind,
        /// Human-readable detail.
        message: String,
    },
    /// The console closed the connection.
    Closed {
        /// Transport that closed.
        generation: Generation,
    },
}

impl TransportEvent {
    /// Transport the event belongs to.
    #[must_use]
    pub fn generation(&self) -> Generation {
        match self {
            Self::Connected { generation }
            | Self::Data { generation, .. }
            | Self::Failed { generation, .. }
            | Self::Closed { generation } => *generation,
        }
    }
}

/// Handle to one connection attempt and, if it succeeds, the live socket.
#[derive(Debug)]
pub struct Transport {
    generation: Generation,
    outbound_tx: mpsc::Sender<Outbound>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Transport {
    /// Start connecting to `config.address()` in the background.
    ///
    /// Never fails synchronously: connect errors arrive as
    /// [`TransportEvent::Failed`] on `events`.
    #[must_use]
    pub fn open(
        config: &ConnectionConfig,
        generation: Generation,
        events: mpsc::Sender<TransportEvent>,
    ) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let cancel = CancellationToken::new();
        let address = config.address();
        let span = info_span!("transport", %address, generation);

        let task = tokio::spawn(
            run_connection(
                address,
                config.connect_timeout(),
                generation,
                outbound_rx,
                events,
                cancel.clone(),
            )
            .instrument(span),
        );

        Self {
            generation,
            outbound_tx,
            cancel,
            task: Some(task),
        }
    }

    /// Generation assigned at [`open`](Self::open).
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Queue one command line. Returns `false` if closed or the queue is full.
    pub fn write_line(&self, line: String) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        match self.outbound_tx.try_send(Outbound::Line(line)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(generation = self.generation, "transport: outbound queue full");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Stop the connection task. Safe to call repeatedly.
    pub fn close(&mut self) {
        if !self.cancel.is_cancelled() {
            debug!(generation = self.generation, "transport: closing");
            self.cancel.cancel();
        }
    }

    /// Close and wait for the connection task to exit.
    pub async fn await_completion(mut self) {
        self.close();
        if let Some(handle) = self.task.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Connection task ───────────────────────────────────────────────────────────

async fn run_connection(
    address: String,
    connect_timeout: Duration,
    generation: Generation,
    mut outbound_rx: mpsc::Receiver<Outbound>,
    events: mpsc::Sender<TransportEvent>,
    cancel: CancellationToken,
) {
    let stream = tokio::select! {
        biased;

        () = cancel.cancelled() => {
            debug!("transport: cancelled before connect completed");
            return;
        }

        result = tokio::time::timeout(connect_timeout, TcpStream::connect(&address)) => {
            match result {
                Ok(Ok(stream)) => stream,
                Ok(Err(err)) => {
                    let kind = TransportErrorKind::classify(&err);
                    warn!(%err, %kind, "transport: connect failed");
                    emit(&events, &cancel, TransportEvent::Failed {
                        generation,
                        kind,
                        message: format!("connect to {address} failed: {err}"),
                    }).await;
                    return;
                }
                Err(_) => {
                    warn!(?connect_timeout, "transport: connect timed out");
                    emit(&events, &cancel, TransportEvent::Failed {
                        generation,
                        kind: TransportErrorKind::Timeout,
                        message: format!("connect to {address} timed out after {connect_timeout:?}"),
                    }).await;
                    return;
                }
            }
        }
    };

    if let Err(err) = stream.set_nodelay(true) {
        debug!(%err, "transport: could not disable nagle");
    }
    info!("transport: connected");
    emit(&events, &cancel, TransportEvent::Connected { generation }).await;

    let (read_half, write_half) = stream.into_split();
    let mut reader = FramedRead::new(read_half, ConsoleCodec::new());
    let mut writer = FramedWrite::new(write_half, ConsoleCodec::new());

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!("transport: cancellation received, stopping");
                break;
            }

            outbound = outbound_rx.recv() => {
                let Some(frame) = outbound else {
                    debug!("transport: outbound channel closed, stopping");
                    break;
                };
                match write_frame(&mut writer, frame, &cancel).await {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(err) => {
                        report_failure(&events, &cancel, generation, &err).await;
                        break;
                    }
                }
            }

            inbound = reader.next() => {
                match inbound {
                    None => {
                        info!("transport: console closed the connection");
                        emit(&events, &cancel, TransportEvent::Closed { generation }).await;
                        break;
                    }
                    Some(Err(err)) => {
                        report_failure(&events, &cancel, generation, &err).await;
                        break;
                    }
                    Some(Ok(chunk)) => {
                        if !chunk.replies.is_empty() {
                            match write_frame(&mut writer, Outbound::Negotiation(chunk.replies), &cancel).await {
                                Ok(true) => {}
                                Ok(false) => break,
                                Err(err) => {
                                    report_failure(&events, &cancel, generation, &err).await;
                                    break;
                                }
                            }
                        }
                        if !chunk.text.is_empty() {
                            emit(&events, &cancel, TransportEvent::Data { generation, text: chunk.text }).await;
                        }
                    }
                }
            }
        }
    }
}

/// Report a read/write failure on an established connection.
async fn report_failure(
    events: &mpsc::Sender<TransportEvent>,
    cancel: &CancellationToken,
    generation: Generation,
    err: &AppError,
) {
    warn!(%err, "transport: connection failed");
    emit(
        events,
        cancel,
        TransportEvent::Failed {
            generation,
            kind: TransportErrorKind::ResetByPeer,
            message: err.to_string(),
        },
    )
    .await;
}

/// Write one frame unless the transport is closed first.
///
/// Returns `Ok(false)` when cancellation won the race.
async fn write_frame(
    writer: &mut FramedWrite<OwnedWriteHalf, ConsoleCodec>,
    frame: Outbound,
    cancel: &CancellationToken,
) -> Result<bool> {
    tokio::select! {
        biased;

        () = cancel.cancelled() => Ok(false),
        result = writer.send(frame) => result.map(|()| true),
    }
}

/// Send an event to the supervisor, giving up once the transport is closed.
async fn emit(
    events: &mpsc::Sender<TransportEvent>,
    cancel: &CancellationToken,
    event: TransportEvent,
) {
    tokio::select! {
        biased;

        () = cancel.cancelled() => debug!("transport: closed, event dropped"),
        result = events.send(event) => {
            if result.is_err() {
                debug!("transport: supervisor gone, event dropped");
            }
        }
    }
}
