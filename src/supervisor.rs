//! Lifecycle supervisor for the single console connection.
//!
//! One background task owns everything with state: the current
//! [`Transport`], the poll and reconnect timers, the [`PollAccumulator`],
//! and the published snapshot. Operator requests, transport events and
//! timer ticks are all handled on that task, one at a time, so no handler
//! ever races another.
//!
//! ```text
//! Uninitialized ──config with host──▶ Connecting ──connected──▶ Connected
//!        ▲                                 ▲                        │
//!        │ config without host             │ reconnect tick         │ closed / error
//!        │                                 └────── Disconnected ◀───┘
//!        └──────────── any state ──shutdown──▶ ShutDown (terminal)
//! ```
//!
//! Invariants held by the task:
//!
//! - at most one [`Transport`] exists; events from a replaced one are ignored;
//! - the poll timer only runs while connected, and is replaced, never doubled;
//! - the reconnect timer only runs while disconnected and is dropped the
//!   moment a connection succeeds;
//! - the published [`ActiveCuelistSet`] only changes when a poll response is
//!   complete.
//!
//! The collaborator talks to the task through a cloneable [`ConsoleHandle`]
//! and receives [`ConsoleEvent`]s on the channel given to [`spawn`].

use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::accumulator::PollAccumulator;
use crate::config::ConnectionConfig;
use crate::dispatcher::{self, DispatchOutcome, LineWriter};
use crate::models::command::Command;
use crate::models::cuelist::{ActiveCuelistSet, CuelistId};
use crate::models::state::ConnectionState;
use crate::transport::{Generation, Transport, TransportEvent};
use crate::{AppError, Result};

/// Capacity of the operator request channel.
const CONTROL_CAPACITY: usize = 32;

/// Capacity of the transport event channel.
const TRANSPORT_EVENT_CAPACITY: usize = 128;

/// Notifications delivered to the collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    /// The connection moved to a new state.
    ConnectionStateChanged {
        /// New state.
        state: ConnectionState,
        /// Human-readable reason.
        message: String,
    },
    /// A poll response completed and its snapshot was installed.
    ActiveCuelistsChanged(ActiveCuelistSet),
}

/// Latest connection state and the message that accompanied it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkStatus {
    /// Current state.
    pub state: ConnectionState,
    /// Reason for the last transition.
    pub message: String,
}

impl Default for LinkStatus {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            message: "initializing".to_owned(),
        }
    }
}

/// Where the supervisor is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Uninitialized,
    Connecting,
    Connected,
    Disconnected,
}

/// Operator requests routed to the supervisor task.
#[derive(Debug)]
enum Control {
    Submit {
        command: Command,
        reply: oneshot::Sender<Result<DispatchOutcome>>,
    },
    UpdateConfig {
        config: ConnectionConfig,
        reply: oneshot::Sender<Result<()>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable front door to a running supervisor.
#[derive(Debug, Clone)]
pub struct ConsoleHandle {
    control_tx: mpsc::Sender<Control>,
    status_rx: watch::Receiver<LinkStatus>,
    snapshot_rx: watch::Receiver<ActiveCuelistSet>,
}

impl ConsoleHandle {
    /// Render and send a command.
    ///
    /// Resolves once the command has been handed to the transport, dropped
    /// because the console is not connected, or found to be unmapped.
    ///
    /// # Errors
    ///
    /// - [`AppError::Command`] if a parameter fails validation.
    /// - [`AppError::Shutdown`] if the supervisor has shut down.
    pub async fn submit_command(&self, command: Command) -> Result<DispatchOutcome> {
        let (reply, rx) = oneshot::channel();
        self.control_tx
            .send(Control::Submit { command, reply })
            .await
            .map_err(|_| shut_down())?;
        rx.await.map_err(|_| shut_down())?
    }

    /// Apply new connection settings, reconnecting if a host is set.
    ///
    /// # Errors
    ///
    /// - [`AppError::Config`] if `config` fails validation; the current
    ///   connection is left untouched.
    /// - [`AppError::Shutdown`] if the supervisor has shut down.
    pub async fn update_config(&self, config: ConnectionConfig) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.control_tx
            .send(Control::UpdateConfig { config, reply })
            .await
            .map_err(|_| shut_down())?;
        rx.await.map_err(|_| shut_down())?
    }

    /// Stop both timers and close the transport. Terminal and idempotent.
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self.control_tx.send(Control::Shutdown { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }

    /// Whether the supervisor task has stopped.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.control_tx.is_closed()
    }

    /// Current connection state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.status_rx.borrow().state
    }

    /// Current connection state with its message.
    #[must_use]
    pub fn status(&self) -> LinkStatus {
        self.status_rx.borrow().clone()
    }

    /// Most recently completed snapshot.
    #[must_use]
    pub fn active_cuelists(&self) -> ActiveCuelistSet {
        self.snapshot_rx.borrow().clone()
    }

    /// Whether cue list `id` was active in the latest snapshot.
    #[must_use]
    pub fn is_active(&self, id: CuelistId) -> bool {
        self.snapshot_rx.borrow().contains(id)
    }

    /// Watch connection status changes.
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<LinkStatus> {
        self.status_rx.clone()
    }

    /// Watch snapshot replacements.
    #[must_use]
    pub fn subscribe_cuelists(&self) -> watch::Receiver<ActiveCuelistSet> {
        self.snapshot_rx.clone()
    }
}

fn shut_down() -> AppError {
    AppError::Shutdown("console link is shut down".into())
}

/// Start the supervisor task.
///
/// Connects immediately if `config` names a host. Events go to `events`
/// without waiting: if the receiver falls behind and the channel is full,
/// the event is dropped with a warning. Cancelling `cancel` has the same
/// effect as [`ConsoleHandle::shutdown`].
///
/// # Errors
///
/// Returns [`AppError::Config`] if `config` fails validation.
pub fn spawn(
    config: ConnectionConfig,
    events: mpsc::Sender<ConsoleEvent>,
    cancel: CancellationToken,
) -> Result<(ConsoleHandle, JoinHandle<()>)> {
    config.validate()?;

    let (control_tx, control_rx) = mpsc::channel(CONTROL_CAPACITY);
    let (status_tx, status_rx) = watch::channel(LinkStatus::default());
    let (snapshot_tx, snapshot_rx) = watch::channel(ActiveCuelistSet::default());
    let (transport_tx, transport_rx) = mpsc::channel(TRANSPORT_EVENT_CAPACITY);

    let supervisor = Supervisor {
        accumulator: PollAccumulator::new(config.reject_unsolicited),
        config,
        lifecycle: Lifecycle::Uninitialized,
        transport: None,
        last_generation: 0,
        poll_timer: None,
        reconnect_timer: None,
        control_rx,
        transport_tx,
        transport_rx,
        status_tx,
        snapshot_tx,
        events,
        cancel,
    };

    let task = tokio::spawn(supervisor.run().instrument(info_span!("console_supervisor")));

    let handle = ConsoleHandle {
        control_tx,
        status_rx,
        snapshot_rx,
    };
    Ok((handle, task))
}

// ── Supervisor task ───────────────────────────────────────────────────────────

struct Supervisor {
    config: ConnectionConfig,
    lifecycle: Lifecycle,
    transport: Option<Transport>,
    last_generation: Generation,
    accumulator: PollAccumulator,
    poll_timer: Option<Interval>,
    reconnect_timer: Option<Interval>,
    control_rx: mpsc::Receiver<Control>,
    transport_tx: mpsc::Sender<TransportEvent>,
    transport_rx: mpsc::Receiver<TransportEvent>,
    status_tx: watch::Sender<LinkStatus>,
    snapshot_tx: watch::Sender<ActiveCuelistSet>,
    events: mpsc::Sender<ConsoleEvent>,
    cancel: CancellationToken,
}

/// The live link as seen by the dispatcher.
struct LiveLink<'a> {
    connected: bool,
    transport: Option<&'a Transport>,
}

impl LineWriter for LiveLink<'_> {
    fn is_connected(&self) -> bool {
        self.connected && self.transport.is_some()
    }

    fn write_line(&mut self, line: String) -> bool {
        self.transport.is_some_and(|t| t.write_line(line))
    }
}

impl Supervisor {
    async fn run(mut self) {
        if self.config.has_host() {
            self.open_transport();
        } else {
            info!("no console host configured, waiting for configuration");
        }

        loop {
            tokio::select! {
                biased;

                () = self.cancel.cancelled() => {
                    debug!("supervisor: cancellation received");
                    self.teardown().await;
                    break;
                }

                control = self.control_rx.recv() => {
                    match control {
                        None => {
                            debug!("supervisor: all handles dropped");
                            self.teardown().await;
                            break;
                        }
                        Some(Control::Submit { command, reply }) => {
                            let _ = reply.send(self.dispatch(&command));
                        }
                        Some(Control::UpdateConfig { config, reply }) => {
                            let _ = reply.send(self.apply_config(config));
                        }
                        Some(Control::Shutdown { reply }) => {
                            self.teardown().await;
                            let _ = reply.send(());
                            break;
                        }
                    }
                }

                Some(event) = self.transport_rx.recv() => {
                    self.handle_transport_event(event);
                }

                () = next_tick(&mut self.reconnect_timer) => {
                    self.on_reconnect_tick();
                }

                () = next_tick(&mut self.poll_timer) => {
                    self.on_poll_tick();
                }
            }
        }

        info!("console supervisor stopped");
    }

    fn dispatch(&mut self, command: &Command) -> Result<DispatchOutcome> {
        let mut link = LiveLink {
            connected: self.lifecycle == Lifecycle::Connected,
            transport: self.transport.as_ref(),
        };
        let outcome = dispatcher::dispatch(&mut link, command)?;
        if outcome == DispatchOutcome::Sent && *command == Command::PollActiveCuelists {
            self.accumulator.begin_poll();
        }
        Ok(outcome)
    }

    fn apply_config(&mut self, config: ConnectionConfig) -> Result<()> {
        config.validate()?;
        info!(host = %config.host, port = config.port, "supervisor: configuration received");

        self.accumulator.set_reject_unsolicited(config.reject_unsolicited);
        self.config = config;
        self.cancel_reconnect();

        if self.config.has_host() {
            self.open_transport();
        } else {
            self.close_transport();
            self.lifecycle = Lifecycle::Uninitialized;
            self.publish_state(ConnectionState::Disconnected, "no console host configured");
        }
        Ok(())
    }

    fn handle_transport_event(&mut self, event: TransportEvent) {
        let current = self.transport.as_ref().map(Transport::generation);
        if current != Some(event.generation()) {
            debug!(
                generation = event.generation(),
                ?current,
                "supervisor: ignoring event from a replaced transport"
            );
            return;
        }

        match event {
            TransportEvent::Connected { .. } => self.on_connected(),
            TransportEvent::Data { text, .. } => self.on_data(&text),
            TransportEvent::Failed { kind, message, .. } => {
                self.on_disconnected(ConnectionState::Errored, &format!("{kind}: {message}"));
            }
            TransportEvent::Closed { .. } => {
                self.on_disconnected(ConnectionState::Disconnected, "connection closed by console");
            }
        }
    }

    fn on_connected(&mut self) {
        self.lifecycle = Lifecycle::Connected;
        self.cancel_reconnect();
        self.accumulator.reset();

        if self.config.polling_enabled() {
            self.poll_timer = Some(repeating(self.config.poll_interval()));
            debug!(interval_ms = self.config.poll_interval_ms, "supervisor: poll timer armed");
        } else {
            self.poll_timer = None;
        }

        self.publish_state(ConnectionState::Connected, "connected");
    }

    fn on_data(&mut self, text: &str) {
        for snapshot in self.accumulator.push(text) {
            if self.snapshot_tx.borrow().same_ids(&snapshot) {
                debug!(active = ?snapshot.to_vec(), "active cue lists unchanged");
            } else {
                info!(active = ?snapshot.to_vec(), "active cue lists updated");
            }
            self.snapshot_tx.send_replace(snapshot.clone());
            self.emit(ConsoleEvent::ActiveCuelistsChanged(snapshot));
        }
    }

    fn on_disconnected(&mut self, state: ConnectionState, message: &str) {
        warn!(%state, message, "supervisor: console connection lost");
        self.close_transport();
        self.lifecycle = Lifecycle::Disconnected;
        self.publish_state(state, message);

        if self.reconnect_timer.is_none() {
            self.reconnect_timer = Some(repeating(self.config.reconnect_interval()));
            info!(
                interval_ms = self.config.reconnect_interval_ms,
                "supervisor: reconnect timer armed"
            );
        }
    }

    fn on_reconnect_tick(&mut self) {
        if !self.config.has_host() {
            self.cancel_reconnect();
            return;
        }
        if self.transport.is_some() {
            debug!("supervisor: connect attempt still in flight, skipping reconnect tick");
            return;
        }
        info!("supervisor: reconnecting");
        self.open_transport();
    }

    fn on_poll_tick(&mut self) {
        if self.lifecycle != Lifecycle::Connected {
            self.poll_timer = None;
            return;
        }
        match self.dispatch(&Command::PollActiveCuelists) {
            Ok(DispatchOutcome::Sent) => debug!("supervisor: poll sent"),
            Ok(outcome) => debug!(?outcome, "supervisor: poll not sent"),
            Err(err) => warn!(%err, "supervisor: poll failed"),
        }
    }

    fn open_transport(&mut self) {
        self.close_transport();
        self.last_generation += 1;
        let generation = self.last_generation;

        info!(
            host = %self.config.host,
            port = self.config.port,
            generation,
            "supervisor: opening console transport"
        );
        self.transport = Some(Transport::open(
            &self.config,
            generation,
            self.transport_tx.clone(),
        ));
        self.lifecycle = Lifecycle::Connecting;
        let message = format!("connecting to {}", self.config.address());
        self.publish_state(ConnectionState::Connecting, &message);
    }

    /// Close the transport and drop everything tied to it.
    fn close_transport(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        self.poll_timer = None;
        self.accumulator.reset();
    }

    fn cancel_reconnect(&mut self) {
        if self.reconnect_timer.take().is_some() {
            debug!("supervisor: reconnect timer cancelled");
        }
    }

    async fn teardown(&mut self) {
        self.cancel_reconnect();
        self.poll_timer = None;
        if let Some(transport) = self.transport.take() {
            transport.await_completion().await;
        }
        self.accumulator.reset();
        self.control_rx.close();
        self.publish_state(ConnectionState::Disconnected, "shut down");
        info!(lifecycle = ?self.lifecycle, "supervisor: shut down");
    }

    fn publish_state(&self, state: ConnectionState, message: &str) {
        self.status_tx.send_replace(LinkStatus {
            state,
            message: message.to_owned(),
        });
        self.emit(ConsoleEvent::ConnectionStateChanged {
            state,
            message: message.to_owned(),
        });
    }

    /// Notify the collaborator without waiting on it.
    ///
    /// A full channel drops the event; the watch channels still hold the
    /// latest state and snapshot.
    fn emit(&self, event: ConsoleEvent) {
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(?event, "supervisor: event consumer lagging, event dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("supervisor: event receiver dropped");
            }
        }
    }
}

/// Interval whose first tick is one full period from now.
fn repeating(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Wait for the next tick, or forever if the timer is not armed.
async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
