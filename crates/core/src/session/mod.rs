//! Streaming session lifecycle
//!
//! [`RelaySession`] is an explicitly owned, instantiable session: `start`
//! spawns a driver task, `stop` tears it down, and multiple sessions are just
//! multiple instances. The driver is an explicit state machine over discrete
//! events (transport open/close, message received, command, timer), moving
//! through phases:
//!
//! ```text
//! check-session -> connect -> pump -> backoff -+-> connect ...
//!      |              |         |              |
//!      +--------------+---------+--> halt <----+
//! ```
//!
//! The fixed 5-second reconnect delay is the awaited backoff phase itself, so
//! at most one reconnect timer can ever be outstanding, and fatal failures
//! (missing token, roster miss, close code 1008, explicit session end) simply
//! never enter it.

pub mod discovery;
pub mod history;
pub mod resize;
pub mod state;

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::config::SessionConfig;
use crate::error::{Result, StreamError};
use crate::protocol::{ClientMessage, ControlMessage, FrameDecoder, FrameKind, Utf8Stream};
use crate::terminal::TerminalSurface;
use crate::transport::{
    ConnectError, Transport, TransportConnector, TransportEvent, CLOSE_POLICY_VIOLATION,
};

use discovery::{check_session, AuthProvider, SessionRoster};
use history::HistorySuppression;
use resize::ResizeCoordinator;
pub use state::{ConnectionState, Failure};

/// Commands flowing from the owning context into the driver
#[derive(Debug)]
enum Command {
    Input(String),
    Resize { cols: u16, rows: u16 },
    Stop,
}

/// Next lifecycle phase chosen by the driver after each event
enum Phase {
    Check,
    Connect,
    Backoff,
    Halt,
}

/// Handle to one live streaming session
///
/// Dropping the handle aborts the driver; [`stop`](Self::stop) performs an
/// orderly teardown (close transport, release buffers and timers) and is safe
/// to call at any point in the lifecycle.
pub struct RelaySession {
    cmd_tx: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<ConnectionState>,
    task: tokio::task::JoinHandle<()>,
}

impl RelaySession {
    /// Start streaming `session_id` through the given collaborators
    pub fn start(
        session_id: impl Into<String>,
        config: SessionConfig,
        auth: Arc<dyn AuthProvider>,
        roster: Arc<dyn SessionRoster>,
        connector: Arc<dyn TransportConnector>,
        surface: Box<dyn TerminalSurface>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);

        let driver = Driver {
            session_id: session_id.into(),
            decoder: FrameDecoder::new(config.max_frame_size),
            utf8: Utf8Stream::new(),
            resize: ResizeCoordinator::new(),
            history: HistorySuppression::new(config.suppression_window),
            config,
            auth,
            roster,
            connector,
            surface,
            cmd_rx,
            state_tx,
            token: None,
        };
        let task = tokio::spawn(driver.run());

        Self {
            cmd_tx,
            state_rx,
            task,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.state_rx.borrow().clone()
    }

    /// Watch every state transition
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Forward terminal input; dropped when the transport is not open
    pub fn input(&self, data: impl Into<String>) {
        let _ = self.cmd_tx.send(Command::Input(data.into()));
    }

    /// Report a local geometry change
    pub fn notify_resize(&self, cols: u16, rows: u16) {
        let _ = self.cmd_tx.send(Command::Resize { cols, rows });
    }

    /// Wait until the session can make no further progress
    pub async fn wait_terminal(&self) -> ConnectionState {
        let mut rx = self.state_rx.clone();
        loop {
            let current = rx.borrow_and_update().clone();
            if current.is_terminal() {
                return current;
            }
            if rx.changed().await.is_err() {
                return rx.borrow().clone();
            }
        }
    }

    /// Stop the session and wait for the driver to release its resources
    pub async fn stop(mut self) {
        let _ = self.cmd_tx.send(Command::Stop);
        let _ = (&mut self.task).await;
    }
}

impl Drop for RelaySession {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// One event consumed by the pump loop
enum Step {
    Transport(Option<TransportEvent>),
    Cmd(Option<Command>),
}

struct Driver {
    session_id: String,
    config: SessionConfig,
    auth: Arc<dyn AuthProvider>,
    roster: Arc<dyn SessionRoster>,
    connector: Arc<dyn TransportConnector>,
    surface: Box<dyn TerminalSurface>,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
    state_tx: watch::Sender<ConnectionState>,
    token: Option<String>,
    decoder: FrameDecoder,
    utf8: Utf8Stream,
    resize: ResizeCoordinator,
    history: HistorySuppression,
}

impl Driver {
    async fn run(mut self) {
        let mut phase = Phase::Check;
        loop {
            phase = match phase {
                Phase::Check => self.check().await,
                Phase::Connect => self.connect_and_pump().await,
                Phase::Backoff => self.backoff().await,
                Phase::Halt => break,
            };
        }
        tracing::debug!("session {}: driver stopped", self.session_id);
    }

    fn set_state(&self, next: ConnectionState) {
        if *self.state_tx.borrow() != next {
            tracing::debug!("session {}: state -> {:?}", self.session_id, next);
            let _ = self.state_tx.send(next);
        }
    }

    /// Verify token and roster; cancellable by a stop command
    async fn check(&mut self) -> Phase {
        self.set_state(ConnectionState::CheckingSession);

        let check = check_session(&*self.auth, &*self.roster, &self.session_id);
        tokio::pin!(check);

        loop {
            let step = tokio::select! {
                result = &mut check => Some(result),
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(Command::Resize { cols, rows }) => {
                            self.resize.note_local(cols, rows);
                            continue;
                        }
                        Some(Command::Input(_)) => continue,
                        // Abandon the in-flight query; its result is never applied.
                        Some(Command::Stop) | None => return Phase::Halt,
                    }
                }
            };

            return match step {
                Some(Ok(token)) => {
                    self.token = Some(token);
                    Phase::Connect
                }
                Some(Err(StreamError::AuthMissing)) => {
                    self.set_state(ConnectionState::Failed(Failure::AuthMissing));
                    Phase::Halt
                }
                Some(Err(StreamError::SessionNotRegistered(_))) => {
                    self.set_state(ConnectionState::SessionMissing);
                    Phase::Halt
                }
                Some(Err(e)) => {
                    self.set_state(ConnectionState::Failed(Failure::Roster(e.to_string())));
                    Phase::Halt
                }
                None => Phase::Halt,
            };
        }
    }

    /// Open the transport and pump it until it drops or the session ends
    async fn connect_and_pump(&mut self) -> Phase {
        self.set_state(ConnectionState::Connecting);

        let mut transport = match self.open_transport().await {
            Ok(transport) => transport,
            Err(phase) => return phase,
        };

        // Fresh stream: anything buffered belongs to the previous connection.
        self.reset_stream();
        self.set_state(ConnectionState::Connected);
        tracing::info!("session {}: connected", self.session_id);

        let join = ClientMessage::join_session(self.session_id.clone());
        if let Err(e) = send_message(transport.as_mut(), &join).await {
            return self.drop_transport(transport, e).await;
        }
        if let Some(geometry) = self.resize.current() {
            let msg = ClientMessage::resize_request(geometry.cols, geometry.rows);
            if let Err(e) = send_message(transport.as_mut(), &msg).await {
                return self.drop_transport(transport, e).await;
            }
        }

        self.pump(transport).await
    }

    /// Dial the relay, still honoring commands; `Err` carries the exit phase
    async fn open_transport(&mut self) -> std::result::Result<Box<dyn Transport>, Phase> {
        let token = self.token.clone().unwrap_or_default();
        let connect = self.connector.connect(&self.config.relay_url, &token);
        tokio::pin!(connect);

        loop {
            let step = tokio::select! {
                result = &mut connect => Some(result),
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(Command::Resize { cols, rows }) => {
                            self.resize.note_local(cols, rows);
                            continue;
                        }
                        Some(Command::Input(_)) => continue,
                        Some(Command::Stop) | None => None,
                    }
                }
            };

            return match step {
                Some(Ok(transport)) => Ok(transport),
                Some(Err(ConnectError::Rejected)) => {
                    self.set_state(ConnectionState::Failed(Failure::AuthRejected));
                    Err(Phase::Halt)
                }
                Some(Err(ConnectError::Failed(e))) => {
                    tracing::warn!("session {}: connect failed: {}", self.session_id, e);
                    self.set_state(ConnectionState::Disconnected);
                    Err(Phase::Backoff)
                }
                None => Err(Phase::Halt),
            };
        }
    }

    async fn pump(&mut self, mut transport: Box<dyn Transport>) -> Phase {
        loop {
            let step = tokio::select! {
                event = transport.recv() => Step::Transport(event),
                cmd = self.cmd_rx.recv() => Step::Cmd(cmd),
            };

            match step {
                Step::Transport(Some(TransportEvent::Binary(data))) => {
                    if let Err(e) = self.on_output_bytes(&data) {
                        tracing::warn!("session {}: protocol violation: {}", self.session_id, e);
                        return self.drop_transport(transport, e).await;
                    }
                }
                Step::Transport(Some(TransportEvent::Text(text))) => {
                    if let Some(phase) = self.on_control(&text, transport.as_mut()).await {
                        self.teardown(&mut transport).await;
                        return phase;
                    }
                }
                Step::Transport(Some(TransportEvent::Closed { code })) => {
                    self.teardown(&mut transport).await;
                    if code == Some(CLOSE_POLICY_VIOLATION) {
                        tracing::warn!("session {}: relay rejected credentials", self.session_id);
                        self.set_state(ConnectionState::Failed(Failure::AuthRejected));
                        return Phase::Halt;
                    }
                    tracing::info!(
                        "session {}: connection lost (code {:?})",
                        self.session_id,
                        code
                    );
                    self.set_state(ConnectionState::Disconnected);
                    return Phase::Backoff;
                }
                Step::Transport(None) => {
                    // Stream ended without a close frame: transient.
                    self.teardown(&mut transport).await;
                    self.set_state(ConnectionState::Disconnected);
                    return Phase::Backoff;
                }
                Step::Cmd(Some(Command::Input(data))) => {
                    let geometry = self.resize.current().map(|g| (g.cols, g.rows));
                    let msg = ClientMessage::input(data, geometry);
                    if let Err(e) = send_message(transport.as_mut(), &msg).await {
                        return self.drop_transport(transport, e).await;
                    }
                }
                Step::Cmd(Some(Command::Resize { cols, rows })) => {
                    if let Some(geometry) = self.resize.note_local(cols, rows) {
                        let msg = ClientMessage::resize_request(geometry.cols, geometry.rows);
                        if let Err(e) = send_message(transport.as_mut(), &msg).await {
                            return self.drop_transport(transport, e).await;
                        }
                    }
                }
                Step::Cmd(Some(Command::Stop)) | Step::Cmd(None) => {
                    self.teardown(&mut transport).await;
                    return Phase::Halt;
                }
            }
        }
    }

    /// Dispatch one control message; `Some(phase)` leaves the pump loop
    async fn on_control(
        &mut self,
        text: &str,
        transport: &mut dyn Transport,
    ) -> Option<Phase> {
        let Some(msg) = ControlMessage::parse(text) else {
            tracing::trace!("session {}: dropping malformed control message", self.session_id);
            return None;
        };

        match msg {
            ControlMessage::Resize { cols, rows } => {
                if let Err(e) = self.resize.apply_remote(self.surface.as_mut(), cols, rows) {
                    tracing::warn!("session {}: surface resize failed: {}", self.session_id, e);
                }
                None
            }
            ControlMessage::AgentMetadata { metadata } => {
                self.history
                    .configure(&metadata, &self.config.replay_agents, Instant::now());
                None
            }
            ControlMessage::HistoryComplete => {
                self.history.mark_complete();
                None
            }
            ControlMessage::Error { message } => {
                // Surfaced to the user but the transport stays open.
                tracing::warn!("session {}: relay error: {}", self.session_id, message);
                self.set_state(ConnectionState::Failed(Failure::Relay(message)));
                None
            }
            ControlMessage::SessionEnded => {
                tracing::info!("session {}: ended by remote", self.session_id);
                transport.close().await;
                self.set_state(ConnectionState::Ended);
                Some(Phase::Halt)
            }
            ControlMessage::Unknown => {
                tracing::trace!("session {}: ignoring unknown control message", self.session_id);
                None
            }
        }
    }

    /// Feed transport bytes through frame reassembly and on to the surface
    fn on_output_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.decoder.append(data);
        while let Some(frame) = self.decoder.next_frame()? {
            match frame.kind {
                FrameKind::Output => {
                    let text = self.utf8.push(&frame.payload);
                    if text.is_empty() {
                        continue;
                    }
                    let filtered = self.history.filter(&text, Instant::now());
                    if filtered.is_empty() {
                        continue;
                    }
                    if let Err(e) = self.surface.write(&filtered) {
                        tracing::warn!("session {}: surface write failed: {}", self.session_id, e);
                    }
                }
                FrameKind::Reserved(kind) => {
                    tracing::trace!("session {}: ignoring frame type {}", self.session_id, kind);
                }
            }
        }
        Ok(())
    }

    /// Close a transport after a send/protocol failure and schedule a retry
    async fn drop_transport(&mut self, mut transport: Box<dyn Transport>, err: StreamError) -> Phase {
        tracing::warn!("session {}: dropping transport: {}", self.session_id, err);
        self.teardown(&mut transport).await;
        self.set_state(ConnectionState::Disconnected);
        Phase::Backoff
    }

    /// Release per-connection resources; safe to call repeatedly
    async fn teardown(&mut self, transport: &mut Box<dyn Transport>) {
        transport.close().await;
        self.reset_stream();
    }

    fn reset_stream(&mut self) {
        self.decoder.reset();
        self.utf8.reset();
        self.history.reset();
    }

    /// Wait out the fixed reconnect delay, still honoring commands
    async fn backoff(&mut self) -> Phase {
        let deadline = Instant::now() + self.config.reconnect_delay;
        loop {
            let step = tokio::select! {
                _ = tokio::time::sleep_until(deadline) => None,
                cmd = self.cmd_rx.recv() => Some(cmd),
            };

            match step {
                None => return Phase::Connect,
                Some(Some(Command::Resize { cols, rows })) => {
                    self.resize.note_local(cols, rows);
                }
                Some(Some(Command::Input(_))) => {
                    // A disconnected remote cannot receive input; drop it.
                    tracing::trace!("session {}: dropping input while disconnected", self.session_id);
                }
                Some(Some(Command::Stop)) | Some(None) => return Phase::Halt,
            }
        }
    }
}

async fn send_message(transport: &mut dyn Transport, msg: &ClientMessage) -> Result<()> {
    transport.send_text(msg.to_json()?).await
}
