// Chat session client - owns the realtime socket for the active conversation
//
// One actor task holds the connection state and is the only place that
// opens, uses or drops the socket. Callers talk to it through a cloneable
// `SessionHandle`; transport callbacks (handshake result, inbound frames,
// errors, close, reconnect timer) come back to it as messages tagged with
// the connection generation that produced them, so callbacks from a
// superseded socket are ignored.
//
// Lifecycle:
//   Idle --connect--> Connecting --handshake ok--> Open
//   Connecting --handshake failed--> Idle (+notice, reconnect after delay)
//   Open --stream ended--> Idle (reconnect after delay while active)
//   any --deactivate/shutdown--> Closing --> Idle

use super::frame::{InboundFrame, OutboundFrame};
use super::transport::{Connection, Connector, FrameSink, TransportError};
use crate::auth::AuthSession;
use crate::config::Transport;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// Shown when a send finds the socket not open; the payload is dropped
pub const RECONNECTING_NOTICE: &str = "Reconnecting to the assistant… please send your message again.";

/// Shown once per transport failure (handshake or read/write error)
pub const CONNECTION_ERROR_NOTICE: &str = "⚠️ Connection error. Retrying shortly…";

/// Identifier of the server-side conversation record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationHandle {
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closing,
}

impl ConnectionState {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "offline",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "online",
            ConnectionState::Closing => "closing",
        }
    }
}

/// What the session reports to the UI
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Frame(InboundFrame),
    /// Transport status line for the transcript
    Notice(String),
}

enum Command {
    Connect,
    /// Connect and report once the attempt has settled
    ConnectAndWait(oneshot::Sender<ConnectionState>),
    Send(OutboundFrame),
    Activate(ConversationHandle),
    Deactivate,
    Shutdown,
}

enum Callback {
    Handshake {
        generation: u64,
        result: Result<Connection, TransportError>,
    },
    Frame {
        generation: u64,
        text: String,
    },
    Failed {
        generation: u64,
        error: TransportError,
    },
    Closed {
        generation: u64,
    },
    ReconnectDue,
}

/// Cloneable handle to the session actor
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
}

impl SessionHandle {
    /// Start the actor. Returns the handle and the event stream for the UI.
    pub fn spawn(
        connector: Arc<dyn Connector>,
        transport: Transport,
        auth: Arc<AuthSession>,
        reconnect_delay: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (callbacks_tx, callbacks_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);

        let actor = SessionActor {
            connector,
            transport,
            auth,
            reconnect_delay,
            state: state_tx,
            sink: None,
            reader: None,
            generation: 0,
            active: None,
            reconnect_pending: false,
            waiters: Vec::new(),
            events: events_tx,
            callbacks: callbacks_tx,
        };
        tokio::spawn(actor.run(commands_rx, callbacks_rx));

        (
            Self {
                commands: commands_tx,
                state: state_rx,
            },
            events_rx,
        )
    }

    fn command(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::debug!("Session actor already stopped");
        }
    }

    /// Open the socket unless it is already connecting or open
    pub fn connect(&self) {
        self.command(Command::Connect);
    }

    /// Connect and wait for the handshake to finish.
    ///
    /// Returns `Open` on success; `Idle` when there is nothing to connect
    /// for, the handshake failed or the session stopped.
    pub async fn open(&self) -> ConnectionState {
        let (tx, rx) = oneshot::channel();
        self.command(Command::ConnectAndWait(tx));
        rx.await.unwrap_or(ConnectionState::Idle)
    }

    /// Send now if open; otherwise notify, reconnect and drop the payload
    pub fn send(&self, frame: OutboundFrame) {
        self.command(Command::Send(frame));
    }

    /// Mark a conversation active; the socket may exist only while one is
    pub fn activate(&self, handle: ConversationHandle) {
        self.command(Command::Activate(handle));
    }

    /// Forget the active conversation and close the socket without retrying
    pub fn deactivate(&self) {
        self.command(Command::Deactivate);
    }

    pub fn shutdown(&self) {
        self.command(Command::Shutdown);
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }
}

struct SessionActor {
    connector: Arc<dyn Connector>,
    transport: Transport,
    auth: Arc<AuthSession>,
    reconnect_delay: Duration,
    state: watch::Sender<ConnectionState>,
    sink: Option<Box<dyn FrameSink>>,
    reader: Option<JoinHandle<()>>,
    /// Bumped for every connection attempt and every forced drop
    generation: u64,
    active: Option<ConversationHandle>,
    reconnect_pending: bool,
    /// Callers of `open()` waiting on the current attempt
    waiters: Vec<oneshot::Sender<ConnectionState>>,
    events: mpsc::UnboundedSender<SessionEvent>,
    callbacks: mpsc::UnboundedSender<Callback>,
}

impl SessionActor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut callbacks: mpsc::UnboundedReceiver<Callback>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                Some(callback) = callbacks.recv() => self.handle_callback(callback).await,
            }
        }

        self.active = None;
        self.close_connection().await;
        tracing::debug!("Session actor stopped");
    }

    fn current(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.current() != state {
            tracing::debug!("Chat socket {} -> {}", self.current().label(), state.label());
            self.state.send_replace(state);
        }
        if matches!(state, ConnectionState::Open | ConnectionState::Idle) {
            for waiter in self.waiters.drain(..) {
                let _ = waiter.send(state);
            }
        }
    }

    fn emit(&self, event: SessionEvent) {
        // UI gone means we are shutting down
        let _ = self.events.send(event);
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect => self.connect(),
            Command::ConnectAndWait(waiter) => {
                self.connect();
                match self.current() {
                    ConnectionState::Connecting => self.waiters.push(waiter),
                    state => {
                        let _ = waiter.send(state);
                    }
                }
            }
            Command::Send(frame) => self.send(frame).await,
            Command::Activate(handle) => {
                tracing::info!("Conversation {} active", handle.id);
                self.active = Some(handle);
            }
            Command::Deactivate => {
                self.active = None;
                self.close_connection().await;
            }
            Command::Shutdown => {}
        }
    }

    async fn handle_callback(&mut self, callback: Callback) {
        match callback {
            Callback::Handshake { generation, result } => {
                self.on_handshake(generation, result).await
            }
            Callback::Frame { generation, text } if generation == self.generation => {
                self.emit(SessionEvent::Frame(InboundFrame::decode(&text)));
            }
            Callback::Failed { generation, error } if generation == self.generation => {
                tracing::warn!("Chat socket error: {}", error);
                self.emit(SessionEvent::Notice(CONNECTION_ERROR_NOTICE.to_string()));
            }
            Callback::Closed { generation } if generation == self.generation => {
                tracing::info!("Chat socket closed");
                self.sink = None;
                self.reader = None;
                self.set_state(ConnectionState::Idle);
                self.schedule_reconnect();
            }
            Callback::ReconnectDue => {
                self.reconnect_pending = false;
                self.connect();
            }
            _ => tracing::trace!("Ignoring callback from superseded socket"),
        }
    }

    fn connect(&mut self) {
        match self.current() {
            ConnectionState::Connecting | ConnectionState::Open => return,
            ConnectionState::Idle | ConnectionState::Closing => {}
        }
        let Some(conversation) = &self.active else {
            tracing::debug!("No active conversation, not connecting");
            return;
        };
        let Some(token) = self.auth.token() else {
            tracing::warn!("Not signed in, not connecting");
            return;
        };

        let url = self.transport.chat_socket_url(&token.value);
        self.generation += 1;
        let generation = self.generation;
        tracing::info!(
            "Connecting chat socket for conversation {} (attempt {})",
            conversation.id,
            generation
        );
        self.set_state(ConnectionState::Connecting);

        let connector = self.connector.clone();
        let callbacks = self.callbacks.clone();
        tokio::spawn(async move {
            let result = connector.connect(&url).await;
            let _ = callbacks.send(Callback::Handshake { generation, result });
        });
    }

    async fn on_handshake(&mut self, generation: u64, result: Result<Connection, TransportError>) {
        let current =
            generation == self.generation && self.current() == ConnectionState::Connecting;

        match result {
            Ok(mut connection) if !current => {
                connection.sink.close().await;
            }
            Ok(connection) => {
                let Connection { sink, mut frames } = connection;
                let callbacks = self.callbacks.clone();
                self.reader = Some(tokio::spawn(async move {
                    while let Some(item) = frames.next().await {
                        match item {
                            Ok(text) => {
                                let _ = callbacks.send(Callback::Frame { generation, text });
                            }
                            Err(error) => {
                                let _ = callbacks.send(Callback::Failed { generation, error });
                                break;
                            }
                        }
                    }
                    let _ = callbacks.send(Callback::Closed { generation });
                }));
                self.sink = Some(sink);
                self.set_state(ConnectionState::Open);
                tracing::info!("Chat socket open");
            }
            Err(_) if !current => {}
            Err(error) => {
                tracing::warn!("Chat socket handshake failed: {}", error);
                self.emit(SessionEvent::Notice(CONNECTION_ERROR_NOTICE.to_string()));
                self.set_state(ConnectionState::Idle);
                self.schedule_reconnect();
            }
        }
    }

    async fn send(&mut self, frame: OutboundFrame) {
        let open = self.current() == ConnectionState::Open;
        let Some(sink) = self.sink.as_mut().filter(|_| open) else {
            tracing::info!("Send while {}, dropping payload", self.current().label());
            self.emit(SessionEvent::Notice(RECONNECTING_NOTICE.to_string()));
            self.connect();
            return;
        };

        let text = match serde_json::to_string(&frame) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Failed to encode frame: {}", e);
                return;
            }
        };

        let written = sink.send_text(text).await;
        if let Err(error) = written {
            tracing::warn!("Chat socket write failed: {}", error);
            self.emit(SessionEvent::Notice(CONNECTION_ERROR_NOTICE.to_string()));
            self.drop_connection();
            self.schedule_reconnect();
        }
    }

    /// Forget the socket without a close handshake
    fn drop_connection(&mut self) {
        self.generation += 1;
        self.sink = None;
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        self.set_state(ConnectionState::Idle);
    }

    /// Orderly close; no reconnect follows because callbacks are now stale
    async fn close_connection(&mut self) {
        if self.sink.is_none() && self.current() == ConnectionState::Idle {
            return;
        }
        self.set_state(ConnectionState::Closing);
        if let Some(mut sink) = self.sink.take() {
            sink.close().await;
        }
        self.drop_connection();
    }

    fn schedule_reconnect(&mut self) {
        if self.active.is_none() || self.reconnect_pending {
            return;
        }
        self.reconnect_pending = true;
        tracing::debug!("Reconnecting in {:?}", self.reconnect_delay);

        let delay = self.reconnect_delay;
        let callbacks = self.callbacks.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = callbacks.send(Callback::ReconnectDue);
        });
    }
}
