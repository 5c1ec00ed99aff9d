//! ConnectionManager: owns the TCP connection to the display and drives the
//! request/response transmission protocol over it.
//!
//! # State machine
//!
//! ```text
//! ParametersUnknown --set_endpoint--> NotConnected
//! NotConnected / Failed --connect--> Connecting --ok--> Connected
//!                                               --timeout/error--> Failed
//! Connected --disconnect / keep-alive failure--> NotConnected
//! Connected --transmit--> Sending --done/abort--> Connected
//! ```
//!
//! # Why a worker task? (for beginners)
//!
//! The display answers every header and packet with exactly one response
//! byte.  If a keep-alive probe were written while a data packet was still
//! waiting for its answer, the two exchanges would steal each other's
//! response.  To rule that out, a single background task owns the socket and
//! processes one command at a time from an `mpsc` queue.  The keep-alive and
//! status-clear timers are deadlines inside the same task's `select!` loop,
//! so they can only fire *between* commands, never during one.
//!
//! [`ConnectionManager`] is the cheap, cloneable handle callers hold.  Every
//! method sends a command and awaits the worker's reply on a `oneshot`
//! channel.  Status changes are published on a `watch` channel.
//!
//! When every handle is dropped (or [`ConnectionManager::shutdown`] is
//! called) the worker disconnects and exits.

use std::fmt;
use std::future;
use std::net::SocketAddr;
use std::time::Duration;

use dotmatrix_core::{
    check_encodable, encode_packet, transmission_header, ConnectionEndpoint, Message, MessageKind,
    ProtocolError, ResponseCode,
};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpSocket, TcpStream};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

/// Default time allowed for the TCP handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(3000);
/// Default time to wait for the display's response byte.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_millis(5000);
/// Default delay between keep-alive probes.
pub const DEFAULT_KEEP_ALIVE_INTERVAL: Duration = Duration::from_millis(20_000);
/// Default delay before a finished transmission's progress text is cleared.
pub const DEFAULT_STATUS_CLEAR: Duration = Duration::from_millis(5000);

const COMMAND_QUEUE_DEPTH: usize = 16;
const REPLY_BUFFER_SIZE: usize = 64;

/// Error type for connection manager operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("Connection parameters not set")]
    ParametersUnknown,

    /// Carries the human-readable reason also stored in `LinkStatus::last_error`.
    #[error("{0}")]
    ConnectFailed(String),

    #[error("not connected to the display")]
    NotConnected,

    #[error("{kind} transmission failed, got '{code}' response")]
    Rejected {
        kind: MessageKind,
        code: ResponseCode,
    },

    /// The message does not fit the wire format; nothing was sent.
    #[error("message cannot be encoded: {0}")]
    Unencodable(ProtocolError),

    #[error("connection worker has stopped")]
    WorkerStopped,
}

/// Lifecycle state of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkState {
    ParametersUnknown,
    NotConnected,
    Connecting,
    Connected,
    Sending,
    Failed,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ParametersUnknown => "ParametersUnknown",
            Self::NotConnected => "NotConnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Sending => "Sending",
            Self::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// Snapshot published to observers after every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkStatus {
    pub state: LinkState,
    pub endpoint: Option<ConnectionEndpoint>,
    /// Reason the most recent connect attempt failed.
    pub last_error: Option<String>,
    /// Transient transmission progress; cleared a while after each transmission.
    pub progress: Option<String>,
}

impl Default for LinkStatus {
    fn default() -> Self {
        Self {
            state: LinkState::ParametersUnknown,
            endpoint: None,
            last_error: None,
            progress: None,
        }
    }
}

/// Timeouts and intervals used by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTimings {
    pub connect_timeout: Duration,
    pub response_timeout: Duration,
    pub keep_alive_interval: Duration,
    pub status_clear: Duration,
}

impl Default for LinkTimings {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            keep_alive_interval: DEFAULT_KEEP_ALIVE_INTERVAL,
            status_clear: DEFAULT_STATUS_CLEAR,
        }
    }
}

// ── Handle ────────────────────────────────────────────────────────────────────

enum Command {
    SetEndpoint(ConnectionEndpoint, oneshot::Sender<()>),
    Connect(oneshot::Sender<Result<(), LinkError>>),
    Disconnect(oneshot::Sender<()>),
    Transmit(Message, oneshot::Sender<Result<(), LinkError>>),
    KeepAlive(oneshot::Sender<Result<ResponseCode, LinkError>>),
    Shutdown,
}

/// Cloneable handle to the connection worker.
#[derive(Clone)]
pub struct ConnectionManager {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<LinkStatus>,
}

impl ConnectionManager {
    /// Spawns the connection worker on the current Tokio runtime.
    ///
    /// The manager starts in [`LinkState::ParametersUnknown`].
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn(timings: LinkTimings) -> Self {
        let (commands, queue) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let (worker, status) = LinkWorker::new(timings);
        tokio::spawn(worker.run(queue));
        Self { commands, status }
    }

    /// Sets the endpoint used by every later [`connect`](Self::connect).
    pub async fn set_endpoint(&self, endpoint: ConnectionEndpoint) -> Result<(), LinkError> {
        self.request(|reply| Command::SetEndpoint(endpoint, reply)).await
    }

    /// Opens the connection, bounded by the connect timeout.
    ///
    /// # Errors
    ///
    /// [`LinkError::ParametersUnknown`] if no endpoint was set, or
    /// [`LinkError::ConnectFailed`] if the socket could not connect in time.
    pub async fn connect(&self) -> Result<(), LinkError> {
        self.request(Command::Connect).await?
    }

    /// Closes the connection.  A no-op when nothing is connected.
    pub async fn disconnect(&self) -> Result<(), LinkError> {
        self.request(Command::Disconnect).await
    }

    /// Sends `message` header first, then every packet, awaiting one response
    /// byte after each.  A `ChecksumMismatch` response resends the same packet.
    ///
    /// # Errors
    ///
    /// [`LinkError::NotConnected`] (or `ParametersUnknown`) when there is no
    /// open connection, or [`LinkError::Rejected`] with the first response
    /// that was neither `Ok` nor `ChecksumMismatch`.
    pub async fn transmit(&self, message: Message) -> Result<(), LinkError> {
        self.request(|reply| Command::Transmit(message, reply)).await?
    }

    /// Runs one keep-alive exchange right away and returns the response code.
    ///
    /// A non-`Ok` response disconnects, exactly like a timer-driven probe.
    pub async fn keep_alive(&self) -> Result<ResponseCode, LinkError> {
        self.request(Command::KeepAlive).await?
    }

    /// Returns the latest status snapshot.
    pub fn status(&self) -> LinkStatus {
        self.status.borrow().clone()
    }

    /// Returns a receiver that is notified on every status change.
    pub fn subscribe(&self) -> watch::Receiver<LinkStatus> {
        self.status.clone()
    }

    /// Stops the worker, closing any open connection.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, LinkError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| LinkError::WorkerStopped)?;
        response.await.map_err(|_| LinkError::WorkerStopped)
    }
}

// ── Worker ────────────────────────────────────────────────────────────────────

/// The task that exclusively owns the socket.
struct LinkWorker {
    timings: LinkTimings,
    endpoint: Option<ConnectionEndpoint>,
    stream: Option<TcpStream>,
    status: watch::Sender<LinkStatus>,
    keep_alive_at: Option<Instant>,
    clear_progress_at: Option<Instant>,
}

impl LinkWorker {
    fn new(timings: LinkTimings) -> (Self, watch::Receiver<LinkStatus>) {
        let (status, observer) = watch::channel(LinkStatus::default());
        let worker = Self {
            timings,
            endpoint: None,
            stream: None,
            status,
            keep_alive_at: None,
            clear_progress_at: None,
        };
        (worker, observer)
    }

    async fn run(mut self, mut queue: mpsc::Receiver<Command>) {
        loop {
            tokio::select! {
                command = queue.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle(command).await,
                },
                _ = sleep_until(self.keep_alive_at) => self.keep_alive_tick().await,
                _ = sleep_until(self.clear_progress_at) => self.clear_progress(),
            }
        }
        self.disconnect().await;
        debug!("connection worker stopped");
    }

    async fn handle(&mut self, command: Command) {
        // A dropped reply receiver only means the caller stopped waiting.
        match command {
            Command::SetEndpoint(endpoint, reply) => {
                self.set_endpoint(endpoint);
                let _ = reply.send(());
            }
            Command::Connect(reply) => {
                let _ = reply.send(self.connect().await);
            }
            Command::Disconnect(reply) => {
                self.disconnect().await;
                let _ = reply.send(());
            }
            Command::Transmit(message, reply) => {
                let _ = reply.send(self.transmit(message).await);
            }
            Command::KeepAlive(reply) => {
                let result = match self.require_connected() {
                    Ok(()) => Ok(self.probe().await),
                    Err(e) => Err(e),
                };
                let _ = reply.send(result);
            }
            Command::Shutdown => {}
        }
    }

    // ── State helpers ─────────────────────────────────────────────────────────

    fn state(&self) -> LinkState {
        self.status.borrow().state
    }

    fn set_state(&self, state: LinkState) {
        self.status.send_modify(|s| s.state = state);
    }

    fn set_progress(&self, text: String) {
        debug!("{text}");
        self.status.send_modify(|s| s.progress = Some(text));
    }

    fn clear_progress(&mut self) {
        self.clear_progress_at = None;
        self.status.send_modify(|s| s.progress = None);
    }

    fn arm_keep_alive(&mut self) {
        self.keep_alive_at = Some(Instant::now() + self.timings.keep_alive_interval);
    }

    fn require_connected(&self) -> Result<(), LinkError> {
        match self.state() {
            LinkState::Connected if self.stream.is_some() => Ok(()),
            LinkState::ParametersUnknown => Err(LinkError::ParametersUnknown),
            _ => Err(LinkError::NotConnected),
        }
    }

    // ── Operations ────────────────────────────────────────────────────────────

    fn set_endpoint(&mut self, endpoint: ConnectionEndpoint) {
        info!("display endpoint set to {endpoint}");
        self.endpoint = Some(endpoint);
        self.status.send_modify(|s| {
            s.endpoint = Some(endpoint);
            if s.state == LinkState::ParametersUnknown {
                s.state = LinkState::NotConnected;
            }
        });
    }

    async fn connect(&mut self) -> Result<(), LinkError> {
        let Some(endpoint) = self.endpoint else {
            let error = LinkError::ParametersUnknown;
            self.status.send_modify(|s| s.last_error = Some(error.to_string()));
            return Err(error);
        };
        if self.stream.is_some() {
            debug!("connect requested while already connected to {endpoint}");
            return Ok(());
        }

        self.status.send_modify(|s| {
            s.state = LinkState::Connecting;
            s.last_error = None;
        });
        info!("connecting to {endpoint}");

        match open_stream(endpoint.socket_addr(), self.timings.connect_timeout).await {
            Ok(stream) => {
                self.stream = Some(stream);
                self.set_state(LinkState::Connected);
                self.arm_keep_alive();
                info!("connected to {endpoint}");
                Ok(())
            }
            Err(failure) => {
                let message = failure.describe(&endpoint);
                warn!("{message}");
                self.status.send_modify(|s| {
                    s.state = LinkState::Failed;
                    s.last_error = Some(message.clone());
                });
                Err(LinkError::ConnectFailed(message))
            }
        }
    }

    async fn disconnect(&mut self) {
        self.keep_alive_at = None;
        let Some(mut stream) = self.stream.take() else {
            return;
        };
        if let Err(e) = stream.shutdown().await {
            debug!("ignoring error while closing socket: {e}");
        }
        drop(stream);
        self.set_state(LinkState::NotConnected);
        info!("disconnected from display");
    }

    /// Writes `bytes` and waits for the single response byte.
    ///
    /// Socket failures and timeouts resolve to the local
    /// [`ResponseCode::TimeoutAccessPoint`]; malformed replies to
    /// [`ResponseCode::TargetUnexpectedPacket`].
    async fn send_and_await(&mut self, bytes: &[u8]) -> ResponseCode {
        let Some(stream) = self.stream.as_mut() else {
            return ResponseCode::TimeoutAccessPoint;
        };
        if let Err(e) = stream.write_all(bytes).await {
            warn!("write to display failed: {e}");
            return ResponseCode::TimeoutAccessPoint;
        }

        let mut reply = [0u8; REPLY_BUFFER_SIZE];
        match time::timeout(self.timings.response_timeout, stream.read(&mut reply)).await {
            Ok(Ok(n)) => ResponseCode::from_reply(&reply[..n]),
            Ok(Err(e)) => {
                warn!("read from display failed: {e}");
                ResponseCode::TimeoutAccessPoint
            }
            Err(_) => {
                warn!(
                    "no response from display within {} ms",
                    self.timings.response_timeout.as_millis()
                );
                ResponseCode::TimeoutAccessPoint
            }
        }
    }

    async fn transmit(&mut self, message: Message) -> Result<(), LinkError> {
        self.require_connected()?;
        if let Err(e) = check_encodable(&message) {
            warn!("refusing to transmit: {e}");
            return Err(LinkError::Unencodable(e));
        }

        let kind = message.kind();
        let total = usize::from(message.packet_count());
        let label = match kind {
            MessageKind::AnimationFrames => "Frame",
            _ => "Packet",
        };

        self.set_state(LinkState::Sending);
        self.clear_progress_at = None;
        info!("transmitting {kind} ({total} packet(s))");
        self.set_progress(format!("Transmitting {kind} header..."));

        let code = self.send_and_await(&transmission_header(&message)).await;
        if !code.is_ok() {
            return self.finish_transmission(kind, Err(code));
        }

        let mut index = 0;
        let mut resending = false;
        while let Some(packet) = encode_packet(&message, index) {
            let action = if resending {
                "Checksum mismatch, sending again"
            } else {
                "Sending"
            };
            self.set_progress(format!("[{label} {}/{total}] {action}...", index + 1));

            match self.send_and_await(&packet).await {
                ResponseCode::Ok => {
                    index += 1;
                    resending = false;
                }
                ResponseCode::ChecksumMismatch => {
                    warn!("checksum mismatch on {label} {}/{total}, resending", index + 1);
                    resending = true;
                }
                code => return self.finish_transmission(kind, Err(code)),
            }
        }

        self.finish_transmission(kind, Ok(()))
    }

    fn finish_transmission(
        &mut self,
        kind: MessageKind,
        outcome: Result<(), ResponseCode>,
    ) -> Result<(), LinkError> {
        let text = match outcome {
            Ok(()) => {
                info!("{kind} transmission complete");
                "Successfully transmitted all data".to_string()
            }
            Err(code) => {
                warn!("{kind} transmission failed with {code}");
                format!("Transmission failed, got '{code}' response")
            }
        };
        self.status.send_modify(|s| {
            s.state = LinkState::Connected;
            s.progress = Some(text);
        });
        self.clear_progress_at = Some(Instant::now() + self.timings.status_clear);
        self.arm_keep_alive();
        outcome.map_err(|code| LinkError::Rejected { kind, code })
    }

    /// One keep-alive exchange; any response but `Ok` disconnects.
    async fn probe(&mut self) -> ResponseCode {
        let code = self
            .send_and_await(&transmission_header(&Message::KeepAlive))
            .await;
        if code.is_ok() {
            debug!("keep-alive ok");
            self.arm_keep_alive();
        } else {
            warn!("keep-alive got '{code}' response, disconnecting");
            self.disconnect().await;
        }
        code
    }

    async fn keep_alive_tick(&mut self) {
        match self.state() {
            LinkState::Sending => {
                debug!("keep-alive postponed while sending");
                self.arm_keep_alive();
            }
            LinkState::Connected if self.stream.is_some() => {
                self.probe().await;
            }
            _ => self.keep_alive_at = None,
        }
    }
}

/// Sleeps until `deadline`, or forever when there is none.
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}

// ── Socket setup ──────────────────────────────────────────────────────────────

#[derive(Debug)]
enum ConnectFailure {
    TimedOut,
    Io(std::io::Error),
}

impl ConnectFailure {
    fn describe(&self, endpoint: &ConnectionEndpoint) -> String {
        match self {
            Self::TimedOut => format!("Connection to {endpoint} timed-out"),
            Self::Io(e) => format!("Connection to {endpoint} failed: {e}"),
        }
    }
}

/// Opens a TCP connection to `addr` within `timeout`.
///
/// Linger stays at the OS default (disabled), so closing never blocks on
/// unsent data.
async fn open_stream(addr: SocketAddr, timeout: Duration) -> Result<TcpStream, ConnectFailure> {
    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4(),
        SocketAddr::V6(_) => TcpSocket::new_v6(),
    }
    .map_err(ConnectFailure::Io)?;

    let stream = time::timeout(timeout, socket.connect(addr))
        .await
        .map_err(|_| ConnectFailure::TimedOut)?
        .map_err(ConnectFailure::Io)?;
    stream.set_nodelay(true).map_err(ConnectFailure::Io)?;
    Ok(stream)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
