//! ConnectionManager - owns the push channel for one credential.
//!
//! Lifecycle:
//! 1. `connect(credential)` closes any previous connection, derives the
//!    endpoint and spawns the connection task
//! 2. The task opens the socket and forwards text frames to the returned receiver
//! 3. On drop or error it waits out a backoff delay and reconnects
//! 4. After `max_attempts` consecutive failures it gives up (`Disconnected`).
//!    A connection only counts as healthy once it delivered a frame or
//!    stayed open for [`STABLE_CONNECTION`]
//! 5. A policy close from the server (1008, 4000-4999) ends retrying at once
//! 6. `close()` (or dropping the manager) ends the task (`Closed`)
//!
//! Transport failures are logged and never surfaced as errors to callers.

use std::time::{Duration, Instant};

use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{Backoff, WsEndpoint};
use crate::config::RealtimeConfig;

/// Observable state of the push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection requested yet.
    Idle,
    /// Socket being opened.
    Connecting,
    /// Frames are flowing.
    Open,
    /// Waiting out the backoff delay before attempt `attempt`.
    Reconnecting { attempt: u32 },
    /// Retry budget spent; real-time delivery has stopped.
    Disconnected,
    /// Closed by the owner.
    Closed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Reconnecting { attempt } => write!(f, "reconnecting (attempt {})", attempt),
            Self::Disconnected => write!(f, "disconnected"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// How long a silent connection must stay open before the retry budget is
/// restored.
pub const STABLE_CONNECTION: Duration = Duration::from_secs(5);

/// Receiver of raw inbound text frames.
pub type FrameReceiver = mpsc::UnboundedReceiver<String>;

/// Owns at most one live push connection.
pub struct ConnectionManager {
    api_base: String,
    config: RealtimeConfig,
    state: watch::Sender<ConnectionState>,
    outbound: Option<mpsc::UnboundedSender<Message>>,
    cancel: Option<CancellationToken>,
}

impl ConnectionManager {
    /// Creates an idle manager for the given REST base URL.
    pub fn new(api_base: impl Into<String>, config: RealtimeConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Idle);
        Self {
            api_base: api_base.into(),
            config,
            state,
            outbound: None,
            cancel: None,
        }
    }

    /// Opens the push channel for `credential`.
    ///
    /// An existing connection is always closed first. A blank credential
    /// then returns `None` without a new attempt. Must be called within a
    /// Tokio runtime.
    pub fn connect(&mut self, credential: &str) -> Option<FrameReceiver> {
        self.close();

        let credential = credential.trim();
        if credential.is_empty() {
            tracing::debug!("No credential available, skipping push connection");
            return None;
        }

        let endpoint = match WsEndpoint::from_api_base(&self.api_base, credential) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                tracing::warn!("Push endpoint unavailable (non-critical): {}", e);
                return None;
            }
        };

        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        self.state.send_replace(ConnectionState::Connecting);
        tokio::spawn(run_connection(
            endpoint,
            Backoff::new(&self.config),
            self.state.clone(),
            frames_tx,
            outbound_rx,
            cancel.clone(),
        ));

        self.outbound = Some(outbound_tx);
        self.cancel = Some(cancel);
        Some(frames_rx)
    }

    /// Current state, read at call time.
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    pub fn is_open(&self) -> bool {
        *self.state.borrow() == ConnectionState::Open
    }

    /// Watch channel of state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Serializes and sends `payload` if the channel is open.
    ///
    /// Returns whether the message was handed to the socket writer. Nothing
    /// is queued while the channel is not open.
    pub fn send<T: Serialize>(&self, payload: &T) -> bool {
        if !self.is_open() {
            tracing::debug!(state = %self.state(), "Push channel not open, dropping outbound message");
            return false;
        }
        let Some(outbound) = &self.outbound else {
            return false;
        };
        match serde_json::to_string(payload) {
            Ok(text) => outbound.send(Message::Text(text)).is_ok(),
            Err(e) => {
                tracing::warn!("Failed to serialize outbound message: {}", e);
                false
            }
        }
    }

    /// Closes the channel. Safe to call repeatedly or before `connect`.
    pub fn close(&mut self) {
        self.outbound = None;
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
            self.state.send_replace(ConnectionState::Closed);
            tracing::debug!("Push connection closed by owner");
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close();
    }
}

/// Sets the state unless the owner has already closed the connection.
///
/// The check runs under the watch lock, so a concurrent `close()` can never
/// be overwritten.
fn set_state(
    state: &watch::Sender<ConnectionState>,
    cancel: &CancellationToken,
    next: ConnectionState,
) {
    state.send_if_modified(|current| {
        if cancel.is_cancelled() || *current == next {
            return false;
        }
        *current = next;
        true
    });
}

enum PumpExit {
    /// Owner closed the connection.
    Cancelled,
    /// Frame receiver dropped; nobody is listening.
    ConsumerGone,
    /// Server refused the session with a policy close; do not retry.
    Rejected(String),
    /// Transport ended; reconnect.
    Dropped(String),
}

/// Close codes after which reconnecting with the same credential is futile.
fn is_terminal_close(code: CloseCode) -> bool {
    let code = u16::from(code);
    code == 1008 || (4000..=4999).contains(&code)
}

/// Discards messages queued for a socket that is gone. Returns how many.
fn discard_pending(outbound: &mut mpsc::UnboundedReceiver<Message>) -> usize {
    let mut discarded = 0;
    while outbound.try_recv().is_ok() {
        discarded += 1;
    }
    discarded
}

async fn run_connection(
    endpoint: WsEndpoint,
    mut backoff: Backoff,
    state: watch::Sender<ConnectionState>,
    frames: mpsc::UnboundedSender<String>,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    cancel: CancellationToken,
) {
    let connection_id = Uuid::new_v4();

    loop {
        set_state(&state, &cancel, ConnectionState::Connecting);
        tracing::debug!(
            connection_id = %connection_id,
            endpoint = %endpoint.redacted(),
            attempt = backoff.attempt(),
            "Opening push connection"
        );

        let connected = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = connect_async(endpoint.as_str()) => result,
        };

        match connected {
            Ok((stream, _response)) => {
                let opened_at = Instant::now();
                set_state(&state, &cancel, ConnectionState::Open);
                tracing::info!(connection_id = %connection_id, "Push connection open");

                let (exit, received) = pump(stream, &frames, &mut outbound, &cancel).await;
                if received > 0 || opened_at.elapsed() >= STABLE_CONNECTION {
                    backoff.reset();
                }

                match exit {
                    PumpExit::Cancelled => break,
                    PumpExit::ConsumerGone => {
                        tracing::debug!(connection_id = %connection_id, "Frame consumer gone, stopping");
                        set_state(&state, &cancel, ConnectionState::Closed);
                        return;
                    }
                    PumpExit::Rejected(reason) => {
                        tracing::warn!(
                            connection_id = %connection_id,
                            "Push connection rejected by server, real-time delivery stopped: {}",
                            reason
                        );
                        set_state(&state, &cancel, ConnectionState::Disconnected);
                        return;
                    }
                    PumpExit::Dropped(reason) => {
                        let discarded = discard_pending(&mut outbound);
                        tracing::warn!(
                            connection_id = %connection_id,
                            discarded,
                            "Push connection dropped (non-critical): {}",
                            reason
                        );
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    connection_id = %connection_id,
                    "Push connection failed (non-critical): {}",
                    e
                );
            }
        }

        if backoff.exhausted() {
            tracing::warn!(
                connection_id = %connection_id,
                attempts = backoff.attempt(),
                "Giving up on push connection, real-time delivery stopped"
            );
            set_state(&state, &cancel, ConnectionState::Disconnected);
            return;
        }

        let delay = backoff.next_delay();
        set_state(
            &state,
            &cancel,
            ConnectionState::Reconnecting {
                attempt: backoff.attempt(),
            },
        );
        tracing::info!(
            connection_id = %connection_id,
            attempt = backoff.attempt(),
            delay_ms = delay.as_millis() as u64,
            "Reconnecting push connection"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    tracing::debug!(connection_id = %connection_id, "Push connection task ended");
}

/// Moves frames until the socket ends. Returns why it ended and how many
/// text frames were delivered.
async fn pump(
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    frames: &mpsc::UnboundedSender<String>,
    outbound: &mut mpsc::UnboundedReceiver<Message>,
    cancel: &CancellationToken,
) -> (PumpExit, u64) {
    let (mut write, mut read) = stream.split();
    let mut received = 0;

    let exit = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let _ = write.send(Message::Close(None)).await;
                break PumpExit::Cancelled;
            }
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    received += 1;
                    if frames.send(text).is_err() {
                        let _ = write.send(Message::Close(None)).await;
                        break PumpExit::ConsumerGone;
                    }
                }
                Some(Ok(Message::Binary(_))) => {
                    tracing::warn!("Received unsupported binary frame");
                }
                Some(Ok(Message::Close(Some(frame)))) => {
                    let reason = format!("server closed ({}): {}", u16::from(frame.code), frame.reason);
                    if is_terminal_close(frame.code) {
                        break PumpExit::Rejected(reason);
                    }
                    break PumpExit::Dropped(reason);
                }
                Some(Ok(Message::Close(None))) => break PumpExit::Dropped("server closed".to_string()),
                Some(Ok(_)) => {
                    // Protocol ping/pong - handled by tungstenite
                }
                Some(Err(e)) => break PumpExit::Dropped(e.to_string()),
                None => break PumpExit::Dropped("stream ended".to_string()),
            },
            message = outbound.recv() => match message {
                Some(message) => {
                    if let Err(e) = write.send(message).await {
                        break PumpExit::Dropped(e.to_string());
                    }
                }
                None => {
                    let _ = write.send(Message::Close(None)).await;
                    break PumpExit::Cancelled;
                }
            },
        }
    };

    (exit, received)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;

    #[derive(Clone, Copy)]
    enum ServerMode {
        Hold,
        CloseWith(CloseCode),
    }

    /// Local socket server counting completed upgrades.
    async fn spawn_server(mode: ServerMode) -> (String, Arc<AtomicUsize>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = accepted.clone();

        tokio::spawn(async move {
            while let Ok((tcp, _)) = listener.accept().await {
                let counter = counter.clone();
                tokio::spawn(async move {
                    let Ok(mut ws) = tokio_tungstenite::accept_async(tcp).await else {
                        return;
                    };
                    counter.fetch_add(1, Ordering::SeqCst);
                    if let ServerMode::CloseWith(code) = mode {
                        let _ = ws
                            .close(Some(CloseFrame {
                                code,
                                reason: "bye".into(),
                            }))
                            .await;
                    }
                    while let Some(Ok(_)) = ws.next().await {}
                });
            }
        });

        (format!("http://127.0.0.1:{}/api", port), accepted)
    }

    async fn wait_for(states: &mut watch::Receiver<ConnectionState>, wanted: ConnectionState) -> bool {
        let reached = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                if *states.borrow_and_update() == wanted {
                    return true;
                }
                if states.changed().await.is_err() {
                    return false;
                }
            }
        })
        .await;
        reached == Ok(true)
    }

    fn fast_retry(max_attempts: u32) -> RealtimeConfig {
        RealtimeConfig {
            backoff_base_ms: 5,
            backoff_max_ms: 10,
            jitter_factor: 0.0,
            max_attempts,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn blank_credential_closes_open_connection() {
        let (base, accepted) = spawn_server(ServerMode::Hold).await;
        let mut manager = ConnectionManager::new(base, fast_retry(3));
        let mut states = manager.subscribe();

        let _frames = manager.connect("token").unwrap();
        assert!(wait_for(&mut states, ConnectionState::Open).await);
        assert_eq!(accepted.load(Ordering::SeqCst), 1);

        assert!(manager.connect("").is_none());
        assert_eq!(manager.state(), ConnectionState::Closed);
        assert!(!manager.is_open());
        assert!(!manager.send(&serde_json::json!({"type": "ping"})));
    }

    #[tokio::test]
    async fn short_lived_connections_spend_retry_budget() {
        let (base, accepted) = spawn_server(ServerMode::CloseWith(CloseCode::Normal)).await;
        let mut manager = ConnectionManager::new(base, fast_retry(2));
        let mut states = manager.subscribe();
        let _frames = manager.connect("token").unwrap();

        assert!(wait_for(&mut states, ConnectionState::Disconnected).await);
        assert_eq!(accepted.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn policy_close_stops_reconnecting() {
        let (base, accepted) = spawn_server(ServerMode::CloseWith(CloseCode::Policy)).await;
        // Zero budget would otherwise retry forever.
        let mut manager = ConnectionManager::new(base, fast_retry(0));
        let mut states = manager.subscribe();
        let _frames = manager.connect("token").unwrap();

        assert!(wait_for(&mut states, ConnectionState::Disconnected).await);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(accepted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn terminal_close_codes() {
        assert!(is_terminal_close(CloseCode::Policy));
        assert!(is_terminal_close(CloseCode::from(4001)));
        assert!(is_terminal_close(CloseCode::from(4999)));
        assert!(!is_terminal_close(CloseCode::Normal));
        assert!(!is_terminal_close(CloseCode::Away));
        assert!(!is_terminal_close(CloseCode::Error));
        assert!(!is_terminal_close(CloseCode::from(3000)));
    }

    #[test]
    fn pending_messages_are_discarded() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        for n in 0..3 {
            tx.send(Message::Text(format!("queued {}", n))).unwrap();
        }

        assert_eq!(discard_pending(&mut rx), 3);
        assert_eq!(discard_pending(&mut rx), 0);

        tx.send(Message::Text("fresh".to_string())).unwrap();
        assert_eq!(rx.try_recv().unwrap(), Message::Text("fresh".to_string()));
    }

    #[tokio::test]
    async fn blank_credential_is_silent_noop() {
        let mut manager = ConnectionManager::new("http://127.0.0.1:9/api", RealtimeConfig::default());

        assert!(manager.connect("").is_none());
        assert!(manager.connect("   ").is_none());
        assert_eq!(manager.state(), ConnectionState::Idle);
    }

    #[tokio::test]
    async fn invalid_base_url_is_silent_noop() {
        let mut manager = ConnectionManager::new("not a url", RealtimeConfig::default());
        assert!(manager.connect("token").is_none());
        assert_eq!(manager.state(), ConnectionState::Idle);
    }

    #[tokio::test]
    async fn send_before_open_is_dropped() {
        let manager = ConnectionManager::new("http://127.0.0.1:9/api", RealtimeConfig::default());
        assert!(!manager.send(&serde_json::json!({"type": "ping"})));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let mut manager = ConnectionManager::new("http://127.0.0.1:9/api", RealtimeConfig::default());
        manager.close();
        manager.close();
        assert_eq!(manager.state(), ConnectionState::Idle);

        let _frames = manager.connect("token");
        manager.close();
        manager.close();
        assert_eq!(manager.state(), ConnectionState::Closed);
        assert!(!manager.is_open());
    }

    #[tokio::test]
    async fn gives_up_after_retry_budget() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = RealtimeConfig {
            backoff_base_ms: 1,
            backoff_max_ms: 5,
            jitter_factor: 0.0,
            max_attempts: 2,
            ..Default::default()
        };
        let mut manager = ConnectionManager::new(format!("http://127.0.0.1:{}/api", port), config);
        let mut states = manager.subscribe();
        let _frames = manager.connect("token").unwrap();

        assert!(wait_for(&mut states, ConnectionState::Disconnected).await);
        assert!(!manager.is_open());
    }

    #[test]
    fn state_display() {
        assert_eq!(ConnectionState::Open.to_string(), "open");
        assert_eq!(
            ConnectionState::Reconnecting { attempt: 3 }.to_string(),
            "reconnecting (attempt 3)"
        );
    }
}
