//! WebSocket transport for talking to the relay server.
//!
//! The socket runs on a background thread; the owner drains decoded
//! events with [`NativeWebSocket::poll_events`] from its own loop, so all
//! canvas mutations stay on a single thread.

use crate::protocol::{ClientMessage, ProtocolError, RoomCode, ServerMessage};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tungstenite::{connect, Message};
use url::Url;

/// Client-side channel errors.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Already connected")]
    AlreadyConnected,
    #[error("Not connected")]
    NotConnected,
    #[error("Channel closed")]
    ChannelClosed,
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Session connection state.
///
/// `Disconnected → Connecting → Joined(room) → Disconnected`. There is no
/// reconnecting state: a dropped channel needs a fresh connect and join.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Joined(RoomCode),
}

impl ConnectionState {
    pub fn is_joined(&self) -> bool {
        matches!(self, ConnectionState::Joined(_))
    }

    pub fn room(&self) -> Option<&RoomCode> {
        match self {
            ConnectionState::Joined(room) => Some(room),
            _ => None,
        }
    }
}

/// Events from the WebSocket client.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// Channel opened.
    Connected,
    /// Channel closed (by either side or by a transport error).
    Disconnected,
    /// A decoded message from the relay.
    Message(ServerMessage),
    /// Connecting failed.
    Error { message: String },
}

/// Commands sent to the WebSocket thread.
enum WsCommand {
    Send(String),
    Close,
}

/// WebSocket client for native platforms.
///
/// Uses a background thread for non-blocking operation.
pub struct NativeWebSocket {
    connected: bool,
    cmd_tx: Option<Sender<WsCommand>>,
    event_rx: Option<Receiver<SyncEvent>>,
    socket_thread: Option<JoinHandle<()>>,
}

impl NativeWebSocket {
    /// Create a new disconnected client.
    pub fn new() -> Self {
        Self {
            connected: false,
            cmd_tx: None,
            event_rx: None,
            socket_thread: None,
        }
    }

    /// Connect to the relay. The outcome arrives later as an event.
    pub fn connect(&mut self, url: &str) -> Result<(), SyncError> {
        if self.cmd_tx.is_some() {
            return Err(SyncError::AlreadyConnected);
        }

        let parsed_url = Url::parse(url).map_err(|e| SyncError::InvalidUrl(e.to_string()))?;
        if parsed_url.scheme() != "ws" && parsed_url.scheme() != "wss" {
            return Err(SyncError::InvalidUrl(format!(
                "unsupported scheme `{}`",
                parsed_url.scheme()
            )));
        }

        let (cmd_tx, cmd_rx) = channel::<WsCommand>();
        let (event_tx, event_rx) = channel::<SyncEvent>();
        let url = url.to_string();

        let handle = thread::spawn(move || run_socket(&url, cmd_rx, event_tx));

        self.cmd_tx = Some(cmd_tx);
        self.event_rx = Some(event_rx);
        self.socket_thread = Some(handle);
        Ok(())
    }

    /// Close the channel. No leave message exists; the relay sees the close.
    ///
    /// Messages queued before the call are written first. If the socket is
    /// open this waits for the socket thread to finish.
    pub fn disconnect(&mut self) {
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(WsCommand::Close);
        }
        if let Some(handle) = self.socket_thread.take() {
            if self.connected && handle.join().is_err() {
                log::error!("WebSocket thread panicked");
            }
        }
        self.event_rx = None;
        self.connected = false;
    }

    /// Queue a message for sending.
    pub fn send(&self, msg: &ClientMessage) -> Result<(), SyncError> {
        let text = msg.encode()?;
        let tx = self.cmd_tx.as_ref().ok_or(SyncError::NotConnected)?;
        tx.send(WsCommand::Send(text)).map_err(|_| SyncError::ChannelClosed)
    }

    /// Drain pending events (non-blocking).
    pub fn poll_events(&mut self) -> Vec<SyncEvent> {
        let mut events = Vec::new();
        let mut closed = false;
        if let Some(ref rx) = self.event_rx {
            loop {
                match rx.try_recv() {
                    Ok(event) => {
                        match &event {
                            SyncEvent::Connected => self.connected = true,
                            SyncEvent::Disconnected | SyncEvent::Error { .. } => {
                                self.connected = false;
                                closed = true;
                            }
                            SyncEvent::Message(_) => {}
                        }
                        events.push(event);
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        if !closed {
                            // The socket thread ended without reporting why.
                            log::warn!("WebSocket thread exited unexpectedly");
                            self.connected = false;
                            events.push(SyncEvent::Disconnected);
                        }
                        closed = true;
                        break;
                    }
                }
            }
        }
        if closed {
            self.cmd_tx = None;
            self.event_rx = None;
            self.socket_thread = None;
        }
        events
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

impl Default for NativeWebSocket {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for NativeWebSocket {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn run_socket(url: &str, cmd_rx: Receiver<WsCommand>, event_tx: Sender<SyncEvent>) {
    log::info!("WebSocket thread: connecting to {}", url);

    let (mut socket, response) = match connect(url) {
        Ok(pair) => pair,
        Err(e) => {
            log::error!("WebSocket connection failed: {}", e);
            let _ = event_tx.send(SyncEvent::Error {
                message: format!("Connection failed: {}", e),
            });
            return;
        }
    };

    log::info!("WebSocket connected, status: {}", response.status());
    let _ = event_tx.send(SyncEvent::Connected);

    match socket.get_mut() {
        tungstenite::stream::MaybeTlsStream::Plain(tcp) => {
            let _ = tcp.set_read_timeout(Some(Duration::from_millis(20)));
            let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
        }
        #[allow(unreachable_patterns)]
        _ => {
            log::debug!("TLS or other stream - using default timeout handling");
        }
    }

    loop {
        // Flush everything queued before blocking on a read.
        loop {
            match cmd_rx.try_recv() {
                Ok(WsCommand::Send(text)) => {
                    log::trace!("WebSocket sending: {}", preview(&text, 100));
                    if let Err(e) = socket.send(Message::Text(text)) {
                        log::error!("WebSocket send error: {}", e);
                        let _ = event_tx.send(SyncEvent::Disconnected);
                        return;
                    }
                }
                Ok(WsCommand::Close) => {
                    log::info!("WebSocket close requested");
                    let _ = socket.close(None);
                    let _ = socket.flush();
                    return;
                }
                Err(TryRecvError::Disconnected) => {
                    log::info!("WebSocket command channel dropped");
                    let _ = socket.close(None);
                    return;
                }
                Err(TryRecvError::Empty) => break,
            }
        }

        match socket.read() {
            Ok(Message::Text(text)) => match ServerMessage::decode(&text) {
                Ok(msg) => {
                    if event_tx.send(SyncEvent::Message(msg)).is_err() {
                        let _ = socket.close(None);
                        return;
                    }
                }
                Err(e) => log::warn!("Dropping undecodable server message: {}", e),
            },
            Ok(Message::Close(_)) => {
                log::info!("WebSocket received close frame");
                break;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(ref e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => {
                log::error!("WebSocket read error: {}", e);
                break;
            }
        }
    }

    log::info!("WebSocket thread exiting");
    let _ = event_tx.send(SyncEvent::Disconnected);
}

/// At most `max_chars` characters of `text`.
fn preview(text: &str, max_chars: usize) -> &str {
    text.char_indices()
        .nth(max_chars)
        .map_or(text, |(end, _)| &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_websocket_scheme() {
        let mut ws = NativeWebSocket::new();
        assert!(matches!(ws.connect("http://localhost:3030/ws"), Err(SyncError::InvalidUrl(_))));
        assert!(matches!(ws.connect("not a url"), Err(SyncError::InvalidUrl(_))));
        assert!(!ws.is_connected());
    }

    #[test]
    fn test_send_requires_connection() {
        let ws = NativeWebSocket::new();
        let msg = ClientMessage::Cursor { room_code: "r".into(), x: 1.0, y: 2.0 };
        assert!(matches!(ws.send(&msg), Err(SyncError::NotConnected)));
    }

    #[test]
    fn test_connection_state_room() {
        assert!(ConnectionState::default().room().is_none());
        let joined = ConnectionState::Joined("ABC123".into());
        assert!(joined.is_joined());
        assert_eq!(joined.room().map(RoomCode::as_str), Some("ABC123"));
        assert!(!ConnectionState::Connecting.is_joined());
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        let accented = "é".repeat(60);
        assert_eq!(preview(&accented, 100), accented);
        assert_eq!(preview(&accented, 51).chars().count(), 51);
        assert_eq!(preview("hello", 2), "he");
        assert_eq!(preview("", 10), "");
    }

    #[test]
    fn test_silent_thread_exit_reports_disconnect() {
        let (event_tx, event_rx) = channel::<SyncEvent>();
        let (cmd_tx, _cmd_rx) = channel::<WsCommand>();
        let handle = thread::spawn(move || {
            let _ = event_tx.send(SyncEvent::Connected);
            panic!("socket thread died");
        });
        assert!(handle.join().is_err());

        let mut ws = NativeWebSocket {
            connected: false,
            cmd_tx: Some(cmd_tx),
            event_rx: Some(event_rx),
            socket_thread: None,
        };
        let events = ws.poll_events();
        assert!(matches!(events.as_slice(), [SyncEvent::Connected, SyncEvent::Disconnected]));
        assert!(!ws.is_connected());

        let msg = ClientMessage::Cursor { room_code: "r".into(), x: 1.0, y: 2.0 };
        assert!(matches!(ws.send(&msg), Err(SyncError::NotConnected)));
        assert!(ws.poll_events().is_empty());
    }

    #[test]
    fn test_reported_disconnect_not_duplicated() {
        let (event_tx, event_rx) = channel::<SyncEvent>();
        event_tx.send(SyncEvent::Connected).unwrap();
        event_tx.send(SyncEvent::Disconnected).unwrap();
        drop(event_tx);

        let mut ws = NativeWebSocket {
            connected: false,
            cmd_tx: None,
            event_rx: Some(event_rx),
            socket_thread: None,
        };
        let events = ws.poll_events();
        assert!(matches!(events.as_slice(), [SyncEvent::Connected, SyncEvent::Disconnected]));
        assert!(!ws.is_connected());
    }
}
