//! End-to-end tests against a running relay.
//!
//! Each test starts the real router on an ephemeral port and talks to it
//! with raw WebSocket clients.

use drawsync_core::protocol::{
    ChatMessage, ClientMessage, ConnectionId, DrawOp, HexColor, LineOp, ServerMessage,
};
use drawsync_server::{ServerConfig, serve};
use futures_util::{SinkExt, StreamExt};
use kurbo::Point;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{Duration, timeout};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Start a server on a free port, return its WebSocket URL.
async fn start_test_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        serve(listener, &ServerConfig::default()).await.unwrap();
    });
    format!("ws://{addr}/ws")
}

async fn send(client: &mut Client, msg: &ClientMessage) {
    client.send(Message::Text(msg.encode().unwrap().into())).await.unwrap();
}

/// Next server message, or `None` if nothing arrives in time.
async fn recv(client: &mut Client, wait: Duration) -> Option<ServerMessage> {
    loop {
        match timeout(wait, client.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => return Some(ServerMessage::decode(text.as_str()).unwrap()),
            Ok(Some(Ok(Message::Close(_)))) | Ok(None) | Err(_) => return None,
            Ok(Some(Ok(_))) => continue,
            Ok(Some(Err(e))) => panic!("websocket error: {e}"),
        }
    }
}

async fn expect(client: &mut Client) -> ServerMessage {
    recv(client, Duration::from_secs(2)).await.expect("expected a server message")
}

async fn expect_silence(client: &mut Client) {
    let got = recv(client, Duration::from_millis(200)).await;
    assert!(got.is_none(), "unexpected message: {got:?}");
}

/// Connect and join `room`, returning the client and its connection id.
async fn join(url: &str, room: &str, user: &str) -> (Client, ConnectionId) {
    let (mut client, _) = connect_async(url).await.unwrap();
    send(&mut client, &ClientMessage::Join { room_code: room.into(), user: user.into() }).await;
    match expect(&mut client).await {
        ServerMessage::Joined { room_code, id, members } => {
            assert_eq!(room_code.as_str(), room);
            assert!(members.contains(&id));
            (client, id)
        }
        other => panic!("expected joined, got {other:?}"),
    }
}

#[tokio::test]
async fn test_health_endpoint() {
    let url = start_test_server().await;
    let addr = url.trim_start_matches("ws://").trim_end_matches("/ws").to_string();

    let mut stream = TcpStream::connect(&addr).await.unwrap();
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    stream
        .write_all(format!("GET /health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n").as_bytes())
        .await
        .unwrap();
    let mut response = String::new();
    timeout(Duration::from_secs(2), stream.read_to_string(&mut response))
        .await
        .unwrap()
        .unwrap();
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.ends_with("ok"));
}

#[tokio::test]
async fn test_red_line_reaches_peer_but_not_sender() {
    let url = start_test_server().await;
    let (mut alice, _) = join(&url, "ABC123", "alice").await;
    let (mut bob, bob_id) = join(&url, "ABC123", "bob").await;

    assert_eq!(
        expect(&mut alice).await,
        ServerMessage::UserJoined { user: "bob".into(), id: bob_id }
    );

    let op = DrawOp::Line(LineOp::new(
        Point::new(10.0, 10.0),
        Point::new(50.0, 50.0),
        HexColor::rgb(255, 0, 0),
        2.0,
    ));
    send(&mut alice, &ClientMessage::Draw { room_code: "ABC123".into(), op: op.clone() }).await;

    match expect(&mut bob).await {
        ServerMessage::Draw { room_code, op: received } => {
            assert_eq!(room_code.as_str(), "ABC123");
            assert_eq!(received, op);
        }
        other => panic!("expected draw, got {other:?}"),
    }
    expect_silence(&mut alice).await;
}

#[tokio::test]
async fn test_rooms_do_not_leak() {
    let url = start_test_server().await;
    let (mut alice, _) = join(&url, "ONE", "alice").await;
    let (mut carol, _) = join(&url, "TWO", "carol").await;

    send(&mut alice, &ClientMessage::Cursor { room_code: "ONE".into(), x: 3.0, y: 4.0 }).await;
    send(
        &mut alice,
        &ClientMessage::Chat { room_code: "ONE".into(), message: ChatMessage::now("alice", "hello") },
    )
    .await;
    // A room the sender never joined.
    send(&mut alice, &ClientMessage::Cursor { room_code: "TWO".into(), x: 1.0, y: 1.0 }).await;

    expect_silence(&mut carol).await;
}

#[tokio::test]
async fn test_cursor_and_chat_shapes() {
    let url = start_test_server().await;
    let (mut alice, alice_id) = join(&url, "ABC123", "alice").await;
    let (mut bob, _) = join(&url, "ABC123", "bob").await;
    expect(&mut alice).await; // user_joined

    send(&mut alice, &ClientMessage::Cursor { room_code: "ABC123".into(), x: 120.0, y: 80.5 }).await;
    assert_eq!(
        expect(&mut bob).await,
        ServerMessage::Cursor { id: alice_id, x: 120.0, y: 80.5 }
    );

    let message = ChatMessage::now("alice", "hi bob");
    send(&mut alice, &ClientMessage::Chat { room_code: "ABC123".into(), message: message.clone() }).await;
    assert_eq!(expect(&mut bob).await, ServerMessage::Chat { message });
}

#[tokio::test]
async fn test_malformed_frames_are_dropped() {
    let url = start_test_server().await;
    let (mut alice, _) = join(&url, "ABC123", "alice").await;
    let (mut bob, _) = join(&url, "ABC123", "bob").await;
    expect(&mut alice).await;

    for raw in [
        "not json",
        r#"{"type":"teleport","roomCode":"ABC123"}"#,
        r#"{"type":"draw","roomCode":"ABC123","tool":"line","startX":0}"#,
        r##"{"type":"draw","tool":"pen","x":[0,1],"y":[0,1],"color":"#fff","lineWidth":2}"##,
    ] {
        alice.send(Message::Text(raw.into())).await.unwrap();
    }
    expect_silence(&mut bob).await;

    // The sender's channel is still usable afterwards.
    send(&mut alice, &ClientMessage::Cursor { room_code: "ABC123".into(), x: 1.0, y: 2.0 }).await;
    assert!(matches!(expect(&mut bob).await, ServerMessage::Cursor { .. }));
}

#[tokio::test]
async fn test_close_sends_presence_leave_to_room_only() {
    let url = start_test_server().await;
    let (alice, alice_id) = join(&url, "ONE", "alice").await;
    let (mut bob, _) = join(&url, "ONE", "bob").await;
    let (mut carol, _) = join(&url, "TWO", "carol").await;

    drop(alice);

    assert_eq!(expect(&mut bob).await, ServerMessage::PresenceLeave { id: alice_id });
    expect_silence(&mut carol).await;
}
