//! HTTP and WebSocket front end of the relay.

use crate::config::ServerConfig;
use crate::relay::Relay;
use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::HeaderValue,
    response::IntoResponse,
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },
    #[error("Invalid allowed origin `{0}`")]
    InvalidOrigin(String),
    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build the relay router: `/` banner, `/health`, `/ws` upgrade.
pub fn router(relay: Arc<Relay>, config: &ServerConfig) -> Result<Router, ServerError> {
    Ok(Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(cors_layer(config)?)
        .layer(TraceLayer::new_for_http())
        .with_state(relay))
}

/// Bind the configured address and serve until the process stops.
pub async fn run(config: ServerConfig) -> Result<(), ServerError> {
    let listener = TcpListener::bind(config.bind)
        .await
        .map_err(|source| ServerError::Bind {
            addr: config.bind,
            source,
        })?;
    serve(listener, &config).await
}

/// Serve on an already bound listener.
pub async fn serve(listener: TcpListener, config: &ServerConfig) -> Result<(), ServerError> {
    let app = router(Arc::new(Relay::new()), config)?;
    let addr = listener.local_addr()?;
    info!("DrawSync relay server listening on {}", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

fn cors_layer(config: &ServerConfig) -> Result<CorsLayer, ServerError> {
    match &config.allowed_origin {
        Some(origin) => {
            let value = origin
                .parse::<HeaderValue>()
                .map_err(|_| ServerError::InvalidOrigin(origin.clone()))?;
            Ok(CorsLayer::new()
                .allow_origin(value)
                .allow_methods(Any)
                .allow_headers(Any))
        }
        None => Ok(CorsLayer::permissive()),
    }
}

async fn index() -> &'static str {
    "DrawSync Relay Server - Connect via WebSocket at /ws"
}

async fn health() -> &'static str {
    "ok"
}

async fn ws_handler(ws: WebSocketUpgrade, State(relay): State<Arc<Relay>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, relay))
}

/// Drive one connection until its channel closes.
async fn handle_socket(socket: WebSocket, relay: Arc<Relay>) {
    let (id, mut outbound) = relay.register();
    info!("New connection: {}", id);

    let (mut sink, mut stream) = socket.split();

    // Ends when the relay drops this connection's queue or the socket fails.
    let mut writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if sink.send(Message::Text(frame.to_string().into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    loop {
        tokio::select! {
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => relay.handle_text(id, text.as_str()),
                Some(Ok(Message::Binary(_))) => {
                    warn!("Ignoring binary frame from {}", id);
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // ping/pong
                Some(Err(e)) => {
                    warn!("WebSocket error for {}: {}", id, e);
                    break;
                }
            },
            _ = &mut writer => break,
        }
    }

    relay.disconnect(id);
    info!("Connection closed: {}", id);
}
