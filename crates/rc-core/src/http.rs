//! HTTP frontend: relays each chat request as a server-sent event stream.

use std::convert::Infallible;
use std::pin::{pin, Pin};
use std::task::{Context, Poll};

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use rc_backend::{prepare, relay, Upstream};
use rc_protocol::IncrementalUpdate;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

const CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: Value,
    #[serde(default)]
    history: Option<Value>,
}

#[derive(Clone)]
struct AppState<U> {
    upstream: U,
}

/// Event-stream response body fed by the relay task.
pub struct SseResponse {
    rx: ReceiverStream<Bytes>,
}

impl SseResponse {
    fn new(rx: ReceiverStream<Bytes>) -> Self {
        Self { rx }
    }
}

impl Stream for SseResponse {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx).poll_next(cx).map(|opt| opt.map(Ok))
    }
}

impl IntoResponse for SseResponse {
    fn into_response(self) -> Response {
        (
            [
                (header::CONTENT_TYPE, "text/event-stream"),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            Body::from_stream(self),
        )
            .into_response()
    }
}

/// Frame one update as `data: <json>\n\n`.
pub fn encode_event(update: &IncrementalUpdate) -> Option<Bytes> {
    match serde_json::to_string(update) {
        Ok(json) => Some(Bytes::from(format!("data: {json}\n\n"))),
        Err(e) => {
            error!("failed to serialize update: {e}");
            None
        }
    }
}

/// Pump updates into the response channel until the run ends or the client
/// goes away. Returning drops the relay and with it the upstream connection.
pub async fn forward<S>(updates: S, tx: mpsc::Sender<Bytes>)
where
    S: Stream<Item = IncrementalUpdate>,
{
    let mut updates = pin!(updates);

    loop {
        let update = tokio::select! {
            _ = tx.closed() => {
                warn!("client disconnected, abandoning relay");
                return;
            }
            next = updates.next() => match next {
                Some(update) => update,
                None => return,
            },
        };

        let Some(frame) = encode_event(&update) else {
            continue;
        };
        if tx.send(frame).await.is_err() {
            warn!("client disconnected, abandoning relay");
            return;
        }
    }
}

async fn chat_handler<U>(
    State(state): State<AppState<U>>,
    Json(request): Json<ChatRequest>,
) -> Response
where
    U: Upstream + Clone + 'static,
{
    let upstream_request = match prepare(&request.message, request.history.as_ref()) {
        Ok(r) => r,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() })))
                .into_response();
        }
    };

    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    tokio::spawn(forward(relay(state.upstream.clone(), upstream_request), tx));

    SseResponse::new(ReceiverStream::new(rx)).into_response()
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Build the relay API router: `POST /api/chat` and `GET /health`.
pub fn routes<U>(upstream: U) -> Router
where
    U: Upstream + Clone + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", post(chat_handler::<U>))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { upstream })
}

/// Bind `addr` and serve the relay API until the process exits.
pub async fn serve<U>(addr: &str, upstream: U) -> std::io::Result<()>
where
    U: Upstream + Clone + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, routes(upstream)).await
}
