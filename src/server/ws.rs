//! Per-session WebSocket event channel.
//!
//! One socket = one [`Session`]. The server greets each connection with a
//! `status_update`, then relays job events from the session's bounded
//! channel. The only inbound event is `start_download`; everything else is
//! answered with a `download_error` and otherwise ignored.
//!
//! Disconnecting removes the session but never cancels its job: the job
//! keeps emitting into the channel, and once the receiving side is gone the
//! sink quietly drops events.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::jobs::DownloadJob;
use crate::relay::{EventSink, SessionEvent};
use crate::server::AppState;
use crate::session::{Session, EVENT_CHANNEL_CAPACITY};
use crate::validate;

/// Everything a client can send over the channel.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
enum ClientEvent {
    StartDownload(StartDownloadRequest),
}

#[derive(Debug, Deserialize)]
struct StartDownloadRequest {
    video_url: String,
    format_id: String,
    video_title: String,
}

/// Upgrade handler for `GET /ws`.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let session = state.sessions.register(event_tx);

    session.sink().emit(SessionEvent::StatusUpdate {
        message: "Connected to server!".to_string(),
    });

    // Dedicated forwarding task: session channel -> socket, preserving
    // emission order
    let forward = tokio::spawn(async move {
        let mut events = ReceiverStream::new(event_rx);
        while let Some(event) = events.next().await {
            let payload = match serde_json::to_string(&event) {
                Ok(payload) => payload,
                Err(err) => {
                    tracing::error!("Failed to encode session event: {}", err);
                    continue;
                }
            };
            if ws_tx.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = ws_rx.next().await {
        match message {
            Message::Text(text) => handle_client_message(&state, &session, &text).await,
            Message::Close(_) => break,
            // Pings are answered by axum; binary frames have no meaning here
            _ => {}
        }
    }

    state.sessions.remove(session.id());
    forward.abort();
}

async fn handle_client_message(state: &Arc<AppState>, session: &Arc<Session>, text: &str) {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(err) => {
            tracing::debug!(session_id = %session.id(), error = %err, "Unparseable client event");
            session.sink().emit(SessionEvent::DownloadError {
                message: "Unrecognized request.".to_string(),
            });
            return;
        }
    };

    match event {
        ClientEvent::StartDownload(request) => start_download(state, session, request).await,
    }
}

async fn start_download(
    state: &Arc<AppState>,
    session: &Arc<Session>,
    request: StartDownloadRequest,
) {
    let sink = session.sink();

    if !validate::is_valid_video_url(&request.video_url) {
        sink.emit(SessionEvent::DownloadError {
            message: "Invalid or unsupported video URL.".to_string(),
        });
        return;
    }

    // One active job per session, enforced
    let guard = match session.try_begin_job() {
        Some(guard) => guard,
        None => {
            sink.emit(SessionEvent::DownloadError {
                message: "A download is already in progress for this session.".to_string(),
            });
            return;
        }
    };

    tracing::info!(
        session_id = %session.id(),
        url = %request.video_url,
        format_id = %request.format_id,
        "Received download request"
    );

    let job = DownloadJob::new(
        request.video_url,
        request.format_id,
        request.video_title,
        session.id(),
    );
    let runner = state.runner.clone();
    let job_sink: Arc<dyn EventSink> = Arc::new(session.sink());

    tokio::spawn(async move {
        runner.run(job, job_sink, guard).await;
    });
}
