// Progress channel over a websocket. Inbound text frames are commands; each
// one runs on its own task so long imports never block the reader. All
// outbound events funnel through a single writer task.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, info, warn};

use albumsync_common::{AlbumSyncError, ClientCommand, EventScope, EventSink, ServerEvent};
use albumsync_import::AlbumSyncService;

/// Sink that forwards events to the socket's writer task. Sends after the
/// client has gone away are dropped.
#[derive(Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<ServerEvent>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<ServerEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: ServerEvent) {
        if self.tx.send(event).is_err() {
            debug!("channel closed, event dropped");
        }
    }
}

pub async fn serve(socket: WebSocket, service: Arc<AlbumSyncService>) {
    let (mut outbound, mut inbound) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    info!("progress channel opened");

    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let frame = match serde_json::to_string(&event) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(error = %e, "failed to encode event");
                    continue;
                }
            };
            if outbound.send(Message::Text(frame.into())).await.is_err() {
                debug!("socket write failed, writer stopping");
                break;
            }
        }
    });

    let sink = ChannelSink::new(tx);
    while let Some(message) = inbound.next().await {
        match message {
            Ok(Message::Text(text)) => dispatch(&service, &sink, text.as_str()),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(error = %e, "socket read failed");
                break;
            }
        }
    }
    info!("progress channel closed");
}

fn dispatch(service: &Arc<AlbumSyncService>, sink: &ChannelSink, frame: &str) {
    match parse_frame(frame) {
        Ok(command) => {
            let service = service.clone();
            let sink = sink.clone();
            tokio::spawn(async move { service.handle(command, &sink).await });
        }
        Err(event) => sink.emit(*event),
    }
}

/// Decode an inbound frame. A frame that isn't a known command becomes an
/// error event, scoped to its `context` when one can be read.
pub fn parse_frame(frame: &str) -> Result<ClientCommand, Box<ServerEvent>> {
    serde_json::from_str::<ClientCommand>(frame).map_err(|e| {
        warn!(error = %e, "rejected inbound frame");
        let context = serde_json::from_str::<Value>(frame)
            .ok()
            .and_then(|v| v.pointer("/data/context").and_then(Value::as_str).map(String::from));
        let scope = EventScope::new(context.as_deref(), None);
        Box::new(ServerEvent::error(
            &scope,
            &AlbumSyncError::Validation(format!("unrecognised command: {e}")),
        ))
    })
}
