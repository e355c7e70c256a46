//! Websocket plumbing for a narration session.
//!
//! The session itself is written against plain frame types so tests
//! can drive it over channels: inbound as a stream of [`ClientFrame`],
//! outbound as an mpsc queue of [`OutboundFrame`]. This module owns
//! the translation to and from the actual socket, including the
//! writer task that serializes the outbound queue and the
//! normal-closure frame on teardown.

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::protocol::ServerMessage;
use crate::session::{NarrationSession, SessionDeps};

/// Inbound frames the session cares about. Everything that ends the
/// connection (client close frame, transport error) collapses to
/// `Close`.
#[derive(Debug)]
pub enum ClientFrame {
    Text(String),
    Close,
}

/// Outbound frames: JSON control/text messages and raw audio bytes.
#[derive(Debug)]
pub enum OutboundFrame {
    Message(ServerMessage),
    Audio(Vec<u8>),
}

/// Capacity of the outbound queue. Audio frames are large but few;
/// text fragments are many but small.
const OUTBOUND_QUEUE: usize = 64;

/// Run one narration session over a websocket until either side is
/// done, then close with a normal-closure code.
pub async fn serve_socket(socket: WebSocket, deps: SessionDeps) {
    let (mut sink, stream) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<OutboundFrame>(OUTBOUND_QUEUE);

    // Writer task: drains the queue in order, one frame at a time, so
    // audio for unit N is fully sent before anything for unit N+1.
    let writer = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            let message = match frame {
                OutboundFrame::Message(msg) => match serde_json::to_string(&msg) {
                    Ok(json) => Message::Text(json.into()),
                    Err(e) => {
                        warn!(error = %e, "failed to serialize outbound message");
                        continue;
                    }
                },
                OutboundFrame::Audio(bytes) => Message::Binary(bytes.into()),
            };
            if let Err(e) = sink.send(message).await {
                debug!(error = %e, "websocket send failed");
                break;
            }
        }
        let _ = sink
            .send(Message::Close(Some(CloseFrame {
                code: close_code::NORMAL,
                reason: "".into(),
            })))
            .await;
    });

    let inbound = stream.filter_map(|msg| async move {
        match msg {
            Ok(Message::Text(text)) => Some(ClientFrame::Text(text.to_string())),
            Ok(Message::Close(_)) => Some(ClientFrame::Close),
            Err(e) => {
                debug!(error = %e, "websocket receive failed");
                Some(ClientFrame::Close)
            }
            // Binary, ping and pong frames from the client are ignored.
            Ok(_) => None,
        }
    });

    NarrationSession::new(deps, out_tx).run(Box::pin(inbound)).await;

    // Session dropped its sender: the writer flushes and closes.
    let _ = writer.await;
}
