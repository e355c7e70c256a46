//! One narration session per client connection.
//!
//! The session is a small state machine: it waits for a turn, streams
//! the description, synthesizes speech at sentence boundaries and goes
//! back to waiting. A failing turn reports an `error` frame and the
//! loop keeps going; only transport loss (or the close sentinel) ends
//! the session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use speech_core::SpeechSynthesizer;
use speech_core::assets::ReadinessState;
use vision_core::{DescribeRequest, DescriptionGenerator};

use crate::error::TurnError;
use crate::heartbeat::ProgressHeartbeat;
use crate::history::DescriptionHistory;
use crate::protocol::{NarrationTurn, ServerMessage, TurnRequest, CLOSE_SENTINEL};
use crate::segment::SentenceSegmenter;
use crate::transport::{ClientFrame, OutboundFrame};
use crate::validation::validate_turn;

/// Everything a session needs, injected so tests can swap the remote
/// collaborators for scripted ones and isolate history.
#[derive(Clone)]
pub struct SessionDeps {
    pub generator: Arc<DescriptionGenerator>,
    pub synthesizer: Arc<SpeechSynthesizer>,
    pub history: DescriptionHistory,
    pub server_ready: Arc<AtomicBool>,
    pub segment_marker: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    AwaitingTurn,
    Describing,
    Synthesizing,
    Closed,
}

/// The transport went away; nothing more can be sent.
pub struct Disconnected;

pub struct NarrationSession {
    id: Uuid,
    deps: SessionDeps,
    out: mpsc::Sender<OutboundFrame>,
    state: SessionState,
}

impl NarrationSession {
    pub fn new(deps: SessionDeps, out: mpsc::Sender<OutboundFrame>) -> Self {
        Self {
            id: Uuid::new_v4(),
            deps,
            out,
            state: SessionState::AwaitingTurn,
        }
    }

    /// Drive the session until the client closes, the transport drops
    /// or the close sentinel arrives.
    pub async fn run<S>(mut self, mut inbound: S)
    where
        S: Stream<Item = ClientFrame> + Unpin,
    {
        info!(session = %self.id, "narration session connected");
        if self.send_connect_snapshot().await.is_err() {
            return;
        }

        loop {
            self.set_state(SessionState::AwaitingTurn);
            match inbound.next().await {
                None | Some(ClientFrame::Close) => break,
                Some(ClientFrame::Text(raw)) => {
                    if raw.trim() == CLOSE_SENTINEL {
                        break;
                    }
                    if self.handle_turn(&raw).await.is_err() {
                        // Transport gone mid-turn; best-effort cleanup
                        // already happened on the way out.
                        break;
                    }
                }
            }
        }

        self.set_state(SessionState::Closed);
        info!(session = %self.id, "narration session closed");
    }

    /// Initial readiness snapshot: per-persona voice status, the
    /// warm-up flag and a human-readable status line.
    async fn send_connect_snapshot(&self) -> Result<(), Disconnected> {
        let statuses = self.deps.synthesizer.registry().status_map();
        self.send_msg(ServerMessage::VoiceStatus { data: statuses }).await?;
        self.send_msg(ServerMessage::ServerReady {
            ready: self.deps.server_ready.load(Ordering::Relaxed),
        })
        .await?;
        self.send_msg(ServerMessage::status(
            "Connected.",
            "Pick a voice and start narrating.",
        ))
        .await
    }

    /// Process one turn. Every per-turn failure is rendered as an
    /// `error` frame here; the only error that escapes is transport
    /// loss.
    async fn handle_turn(&mut self, raw: &str) -> Result<(), Disconnected> {
        let parsed = serde_json::from_str::<TurnRequest>(raw)
            .map_err(|e| TurnError::Malformed(e.to_string()))
            .and_then(validate_turn);
        let turn = match parsed {
            Ok(turn) => turn,
            Err(e) => {
                warn!(session = %self.id, error = %e, "rejected turn");
                return self.send_error(&e).await;
            }
        };

        self.set_state(SessionState::Describing);
        self.send_msg(ServerMessage::status(
            "Analyzing image...",
            format!("Asking {} for a narration.", turn.persona),
        ))
        .await?;

        let mut stream = self
            .deps
            .generator
            .stream(DescribeRequest {
                image_bytes: turn.image_bytes.clone(),
                persona: turn.persona.clone(),
                tone_level: turn.tone_level,
                history: self.deps.history.snapshot(),
            })
            .await;

        let mut segmenter = SentenceSegmenter::new(self.deps.segment_marker.clone());
        let mut spoken_units = 0usize;

        while let Some(item) = stream.next().await {
            match item {
                Ok(fragment) => {
                    self.send_msg(ServerMessage::TextChunk {
                        data: fragment.clone(),
                        picture_count: turn.picture_count.clone(),
                        voice_name: turn.persona.clone(),
                        voice_label: turn.voice_label.clone(),
                    })
                    .await?;
                    if let Some(unit) = segmenter.feed(&fragment) {
                        self.speak_unit(&unit, &turn).await?;
                        spoken_units += 1;
                    }
                }
                Err(e) => {
                    error!(session = %self.id, error = %e, "describe stream failed");
                    self.send_error(&TurnError::Describe(e.to_string())).await?;
                    break;
                }
            }
        }

        if let Some(rest) = segmenter.flush() {
            self.speak_unit(&rest, &turn).await?;
            spoken_units += 1;
        }

        if spoken_units > 0 {
            self.send_msg(ServerMessage::status(
                "Audio ready.",
                format!("Narrated {spoken_units} sentence(s)."),
            ))
            .await?;
        }
        Ok(())
    }

    /// Synthesize one speakable unit and queue its audio. The progress
    /// heartbeat is stopped (cancel-and-await) before this returns, on
    /// success and on failure, and the unit's text lands in history
    /// either way.
    async fn speak_unit(&mut self, text: &str, turn: &NarrationTurn) -> Result<(), Disconnected> {
        self.set_state(SessionState::Synthesizing);

        match self.deps.synthesizer.registry().status(&turn.persona) {
            ReadinessState::Ready => {}
            ReadinessState::Partial => {
                self.send_msg(ServerMessage::status(
                    "Cloning voice...",
                    format!(
                        "No precomputed profile for {}, cloning from reference audio. \
                         This may take a while.",
                        turn.persona
                    ),
                ))
                .await?;
            }
            ReadinessState::Missing => {
                self.send_msg(ServerMessage::status(
                    "Using default voice.",
                    format!("No voice assets found for {}.", turn.persona),
                ))
                .await?;
            }
        }

        let heartbeat = ProgressHeartbeat::start(self.out.clone());
        let result = self.deps.synthesizer.synthesize(text, &turn.persona).await;
        heartbeat.stop().await;

        match result {
            Ok(chunks) => {
                for chunk in chunks {
                    self.send(OutboundFrame::Audio(chunk.bytes)).await?;
                }
            }
            Err(e) => {
                error!(session = %self.id, error = %e, "synthesis failed");
                self.send_error(&TurnError::Synthesis(e.to_string())).await?;
            }
        }

        // History records the text even when audio was skipped.
        self.deps.history.push(text.to_string());
        Ok(())
    }

    async fn send(&self, frame: OutboundFrame) -> Result<(), Disconnected> {
        self.out.send(frame).await.map_err(|_| Disconnected)
    }

    async fn send_msg(&self, msg: ServerMessage) -> Result<(), Disconnected> {
        self.send(OutboundFrame::Message(msg)).await
    }

    async fn send_error(&self, err: &TurnError) -> Result<(), Disconnected> {
        self.send_msg(ServerMessage::Error {
            data: err.to_string(),
        })
        .await
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            debug!(session = %self.id, from = ?self.state, to = ?state, "state change");
            self.state = state;
        }
    }
}
