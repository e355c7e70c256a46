//! Wire protocol for the `/narrate` websocket.
//!
//! One channel carries both directions: JSON text frames for control
//! and text updates, raw binary frames for audio. Field names follow
//! the browser client (`voiceName`, `pictureCount`, ...).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use speech_core::assets::ReadinessState;

/// Literal text frame that asks for a clean shutdown.
pub const CLOSE_SENTINEL: &str = "close";

/// One client turn, as received. Optional fields get defaulted during
/// validation; `pictureCount` is echoed back verbatim.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    pub image: Option<String>,
    pub voice_name: Option<String>,
    pub voice_label: Option<String>,
    pub politeness_level: Option<i64>,
    #[serde(default)]
    pub picture_count: serde_json::Value,
}

/// A validated turn, ready for the pipeline.
#[derive(Debug, Clone)]
pub struct NarrationTurn {
    pub image_bytes: Vec<u8>,
    pub persona: String,
    pub voice_label: String,
    pub tone_level: u8,
    pub picture_count: serde_json::Value,
}

/// Server-to-client JSON frames.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    VoiceStatus {
        data: BTreeMap<String, ReadinessState>,
    },
    ServerReady {
        ready: bool,
    },
    Status {
        message: String,
        detail: String,
    },
    TextChunk {
        data: String,
        #[serde(rename = "pictureCount")]
        picture_count: serde_json::Value,
        #[serde(rename = "voiceName")]
        voice_name: String,
        #[serde(rename = "voiceLabel")]
        voice_label: String,
    },
    Error {
        data: String,
    },
}

impl ServerMessage {
    pub fn status(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Status {
            message: message.into(),
            detail: detail.into(),
        }
    }
}
