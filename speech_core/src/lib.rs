pub mod assets;
mod wav;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use tracing::{debug, warn};

pub use crate::assets::VoiceAssetRegistry;

/// Fixed output sample rate for PCM synthesis results.
pub const OUTPUT_SAMPLE_RATE: u32 = 24_000;

/// Container format of an encoded audio chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Wav,
}

/// One wire-ready piece of synthesized audio. Today every synthesis
/// call produces a single chunk; the Vec return type leaves room for
/// backends that stream.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub format: AudioFormat,
    pub bytes: Vec<u8>,
}

/// How the backend should condition the voice for one call.
pub enum Conditioning<'a> {
    /// Precomputed profile data: fast path.
    Profile(&'a serde_json::Value),
    /// Clone from reference clips: slow path.
    Clips(&'a [PathBuf]),
    /// Backend default voice.
    Default,
}

/// Raw synthesis result before output encoding. MP3-capable backends
/// hand back a finished container; PCM backends hand back samples that
/// get the WAV fallback encoding.
pub enum SynthOutput {
    Mp3(Vec<u8>),
    Pcm { samples: Vec<f32>, sample_rate: u32 },
}

/// Seam to the remote synthesis model.
#[async_trait]
pub trait SynthBackend: Send + Sync {
    async fn synthesize(&self, text: &str, conditioning: Conditioning<'_>)
        -> anyhow::Result<SynthOutput>;

    /// One throwaway inference so the first real request is not the
    /// one paying the cold-start cost.
    async fn warm_up(&self) -> anyhow::Result<()>;
}

/// Converts a finished text unit into audio, choosing the synthesis
/// path from the persona's asset readiness.
pub struct SpeechSynthesizer {
    backend: Arc<dyn SynthBackend>,
    registry: Arc<VoiceAssetRegistry>,
}

impl SpeechSynthesizer {
    pub fn new(backend: Arc<dyn SynthBackend>, registry: Arc<VoiceAssetRegistry>) -> Self {
        Self { backend, registry }
    }

    pub fn registry(&self) -> &VoiceAssetRegistry {
        &self.registry
    }

    pub async fn warm_up(&self) -> anyhow::Result<()> {
        self.backend.warm_up().await
    }

    /// Synthesize one speakable unit. Errors are returned, never
    /// panicked; the caller reports them and keeps the session alive.
    pub async fn synthesize(&self, text: &str, persona: &str) -> anyhow::Result<Vec<AudioChunk>> {
        let asset = self.registry.resolve(persona);
        let output = if let Some(profile) = asset.profile.as_ref() {
            debug!(persona, "synthesizing with precomputed profile");
            self.backend
                .synthesize(text, Conditioning::Profile(profile))
                .await?
        } else if !asset.reference_clips.is_empty() {
            debug!(
                persona,
                clips = asset.reference_clips.len(),
                "cloning from reference clips"
            );
            self.backend
                .synthesize(text, Conditioning::Clips(&asset.reference_clips))
                .await?
        } else {
            warn!(persona, "no voice assets, using default voice");
            self.backend.synthesize(text, Conditioning::Default).await?
        };
        Ok(vec![encode_output(output)?])
    }
}

fn encode_output(output: SynthOutput) -> anyhow::Result<AudioChunk> {
    match output {
        SynthOutput::Mp3(bytes) => Ok(AudioChunk {
            format: AudioFormat::Mp3,
            bytes,
        }),
        SynthOutput::Pcm { samples, sample_rate } => Ok(AudioChunk {
            format: AudioFormat::Wav,
            bytes: wav::encode_wav(&samples, sample_rate)?,
        }),
    }
}

/// Reply shape of the XTTS HTTP endpoint: base64 WAV on success, an
/// error string otherwise.
#[derive(Deserialize)]
struct SynthReply {
    audio: Option<String>,
    error: Option<String>,
}

/// HTTP client for an XTTS-style synthesis service: JSON in, base64
/// WAV out at 24 kHz.
pub struct XttsHttpClient {
    url: String,
    client: reqwest::Client,
}

impl XttsHttpClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    async fn request(&self, body: serde_json::Value) -> anyhow::Result<SynthOutput> {
        let reply: SynthReply = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .context("synthesis request failed")?
            .error_for_status()
            .context("synthesis request rejected")?
            .json()
            .await
            .context("synthesis reply was not JSON")?;

        if let Some(error) = reply.error {
            anyhow::bail!("synthesis backend error: {error}");
        }
        let audio = reply.audio.context("synthesis reply missing audio")?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(audio)
            .context("synthesis audio is not valid base64")?;
        let (samples, sample_rate) = wav::decode_wav(&bytes)?;
        Ok(SynthOutput::Pcm { samples, sample_rate })
    }
}

#[async_trait]
impl SynthBackend for XttsHttpClient {
    async fn synthesize(
        &self,
        text: &str,
        conditioning: Conditioning<'_>,
    ) -> anyhow::Result<SynthOutput> {
        let mut body = serde_json::json!({
            "text": text,
            "language": "en",
        });
        match conditioning {
            Conditioning::Profile(profile) => {
                body["embedding"] = profile.clone();
            }
            Conditioning::Clips(clips) => {
                let mut encoded = Vec::with_capacity(clips.len());
                for clip in clips {
                    let bytes = tokio::fs::read(clip)
                        .await
                        .with_context(|| format!("reading reference clip {}", clip.display()))?;
                    encoded.push(base64::engine::general_purpose::STANDARD.encode(bytes));
                }
                body["reference_audio"] = serde_json::json!(encoded);
            }
            Conditioning::Default => {}
        }
        self.request(body).await
    }

    async fn warm_up(&self) -> anyhow::Result<()> {
        self.request(serde_json::json!({
            "text": "Ready.",
            "language": "en",
        }))
        .await
        .map(|_| ())
    }
}
