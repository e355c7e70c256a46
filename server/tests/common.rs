//! Shared scaffolding for session and HTTP tests: scripted stand-ins
//! for the remote describe and synthesis backends, plus a harness that
//! runs a narration session over plain channels.

use std::collections::VecDeque;
use std::fs;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

use speech_core::assets::PERSONAS;
use speech_core::{
    Conditioning, SpeechSynthesizer, SynthBackend, SynthOutput, VoiceAssetRegistry,
};
use vision_core::{DescribeBackend, DescriptionGenerator, TextStream};

use server::history::DescriptionHistory;
use server::session::{NarrationSession, SessionDeps};
use server::transport::{ClientFrame, OutboundFrame};

/// Describe backend that replays one pre-scripted fragment sequence per
/// call and records the user prompt it was given.
pub struct ScriptedDescribe {
    scripts: Mutex<VecDeque<Vec<anyhow::Result<String>>>>,
    pub prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedDescribe {
    pub fn new(scripts: Vec<Vec<anyhow::Result<String>>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl DescribeBackend for ScriptedDescribe {
    async fn stream_description(
        &self,
        _system: String,
        user: String,
        _image_b64: String,
    ) -> anyhow::Result<TextStream> {
        self.prompts.lock().unwrap().push(user);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();
        Ok(Box::pin(futures_util::stream::iter(script)))
    }
}

/// Synthesis backend that records every text it was asked to speak and
/// answers with a short PCM buffer, or fails every call.
pub struct ScriptedSynth {
    fail: bool,
    pub spoken: Arc<Mutex<Vec<String>>>,
}

impl ScriptedSynth {
    pub fn new(fail: bool) -> Self {
        Self {
            fail,
            spoken: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl SynthBackend for ScriptedSynth {
    async fn synthesize(
        &self,
        text: &str,
        _conditioning: Conditioning<'_>,
    ) -> anyhow::Result<SynthOutput> {
        self.spoken.lock().unwrap().push(text.to_string());
        if self.fail {
            anyhow::bail!("backend offline");
        }
        Ok(SynthOutput::Pcm {
            samples: vec![0.5; 2400],
            sample_rate: 24_000,
        })
    }

    async fn warm_up(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// One running narration session, driven over channels instead of a
/// websocket.
pub struct Harness {
    pub client: mpsc::Sender<ClientFrame>,
    pub server: mpsc::Receiver<OutboundFrame>,
    pub history: DescriptionHistory,
    pub spoken: Arc<Mutex<Vec<String>>>,
    pub prompts: Arc<Mutex<Vec<String>>>,
    pub task: JoinHandle<()>,
    _assets: tempfile::TempDir,
}

/// Every persona gets a profile so synthesis takes the fast path and
/// the readiness snapshot reports `ready` across the board.
fn ready_registry(dir: &tempfile::TempDir) -> VoiceAssetRegistry {
    let embeddings = dir.path().join("embeddings");
    let samples = dir.path().join("samples");
    fs::create_dir_all(&embeddings).unwrap();
    fs::create_dir_all(&samples).unwrap();
    for persona in PERSONAS {
        fs::write(
            embeddings.join(format!("{persona}.json")),
            r#"{"speaker_embedding":[0.1]}"#,
        )
        .unwrap();
    }
    VoiceAssetRegistry::new(embeddings, samples)
}

pub fn session_deps(
    scripts: Vec<Vec<anyhow::Result<String>>>,
    fail_synth: bool,
) -> (SessionDeps, Arc<Mutex<Vec<String>>>, Arc<Mutex<Vec<String>>>, tempfile::TempDir) {
    let assets = tempfile::TempDir::new().unwrap();
    let describe = Arc::new(ScriptedDescribe::new(scripts));
    let prompts = describe.prompts.clone();
    let synth = Arc::new(ScriptedSynth::new(fail_synth));
    let spoken = synth.spoken.clone();

    let deps = SessionDeps {
        generator: Arc::new(DescriptionGenerator::new(describe, "*")),
        synthesizer: Arc::new(SpeechSynthesizer::new(
            synth,
            Arc::new(ready_registry(&assets)),
        )),
        history: DescriptionHistory::new(),
        server_ready: Arc::new(AtomicBool::new(true)),
        segment_marker: "*".into(),
    };
    (deps, spoken, prompts, assets)
}

pub fn spawn_session(
    scripts: Vec<Vec<anyhow::Result<String>>>,
    fail_synth: bool,
) -> Harness {
    let (deps, spoken, prompts, assets) = session_deps(scripts, fail_synth);
    let history = deps.history.clone();

    let (client_tx, client_rx) = mpsc::channel::<ClientFrame>(16);
    let (server_tx, server_rx) = mpsc::channel::<OutboundFrame>(64);

    let task = tokio::spawn(
        NarrationSession::new(deps, server_tx).run(ReceiverStream::new(client_rx)),
    );

    Harness {
        client: client_tx,
        server: server_rx,
        history,
        spoken,
        prompts,
        task,
        _assets: assets,
    }
}

/// A minimal valid turn request; `aGVsbG8=` decodes to `hello`.
pub fn turn_json() -> String {
    serde_json::json!({
        "image": "aGVsbG8=",
        "voiceName": "David Attenborough",
        "voiceLabel": "Sir David",
        "politenessLevel": 5,
        "pictureCount": 1
    })
    .to_string()
}

impl Harness {
    pub async fn send_text(&self, text: impl Into<String>) {
        self.client
            .send(ClientFrame::Text(text.into()))
            .await
            .unwrap();
    }

    /// Next outbound frame as JSON; panics on audio frames.
    pub async fn recv_json(&mut self) -> serde_json::Value {
        match self.server.recv().await.expect("session closed early") {
            OutboundFrame::Message(msg) => serde_json::to_value(&msg).unwrap(),
            OutboundFrame::Audio(bytes) => panic!("expected JSON frame, got {} audio bytes", bytes.len()),
        }
    }

    /// Next outbound frame as audio bytes; panics on JSON frames.
    pub async fn recv_audio(&mut self) -> Vec<u8> {
        match self.server.recv().await.expect("session closed early") {
            OutboundFrame::Audio(bytes) => bytes,
            OutboundFrame::Message(msg) => {
                panic!("expected audio frame, got {:?}", serde_json::to_value(&msg))
            }
        }
    }

    /// Consume frames, audio included, until a status frame with the
    /// given message arrives.
    pub async fn drain_until_status(&mut self, message: &str) {
        loop {
            match self.server.recv().await.expect("session closed early") {
                OutboundFrame::Audio(_) => {}
                OutboundFrame::Message(msg) => {
                    let v = serde_json::to_value(&msg).unwrap();
                    if v["type"] == "status" && v["message"] == message {
                        return;
                    }
                }
            }
        }
    }

    /// Consume the three on-connect frames: voice_status, server_ready
    /// and the greeting status.
    pub async fn skip_snapshot(&mut self) {
        assert_eq!(self.recv_json().await["type"], "voice_status");
        assert_eq!(self.recv_json().await["type"], "server_ready");
        assert_eq!(self.recv_json().await["type"], "status");
    }
}
