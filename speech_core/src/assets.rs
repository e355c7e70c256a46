//! Voice asset discovery and readiness classification.
//!
//! A persona's voice can be synthesized three ways, depending on what
//! exists on disk: a precomputed conditioning profile
//! (`{embeddings_dir}/{persona}.json`), up to three reference clips
//! (`{samples_dir}/{persona}/*.wav`) for on-the-fly cloning, or
//! nothing at all, in which case synthesis falls back to the backend's
//! default voice.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tracing::warn;

/// Fixed persona catalog. The display name doubles as the voice
/// identity everywhere: registry keys, synthesis requests and the
/// `voiceName` echoed on the wire.
pub const PERSONAS: &[&str] = &[
    "David Attenborough",
    "James May",
    "John Cleese",
    "Michael Caine",
    "Morgan Freeman",
    "Joanna Lumley",
    "Judi Dench",
    "Stephen Fry",
];

/// At most this many reference clips are used for cloning.
pub const MAX_REFERENCE_CLIPS: usize = 3;

/// How a persona's voice can be synthesized right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessState {
    /// Precomputed profile present: fast synthesis path.
    Ready,
    /// Only reference clips present: slow cloning path.
    Partial,
    /// Neither: default voice fallback.
    Missing,
}

/// Per-persona voice record. Populated once by a directory scan,
/// read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct VoiceAsset {
    /// Opaque conditioning data for the fast path.
    pub profile: Option<serde_json::Value>,
    /// Ordered reference clips for the cloning path, 0..=3.
    pub reference_clips: Vec<PathBuf>,
}

impl VoiceAsset {
    /// Pure classification of this record; independent of call order.
    pub fn readiness(&self) -> ReadinessState {
        if self.profile.is_some() {
            ReadinessState::Ready
        } else if !self.reference_clips.is_empty() {
            ReadinessState::Partial
        } else {
            ReadinessState::Missing
        }
    }
}

/// Filesystem-backed registry with a per-persona compute-or-reuse
/// cache, shared by all sessions. Lookups never fail: an absent
/// persona folder simply classifies as Missing.
pub struct VoiceAssetRegistry {
    embeddings_dir: PathBuf,
    samples_dir: PathBuf,
    cache: DashMap<String, Arc<VoiceAsset>>,
}

impl VoiceAssetRegistry {
    pub fn new(embeddings_dir: impl Into<PathBuf>, samples_dir: impl Into<PathBuf>) -> Self {
        Self {
            embeddings_dir: embeddings_dir.into(),
            samples_dir: samples_dir.into(),
            cache: DashMap::new(),
        }
    }

    /// Resolve the asset record for a persona, scanning the filesystem
    /// at most once per persona.
    pub fn resolve(&self, persona: &str) -> Arc<VoiceAsset> {
        self.cache
            .entry(persona.to_string())
            .or_insert_with(|| Arc::new(self.scan(persona)))
            .clone()
    }

    pub fn status(&self, persona: &str) -> ReadinessState {
        self.resolve(persona).readiness()
    }

    /// Readiness snapshot over the whole catalog, for the on-connect
    /// `voice_status` message and the `/voices` endpoint.
    pub fn status_map(&self) -> BTreeMap<String, ReadinessState> {
        PERSONAS
            .iter()
            .map(|p| (p.to_string(), self.status(p)))
            .collect()
    }

    fn scan(&self, persona: &str) -> VoiceAsset {
        VoiceAsset {
            profile: self.load_profile(persona),
            reference_clips: self.find_clips(persona),
        }
    }

    fn load_profile(&self, persona: &str) -> Option<serde_json::Value> {
        let path = self.embeddings_dir.join(format!("{persona}.json"));
        let text = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                // Unparseable profile counts as absent.
                warn!(persona, path = %path.display(), error = %e, "ignoring corrupt voice profile");
                None
            }
        }
    }

    fn find_clips(&self, persona: &str) -> Vec<PathBuf> {
        let dir = self.samples_dir.join(persona);
        let Ok(entries) = fs::read_dir(&dir) else {
            return Vec::new();
        };
        let mut clips: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| is_wav(p))
            .collect();
        clips.sort();
        clips.truncate(MAX_REFERENCE_CLIPS);
        clips
    }
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("wav"))
        .unwrap_or(false)
}
