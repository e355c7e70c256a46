// Configuration constants for the server

#[derive(Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub synth_api_url: String,
    pub embeddings_dir: String,
    pub samples_dir: String,
    pub segment_marker: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 7860,
            synth_api_url: "http://localhost:8000".into(),
            embeddings_dir: "voice_embeddings".into(),
            samples_dir: "voice_samples".into(),
            segment_marker: "*".into(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.port);

        let synth_api_url = std::env::var("SYNTH_API_URL").unwrap_or(defaults.synth_api_url);

        let embeddings_dir = std::env::var("EMBEDDINGS_DIR").unwrap_or(defaults.embeddings_dir);

        let samples_dir = std::env::var("SAMPLES_DIR").unwrap_or(defaults.samples_dir);

        let segment_marker = std::env::var("SEGMENT_MARKER")
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(defaults.segment_marker);

        Self {
            port,
            synth_api_url,
            embeddings_dir,
            samples_dir,
            segment_marker,
        }
    }
}
