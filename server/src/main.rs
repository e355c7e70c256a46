use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use speech_core::{SpeechSynthesizer, VoiceAssetRegistry, XttsHttpClient};
use vision_core::{AnthropicVision, DescriptionGenerator};

use server::app::{router, AppState};
use server::config::ServerConfig;
use server::history::DescriptionHistory;
use server::session::SessionDeps;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _ = dotenv::dotenv();

    async_main().await
}

async fn async_main() -> anyhow::Result<()> {
    info!("Starting narration server...");

    let config = ServerConfig::from_env();

    let vision = AnthropicVision::from_env()?;
    let generator = Arc::new(DescriptionGenerator::new(
        Arc::new(vision),
        config.segment_marker.clone(),
    ));

    let registry = VoiceAssetRegistry::new(&config.embeddings_dir, &config.samples_dir);
    for (persona, status) in registry.status_map() {
        info!(persona = %persona, status = ?status, "voice assets");
    }

    let backend = XttsHttpClient::new(&config.synth_api_url);
    let synthesizer = Arc::new(SpeechSynthesizer::new(Arc::new(backend), Arc::new(registry)));

    let server_ready = Arc::new(AtomicBool::new(false));
    {
        let synthesizer = synthesizer.clone();
        let server_ready = server_ready.clone();
        tokio::spawn(async move {
            match synthesizer.warm_up().await {
                Ok(()) => {
                    server_ready.store(true, Ordering::Relaxed);
                    info!("synthesis backend warmed up");
                }
                Err(e) => {
                    // First real synthesis will pay the cold-start cost.
                    warn!(error = %e, "synthesis warm-up failed");
                }
            }
        });
    }

    let state = AppState {
        deps: SessionDeps {
            generator,
            synthesizer,
            history: DescriptionHistory::new(),
            server_ready,
            segment_marker: config.segment_marker.clone(),
        },
    };

    let app = router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {addr}: {e}. Try a different PORT."))?;

    info!("Server listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
