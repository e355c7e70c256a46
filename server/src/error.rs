use thiserror::Error;

/// Everything that can go wrong inside one narration turn. None of
/// these close the connection: each is rendered as an `error` frame
/// and the session returns to waiting for the next turn.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error("No image data received.")]
    MissingImage,

    #[error("Could not describe the image: {0}")]
    Describe(String),

    #[error("Voice generation failed: {0}")]
    Synthesis(String),
}
