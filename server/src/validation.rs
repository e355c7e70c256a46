use base64::Engine;
use speech_core::assets::PERSONAS;

use crate::error::TurnError;
use crate::protocol::{NarrationTurn, TurnRequest};

const DEFAULT_TONE_LEVEL: u8 = 5;

/// Validate one decoded turn request. A turn without an image (or with
/// an undecodable one) is rejected here; everything else gets sane
/// defaults instead of errors.
pub fn validate_turn(req: TurnRequest) -> Result<NarrationTurn, TurnError> {
    let image = req.image.filter(|i| !i.is_empty()).ok_or(TurnError::MissingImage)?;

    let image_bytes = base64::engine::general_purpose::STANDARD
        .decode(image.as_bytes())
        .map_err(|_| TurnError::Malformed("image is not valid base64".into()))?;

    let persona = req
        .voice_name
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| PERSONAS[0].to_string());

    let voice_label = req
        .voice_label
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| persona.clone());

    // Out-of-range levels fall through to the tone table's default.
    let tone_level = req
        .politeness_level
        .and_then(|v| u8::try_from(v).ok())
        .unwrap_or(DEFAULT_TONE_LEVEL);

    Ok(NarrationTurn {
        image_bytes,
        persona,
        voice_label,
        tone_level,
        picture_count: req.picture_count,
    })
}
