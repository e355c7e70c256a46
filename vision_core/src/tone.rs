//! Tone directive lookup for the narration prompt.
//!
//! The client sends a 1..10 "politeness level" with each turn. Each
//! level maps to a fixed directive that is appended to the system
//! prompt; anything outside the table falls back to the neutral
//! mid-table entry.

/// Directives indexed by level - 1. Level 1 is the most formal, level
/// 10 the most snarky (still good-natured).
const TONE_DIRECTIVES: [&str; 10] = [
    "Speak with the utmost formality and elegance, as if addressing royalty.",
    "Keep a refined, courteous register with graceful phrasing.",
    "Be polite and warm, with a measured, gentle delivery.",
    "Stay friendly and respectful with the occasional light touch.",
    "Use a relaxed, casual, conversational tone.",
    "Be playful and throw in a mild quip where it fits.",
    "Lean into dry wit and gentle teasing about what you see.",
    "Be cheeky and sardonic, poking fun without being cruel.",
    "Be openly sarcastic and irreverent, milking the scene for laughs.",
    "Be maximally snarky and mischievous while staying good-natured.",
];

const DEFAULT_LEVEL: u8 = 5;

/// Look up the directive for a tone level. Out-of-range levels map to
/// the neutral default.
pub fn tone_directive(level: u8) -> &'static str {
    let level = if (1..=10).contains(&level) {
        level
    } else {
        DEFAULT_LEVEL
    };
    TONE_DIRECTIVES[(level - 1) as usize]
}
