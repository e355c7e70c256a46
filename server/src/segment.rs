//! Incremental sentence segmentation for streamed text fragments.
//!
//! The model is instructed to terminate sentences with a designated
//! marker character instead of stylistic punctuation, so segmentation
//! keys on that marker alone. A fragment that is nothing but the
//! marker never becomes a unit of its own: it is appended after a
//! separating space and the accumulated sentence flushes as one unit.

/// Buffers fragments and emits speakable units at marker boundaries.
/// One live segmenter per turn.
pub struct SentenceSegmenter {
    marker: String,
    buf: String,
}

impl SentenceSegmenter {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            buf: String::new(),
        }
    }

    /// Feed one fragment; returns a finished unit when the fragment
    /// carries the boundary marker.
    pub fn feed(&mut self, fragment: &str) -> Option<String> {
        if fragment.trim() == self.marker {
            if !self.buf.is_empty() {
                self.buf.push(' ');
            }
            self.buf.push_str(&self.marker);
        } else {
            self.buf.push_str(fragment);
        }

        if fragment.contains(&self.marker) {
            self.take()
        } else {
            None
        }
    }

    /// Flush whatever remains at stream end.
    pub fn flush(&mut self) -> Option<String> {
        self.take()
    }

    fn take(&mut self) -> Option<String> {
        let unit = self.buf.trim().to_string();
        self.buf.clear();
        if unit.is_empty() {
            None
        } else {
            Some(unit)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_fragment_flushes_whole_sentence() {
        let mut seg = SentenceSegmenter::new("*");
        assert_eq!(seg.feed("The cat"), None);
        assert_eq!(seg.feed(" sat."), None);
        assert_eq!(seg.feed("*"), Some("The cat sat. *".to_string()));
        // Accumulator is empty afterwards.
        assert_eq!(seg.flush(), None);
    }

    #[test]
    fn test_flush_without_marker() {
        let mut seg = SentenceSegmenter::new("*");
        assert_eq!(seg.feed("Hello"), None);
        assert_eq!(seg.flush(), Some("Hello".to_string()));
    }

    #[test]
    fn test_embedded_marker_flushes_immediately() {
        let mut seg = SentenceSegmenter::new("*");
        assert_eq!(seg.feed("Quite the"), None);
        assert_eq!(
            seg.feed(" spectacle* And"),
            Some("Quite the spectacle* And".to_string())
        );
    }

    #[test]
    fn test_leading_marker_alone_yields_nothing() {
        let mut seg = SentenceSegmenter::new("*");
        // Marker with an empty accumulator flushes just the marker...
        assert_eq!(seg.feed("*"), Some("*".to_string()));
        // ...and an empty flush stays empty.
        assert_eq!(seg.flush(), None);
    }

    #[test]
    fn test_whitespace_remainder_is_dropped() {
        let mut seg = SentenceSegmenter::new("*");
        assert_eq!(seg.feed("   "), None);
        assert_eq!(seg.flush(), None);
    }

    #[test]
    fn test_multiple_sentences() {
        let mut seg = SentenceSegmenter::new("*");
        assert_eq!(seg.feed("One"), None);
        assert_eq!(seg.feed("*"), Some("One *".to_string()));
        assert_eq!(seg.feed("Two"), None);
        assert_eq!(seg.feed("*"), Some("Two *".to_string()));
    }

    #[test]
    fn test_custom_marker() {
        let mut seg = SentenceSegmenter::new("~");
        assert_eq!(seg.feed("Oh my"), None);
        assert_eq!(seg.feed("~"), Some("Oh my ~".to_string()));
    }
}
