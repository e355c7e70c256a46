use std::sync::{Arc, RwLock};

/// Shared narration history: every completed speakable unit, in order,
/// fed back to the generator as context for later turns.
///
/// The store is injected into each session rather than living in a
/// global, so tests can isolate sessions. The handle is cheap to
/// clone; all clones see the same entries. Append-only, never
/// truncated, process lifetime only.
#[derive(Clone, Default)]
pub struct DescriptionHistory {
    entries: Arc<RwLock<Vec<String>>>,
}

impl DescriptionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, text: String) {
        if let Ok(mut entries) = self.entries.write() {
            entries.push(text);
        }
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.entries.read().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_entries() {
        let history = DescriptionHistory::new();
        let other = history.clone();
        history.push("A fox *".into());
        other.push("A hound *".into());
        assert_eq!(history.snapshot(), vec!["A fox *", "A hound *"]);
        assert_eq!(other.len(), 2);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let history = DescriptionHistory::new();
        history.push("one".into());
        let snap = history.snapshot();
        history.push("two".into());
        assert_eq!(snap.len(), 1);
        assert_eq!(history.len(), 2);
    }
}
