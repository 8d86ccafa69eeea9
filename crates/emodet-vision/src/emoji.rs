//! Emotion label to emoji lookup.

use std::collections::HashMap;
use std::path::Path;

use emodet_models::Emotion;
use tracing::info;

use crate::error::VisionResult;

/// Read-only map from lowercase emotion label to a display emoji.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmojiMap {
    entries: HashMap<String, String>,
}

impl Default for EmojiMap {
    fn default() -> Self {
        let entries = Emotion::ALL
            .iter()
            .map(|emotion| (emotion.as_str().to_string(), default_emoji(*emotion).to_string()))
            .collect();
        Self { entries }
    }
}

fn default_emoji(emotion: Emotion) -> &'static str {
    match emotion {
        Emotion::Angry => "😠",
        Emotion::Disgust => "🤢",
        Emotion::Fear => "😨",
        Emotion::Happy => "😊",
        Emotion::Neutral => "😐",
        Emotion::Sad => "😢",
        Emotion::Surprise => "😲",
    }
}

impl EmojiMap {
    /// Default map extended (or overridden) by a JSON object file,
    /// e.g. `{"happy": "😄", "contempt": "😒"}`.
    pub fn with_overrides_from_file(path: &Path) -> VisionResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let overrides: HashMap<String, String> = serde_json::from_str(&raw)?;
        let count = overrides.len();

        let mut map = Self::default();
        map.extend(overrides);

        info!(path = %path.display(), entries = count, "Loaded emoji overrides");
        Ok(map)
    }

    fn extend(&mut self, other: HashMap<String, String>) {
        for (k, v) in other {
            self.entries.insert(k.to_lowercase(), v);
        }
    }

    /// Case-insensitive lookup; unknown labels map to `""`.
    pub fn lookup(&self, label: &str) -> &str {
        self.entries
            .get(&label.to_lowercase())
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let map = EmojiMap::default();
        assert_eq!(map.lookup("Happy"), "😊");
        assert_eq!(map.lookup("HAPPY"), "😊");
        assert_eq!(map.lookup("happy"), "😊");
    }

    #[test]
    fn test_unknown_label_is_empty() {
        let map = EmojiMap::default();
        assert_eq!(map.lookup("contempt"), "");
        assert_eq!(map.lookup(""), "");
    }

    #[test]
    fn test_default_covers_all_emotions() {
        let map = EmojiMap::default();
        assert_eq!(map.len(), Emotion::ALL.len());
        for emotion in Emotion::ALL {
            assert!(!map.lookup(emotion.label()).is_empty());
        }
    }

    #[test]
    fn test_overrides_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"Happy": "😄", "contempt": "😒"}}"#).unwrap();

        let map = EmojiMap::with_overrides_from_file(file.path()).unwrap();
        assert_eq!(map.lookup("happy"), "😄");
        assert_eq!(map.lookup("Contempt"), "😒");
        assert_eq!(map.lookup("sad"), "😢");
    }

    #[test]
    fn test_overrides_from_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        assert!(EmojiMap::with_overrides_from_file(file.path()).is_err());
    }
}
