//! Emotion labels and classifier output.
//!
//! The label set matches the seven-class facial expression models the
//! service ships with:
//!
//! | id | label |
//! |----|-------|
//! | 0 | Angry |
//! | 1 | Disgust |
//! | 2 | Fear |
//! | 3 | Happy |
//! | 4 | Neutral |
//! | 5 | Sad |
//! | 6 | Surprise |

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Facial expression class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Neutral,
    Sad,
    Surprise,
}

impl Emotion {
    /// All emotions, indexed by classifier output id.
    pub const ALL: &'static [Emotion] = &[
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Happy,
        Emotion::Neutral,
        Emotion::Sad,
        Emotion::Surprise,
    ];

    /// Lowercase key, as used by the emoji lookup.
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Angry => "angry",
            Emotion::Disgust => "disgust",
            Emotion::Fear => "fear",
            Emotion::Happy => "happy",
            Emotion::Neutral => "neutral",
            Emotion::Sad => "sad",
            Emotion::Surprise => "surprise",
        }
    }

    /// Display label returned to clients.
    pub fn label(&self) -> &'static str {
        match self {
            Emotion::Angry => "Angry",
            Emotion::Disgust => "Disgust",
            Emotion::Fear => "Fear",
            Emotion::Happy => "Happy",
            Emotion::Neutral => "Neutral",
            Emotion::Sad => "Sad",
            Emotion::Surprise => "Surprise",
        }
    }

    /// Classifier output id.
    pub fn id(&self) -> u32 {
        match self {
            Emotion::Angry => 0,
            Emotion::Disgust => 1,
            Emotion::Fear => 2,
            Emotion::Happy => 3,
            Emotion::Neutral => 4,
            Emotion::Sad => 5,
            Emotion::Surprise => 6,
        }
    }

    /// Look up an emotion by classifier output id.
    pub fn from_id(id: usize) -> Option<Emotion> {
        Self::ALL.get(id).copied()
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Output of an emotion classifier for a single face crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Classification {
    /// Label as reported by the model (case as-is)
    pub emotion_label: String,
    /// Numeric class id
    pub emotion_id: u32,
    /// Probability of the winning class, in [0, 1]
    pub confidence: f32,
}

impl Classification {
    pub fn new(emotion_label: impl Into<String>, emotion_id: u32, confidence: f32) -> Self {
        Self {
            emotion_label: emotion_label.into(),
            emotion_id,
            confidence,
        }
    }
}

impl From<(Emotion, f32)> for Classification {
    fn from((emotion, confidence): (Emotion, f32)) -> Self {
        Self::new(emotion.label(), emotion.id(), confidence)
    }
}
