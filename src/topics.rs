use std::{fmt, str::FromStr};

use rand::seq::IndexedRandom;

use crate::error::QuizError;

/// The nine NPTE content areas a question can be requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    CardiovascularPulmonary,
    Musculoskeletal,
    Neuromuscular,
    Integumentary,
    MetabolicEndocrine,
    Gastrointestinal,
    Genitourinary,
    Lymphatic,
    SystemInteractions,
}

impl Topic {
    pub const ALL: [Topic; 9] = [
        Topic::CardiovascularPulmonary,
        Topic::Musculoskeletal,
        Topic::Neuromuscular,
        Topic::Integumentary,
        Topic::MetabolicEndocrine,
        Topic::Gastrointestinal,
        Topic::Genitourinary,
        Topic::Lymphatic,
        Topic::SystemInteractions,
    ];

    /// Exact wording sent to the question generator.
    pub fn label(self) -> &'static str {
        match self {
            Self::CardiovascularPulmonary => "Cardiovascular and pulmonary systems",
            Self::Musculoskeletal => "Musculoskeletal system",
            Self::Neuromuscular => "Neuromuscular and nervous systems",
            Self::Integumentary => "Integumentary system",
            Self::MetabolicEndocrine => "Metabolic and endocrine systems",
            Self::Gastrointestinal => "Gastrointestinal system",
            Self::Genitourinary => "Genitourinary system",
            Self::Lymphatic => "Lymphatic system",
            Self::SystemInteractions => "System interactions",
        }
    }

    pub fn index(self) -> usize {
        Self::ALL
            .iter()
            .position(|topic| *topic == self)
            .unwrap_or_default()
    }

    pub fn random() -> Self {
        *Self::ALL
            .choose(&mut rand::rng())
            .unwrap_or(&Self::CardiovascularPulmonary)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Topic {
    type Err = QuizError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|topic| topic.label() == trimmed)
            .ok_or_else(|| QuizError::UnknownTopic(value.to_string()))
    }
}
