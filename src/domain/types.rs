use std::fmt;

use serde::{Deserialize, Serialize};

/// Normalized class of a prediction, also used as the user's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Spam,
    Real,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Spam => "spam",
            Label::Real => "real",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "spam" => Some(Label::Spam),
            "real" => Some(Label::Real),
            _ => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    /// Label text exactly as the encoder produced it.
    pub label: String,
    pub category: Label,
    /// Confidence in the displayed label, not the raw model output.
    pub confidence: f64,
    pub positive_probability: f64,
}

impl ClassificationResult {
    pub fn new(label: impl Into<String>, category: Label, positive_probability: f64) -> Self {
        let positive_probability = positive_probability.clamp(0.0, 1.0);
        let confidence = match category {
            Label::Spam => positive_probability,
            Label::Real => 1.0 - positive_probability,
        };
        Self {
            label: label.into(),
            category,
            confidence,
            positive_probability,
        }
    }

    pub fn confidence_percent(&self) -> f64 {
        self.confidence * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub text: String,
    pub predicted: String,
    pub correct: Label,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_tracks_displayed_label() {
        let spam = ClassificationResult::new("spam", Label::Spam, 0.8);
        assert!((spam.confidence - 0.8).abs() < 1e-12);

        let real = ClassificationResult::new("ham", Label::Real, 0.2);
        assert!((real.confidence - 0.8).abs() < 1e-12);
        assert!((real.positive_probability - 0.2).abs() < 1e-12);
    }

    #[test]
    fn label_round_trips_through_text() {
        assert_eq!(Label::parse(Label::Spam.as_str()), Some(Label::Spam));
        assert_eq!(Label::parse("real"), Some(Label::Real));
        assert_eq!(Label::parse("ham"), None);
    }
}
