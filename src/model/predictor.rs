use std::path::Path;

use crate::{
    config::ModelConfig,
    domain::{ClassificationResult, Label},
};

use super::{
    classifier::ClassifierModel, encoder::LabelEncoder, load_json, vectorizer::TfidfVectorizer,
    ModelError,
};

/// Column of the probability output that the decision rule maps to spam.
pub const POSITIVE_CLASS: usize = 1;

pub trait TextClassifier: Send + Sync {
    /// Callers must reject blank text before calling.
    fn classify(&self, text: &str) -> Result<ClassificationResult, ModelError>;
}

pub struct Predictor {
    vectorizer: TfidfVectorizer,
    model: ClassifierModel,
    encoder: LabelEncoder,
}

impl Predictor {
    pub fn load(model_dir: &Path, config: &ModelConfig) -> Result<Self, ModelError> {
        let vectorizer: TfidfVectorizer =
            load_json("vectorizer", &model_dir.join(&config.vectorizer_file))?;
        let model: ClassifierModel = load_json("classifier", &model_dir.join(&config.model_file))?;
        let encoder: LabelEncoder =
            load_json("label encoder", &model_dir.join(&config.encoder_file))?;

        let predictor = Self::from_parts(vectorizer, model, encoder)?;
        tracing::info!(
            target: "model",
            dir = %model_dir.display(),
            features = predictor.vectorizer.n_features(),
            classes = ?predictor.classes(),
            "model artifacts loaded"
        );
        Ok(predictor)
    }

    pub fn from_parts(
        vectorizer: TfidfVectorizer,
        model: ClassifierModel,
        encoder: LabelEncoder,
    ) -> Result<Self, ModelError> {
        vectorizer.validate()?;
        model.validate(vectorizer.n_features())?;
        encoder.validate()?;

        let positive = encoder.inverse_transform(POSITIVE_CLASS)?.to_lowercase();
        if positive != "spam" && positive != "fake" {
            tracing::warn!(
                target: "model",
                positive_label = %positive,
                "positive class label does not look like spam; it is still treated as spam"
            );
        }

        Ok(Self {
            vectorizer,
            model,
            encoder,
        })
    }

    pub fn classes(&self) -> &[String] {
        self.encoder.classes()
    }
}

impl TextClassifier for Predictor {
    fn classify(&self, text: &str) -> Result<ClassificationResult, ModelError> {
        let features = self.vectorizer.transform(text);
        let probability = self.model.predict_proba(&features);
        let index = self.model.predict(&features);
        let label = self.encoder.inverse_transform(index)?;
        let category = if index == POSITIVE_CLASS {
            Label::Spam
        } else {
            Label::Real
        };

        tracing::debug!(
            target: "model",
            matched_terms = features.len(),
            probability,
            label,
            "text classified"
        );
        Ok(ClassificationResult::new(label, category, probability))
    }
}
