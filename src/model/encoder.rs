use serde::Deserialize;

use super::ModelError;

/// Maps class indices back to the label strings the model was trained on.
#[derive(Debug, Clone, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.classes.len() != 2 {
            return Err(ModelError::invalid(
                "label encoder",
                format!("expected 2 classes, found {}", self.classes.len()),
            ));
        }
        if self.classes.iter().any(|c| c.trim().is_empty()) {
            return Err(ModelError::invalid("label encoder", "empty class label"));
        }
        if self.classes[0] == self.classes[1] {
            return Err(ModelError::invalid("label encoder", "duplicate class labels"));
        }
        Ok(())
    }

    pub fn inverse_transform(&self, index: usize) -> Result<&str, ModelError> {
        self.classes
            .get(index)
            .map(String::as_str)
            .ok_or(ModelError::UnknownClass(index))
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}
