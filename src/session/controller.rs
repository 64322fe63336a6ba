use std::sync::Arc;

use crate::{
    domain::{examples, ClassificationResult, FeedbackRecord, Label},
    feedback::{FeedbackError, FeedbackStore},
    model::{ModelError, TextClassifier},
};

use super::{PendingPrediction, Session, SessionId, SessionStore};

#[derive(Debug, Clone, PartialEq)]
pub enum PredictOutcome {
    Predicted(ClassificationResult),
    EmptyInput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackOutcome {
    Saved(FeedbackRecord),
    NoPrediction,
}

/// Interaction state machine of the demo, independent of the chat surface.
pub struct DemoController {
    classifier: Arc<dyn TextClassifier>,
    feedback: Arc<FeedbackStore>,
    sessions: Arc<SessionStore>,
}

impl DemoController {
    pub fn new(
        classifier: Arc<dyn TextClassifier>,
        feedback: Arc<FeedbackStore>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            classifier,
            feedback,
            sessions,
        }
    }

    pub fn start_session(&self, id: SessionId) -> bool {
        self.sessions.start(id)
    }

    pub fn end_session(&self, id: SessionId) -> bool {
        self.sessions.end(id)
    }

    pub fn session(&self, id: SessionId) -> Option<Session> {
        self.sessions.get(id)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.active_count()
    }

    /// Puts a random example into the session input.
    pub fn load_example(&self, id: SessionId) -> &'static str {
        let example = examples::random_example();
        self.set_input(id, example);
        example
    }

    pub fn set_input(&self, id: SessionId, text: &str) {
        self.sessions
            .with_session(id, |session| session.input = text.to_string());
    }

    /// Sets the input and predicts it, like typing and pressing Predict.
    /// Blank text is rejected before the session is touched.
    pub fn submit(&self, id: SessionId, text: &str) -> Result<PredictOutcome, ModelError> {
        if text.trim().is_empty() {
            tracing::debug!(target: "session", session = id, "blank input rejected");
            return Ok(PredictOutcome::EmptyInput);
        }
        self.set_input(id, text);
        self.classify_and_remember(id, text.to_string())
    }

    pub fn predict_input(&self, id: SessionId) -> Result<PredictOutcome, ModelError> {
        let text = self
            .sessions
            .get(id)
            .map(|session| session.input)
            .unwrap_or_default();
        if text.trim().is_empty() {
            tracing::debug!(target: "session", session = id, "blank input rejected");
            return Ok(PredictOutcome::EmptyInput);
        }
        self.classify_and_remember(id, text)
    }

    fn classify_and_remember(
        &self,
        id: SessionId,
        text: String,
    ) -> Result<PredictOutcome, ModelError> {
        let result = self.classifier.classify(&text)?;
        tracing::info!(
            target: "session",
            session = id,
            label = %result.label,
            confidence = result.confidence,
            "prediction made"
        );

        let pending = PendingPrediction {
            text,
            label: result.label.clone(),
        };
        self.sessions
            .with_session(id, |session| session.last_prediction = Some(pending));
        Ok(PredictOutcome::Predicted(result))
    }

    /// Records the user's verdict on the last prediction. The pending
    /// prediction is kept, so repeated verdicts produce repeated rows.
    pub fn record_feedback(
        &self,
        id: SessionId,
        verdict: Label,
    ) -> Result<FeedbackOutcome, FeedbackError> {
        let pending = self
            .sessions
            .get(id)
            .and_then(|session| session.last_prediction);
        let Some(pending) = pending else {
            tracing::debug!(
                target: "session",
                session = id,
                "feedback without prediction ignored"
            );
            return Ok(FeedbackOutcome::NoPrediction);
        };

        let record = FeedbackRecord {
            text: pending.text,
            predicted: pending.label,
            correct: verdict,
        };
        self.feedback.append(&record)?;
        Ok(FeedbackOutcome::Saved(record))
    }
}
