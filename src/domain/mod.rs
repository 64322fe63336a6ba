pub mod examples;
pub mod types;

pub use types::{ClassificationResult, FeedbackRecord, Label};
