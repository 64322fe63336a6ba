use chrono_tz::Tz;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::{
    domain::{ClassificationResult, Label},
    session::Session,
};

pub const EMPTY_INPUT_WARNING: &str = "Please enter some text to classify!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Either of the two random example buttons.
    Example(u8),
    Predict,
    Feedback(Label),
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        match data.split_once(':') {
            Some(("example", slot)) => slot.parse().ok().map(CallbackAction::Example),
            Some(("feedback", verdict)) => Label::parse(verdict).map(CallbackAction::Feedback),
            None if data == "predict" => Some(CallbackAction::Predict),
            _ => None,
        }
    }

    pub fn data(&self) -> String {
        match self {
            CallbackAction::Example(slot) => format!("example:{slot}"),
            CallbackAction::Predict => "predict".to_string(),
            CallbackAction::Feedback(label) => format!("feedback:{}", label.as_str()),
        }
    }
}

fn button(text: &str, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, action.data())
}

fn example_row() -> Vec<InlineKeyboardButton> {
    vec![
        button("Random Example 1", CallbackAction::Example(1)),
        button("Random Example 2", CallbackAction::Example(2)),
    ]
}

pub fn example_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![example_row()])
}

pub fn predict_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("Predict 🕵️", CallbackAction::Predict)],
        example_row(),
    ])
}

pub fn feedback_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        button("✅ Correct - Real", CallbackAction::Feedback(Label::Real)),
        button("⚠️ Correct - Fake", CallbackAction::Feedback(Label::Spam)),
    ]])
}

pub fn format_prediction(result: &ClassificationResult) -> String {
    let marker = match result.category {
        Label::Spam => "⚠️",
        Label::Real => "✅",
    };
    format!(
        "{marker} <b>Prediction: {}</b> ({:.2}% confidence)\n\nWas this prediction correct?",
        escape_html(&result.label),
        result.confidence_percent()
    )
}

pub fn format_example(text: &str) -> String {
    format!(
        "Example loaded:\n<pre>{}</pre>\nPress Predict to classify it.",
        escape_html(text)
    )
}

pub fn feedback_saved_text(verdict: Label) -> &'static str {
    match verdict {
        Label::Real => "Feedback saved! (Marked as Real)",
        Label::Spam => "Feedback saved! (Marked as Fake)",
    }
}

pub fn format_status(session: Option<&Session>, tz: Tz, active_sessions: usize) -> String {
    let Some(session) = session else {
        return format!("No open session.\nActive sessions: {active_sessions}");
    };
    let started = session.started_at.with_timezone(&tz);
    let last = session
        .last_prediction
        .as_ref()
        .map(|p| escape_html(&p.label))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "Session started: {}\nInput length: {} chars\nLast prediction: {}\nActive sessions: {}",
        started.format("%Y-%m-%d %H:%M:%S %Z"),
        session.input.chars().count(),
        last,
        active_sessions
    )
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_data_parses_back() {
        for action in [
            CallbackAction::Example(1),
            CallbackAction::Example(2),
            CallbackAction::Predict,
            CallbackAction::Feedback(Label::Real),
            CallbackAction::Feedback(Label::Spam),
        ] {
            assert_eq!(CallbackAction::parse(&action.data()), Some(action));
        }
    }

    #[test]
    fn unknown_callback_data_is_ignored() {
        assert_eq!(CallbackAction::parse("feedback:ham"), None);
        assert_eq!(CallbackAction::parse("example:x"), None);
        assert_eq!(CallbackAction::parse("predict:now"), None);
        assert_eq!(CallbackAction::parse(""), None);
    }

    #[test]
    fn prediction_shows_label_and_display_confidence() {
        let spam = ClassificationResult::new("spam", Label::Spam, 0.9876);
        let text = format_prediction(&spam);
        assert!(text.starts_with("⚠️"));
        assert!(text.contains("Prediction: spam</b> (98.76% confidence)"));

        let real = ClassificationResult::new("ham", Label::Real, 0.25);
        assert!(format_prediction(&real).contains("(75.00% confidence)"));
    }

    #[test]
    fn example_text_is_escaped() {
        let text = format_example("txt> CSH11 & <send>");
        assert!(text.contains("txt&gt; CSH11 &amp; &lt;send&gt;"));
    }
}
