use std::sync::Arc;

use chrono_tz::Tz;
use teloxide::{types::ChatId, utils::command::BotCommands};

use crate::{config::AppConfig, session::DemoController};

pub type BotResult<T> = Result<T, teloxide::RequestError>;

pub struct AppState {
    pub config: Arc<AppConfig>,
    pub controller: Arc<DemoController>,
}

impl AppState {
    pub fn timezone(&self) -> Tz {
        self.config.timezone.parse().unwrap_or(chrono_tz::UTC)
    }
}

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum DemoCommand {
    #[command(description = "open a session and show the examples")]
    Start,
    #[command(description = "show this help")]
    Help,
    #[command(description = "classify the given text, or the current input")]
    Predict(String),
    #[command(description = "load a random example text")]
    Example,
    #[command(description = "show the session status")]
    Status,
    #[command(description = "end the session and forget the last prediction")]
    End,
}

pub fn session_id(chat_id: ChatId) -> i64 {
    chat_id.0
}
