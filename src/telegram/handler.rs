use std::{sync::Arc, time::Duration};

use anyhow::Result;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use teloxide::{
    dispatching::Dispatcher,
    error_handlers::ErrorHandler,
    prelude::*,
    types::{CallbackQuery, ChatId, Message, ParseMode},
    update_listeners,
    utils::command::BotCommands,
};
use tokio::time::Instant;

use crate::{
    config::AppConfig,
    domain::Label,
    infrastructure::shutdown::ShutdownListener,
    model::ModelError,
    session::{DemoController, FeedbackOutcome, PredictOutcome},
};

use super::{
    types::{session_id, AppState, BotResult, DemoCommand},
    utils::{
        example_keyboard, feedback_keyboard, feedback_saved_text, format_example,
        format_prediction, format_status, predict_keyboard, CallbackAction, EMPTY_INPUT_WARNING,
    },
};

pub struct TelegramService {
    bot: Bot,
    state: Arc<AppState>,
}

#[derive(Default)]
struct WatchdogState {
    first_error_at: Option<Instant>,
    consecutive_errors: u32,
}

#[derive(Clone, Copy, Debug)]
enum NetworkIssueKind {
    Timeout,
    Connection,
    Other,
}

impl NetworkIssueKind {
    fn label(&self) -> &'static str {
        match self {
            NetworkIssueKind::Timeout => "request timeout",
            NetworkIssueKind::Connection => "connection failure",
            NetworkIssueKind::Other => "network error",
        }
    }
}

/// Logs polling failures, grouping consecutive network errors within a window.
struct PollingWatchdog {
    window: Duration,
    state: Mutex<WatchdogState>,
}

impl PollingWatchdog {
    fn new(window: Duration) -> Arc<Self> {
        Arc::new(Self {
            window,
            state: Mutex::new(WatchdogState::default()),
        })
    }

    fn process_error(&self, error: teloxide::RequestError) {
        match Self::classify_network_issue(&error) {
            Some((kind, url)) => {
                let consecutive = self.bump(Instant::now());
                tracing::error!(
                    target: "telegram",
                    issue = kind.label(),
                    url = url.as_deref(),
                    consecutive,
                    error = %error,
                    "Telegram polling network failure"
                );
            }
            None => {
                tracing::error!(target: "telegram", error = %error, "update listener error");
            }
        }
    }

    fn classify_network_issue(
        error: &teloxide::RequestError,
    ) -> Option<(NetworkIssueKind, Option<String>)> {
        match error {
            teloxide::RequestError::Network(source) => {
                let req_err = source.as_ref();
                let kind = if req_err.is_timeout() {
                    NetworkIssueKind::Timeout
                } else if req_err.is_connect() {
                    NetworkIssueKind::Connection
                } else {
                    NetworkIssueKind::Other
                };
                Some((kind, req_err.url().map(|u| u.to_string())))
            }
            _ => None,
        }
    }

    /// Returns the number of failures seen in the current window.
    fn bump(&self, now: Instant) -> u32 {
        let mut state = self.state.lock();
        if state
            .first_error_at
            .map(|ts| now.duration_since(ts) > self.window)
            .unwrap_or(true)
        {
            state.first_error_at = Some(now);
            state.consecutive_errors = 0;
        }
        state.consecutive_errors = state.consecutive_errors.saturating_add(1);
        state.consecutive_errors
    }
}

impl ErrorHandler<teloxide::RequestError> for PollingWatchdog {
    fn handle_error(self: Arc<Self>, error: teloxide::RequestError) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            self.process_error(error);
        })
    }
}

impl TelegramService {
    pub fn new(bot: Bot, config: Arc<AppConfig>, controller: Arc<DemoController>) -> Self {
        let state = Arc::new(AppState { config, controller });
        Self { bot, state }
    }

    pub async fn run(&self, mut shutdown: ShutdownListener) -> Result<()> {
        if shutdown.is_triggered() {
            tracing::info!(target: "telegram", "shutdown already requested; not polling");
            return Ok(());
        }
        self.bot
            .set_my_commands(DemoCommand::bot_commands())
            .await?;
        let me = self.bot.get_me().await?;
        if let Some(expected_username) = &self.state.config.bot_username {
            if me.username.as_deref() != Some(expected_username.as_str()) {
                tracing::warn!(
                    target: "telegram",
                    expected = expected_username.as_str(),
                    actual = ?me.username,
                    "BOT_USERNAME does not match the connected bot account"
                );
            }
        }
        tracing::info!(
            target: "telegram",
            bot_id = me.id.0,
            username = ?me.username,
            "connected to Telegram"
        );

        let handler = dptree::entry()
            .branch(
                Update::filter_message()
                    .branch(
                        dptree::entry()
                            .filter_command::<DemoCommand>()
                            .endpoint(Self::on_command),
                    )
                    .branch(dptree::endpoint(Self::on_plain_message)),
            )
            .branch(Update::filter_callback_query().endpoint(Self::on_callback));

        let mut dispatcher = Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![self.state.clone()])
            .default_handler(|update| async move {
                tracing::debug!(target: "telegram", ?update, "unhandled update");
            })
            .build();

        let listener = update_listeners::polling_default(self.bot.clone()).await;
        let watchdog = PollingWatchdog::new(self.state.config.resilience.network_error_window);

        let shutdown_token = dispatcher.shutdown_token();
        let mut dispatcher_future = Box::pin(dispatcher.dispatch_with_listener(listener, watchdog));
        let mut dispatcher_finished = false;

        tokio::select! {
            _ = shutdown.notified() => {
                tracing::info!(target: "telegram", "dispatcher shutdown requested");
                if let Ok(wait) = shutdown_token.shutdown() {
                    wait.await;
                }
            }
            _ = &mut dispatcher_future => {
                dispatcher_finished = true;
                tracing::info!(target: "telegram", "dispatcher stopped");
            }
        }

        if !dispatcher_finished {
            dispatcher_future.await;
        }

        Ok(())
    }

    async fn on_plain_message(bot: Bot, msg: Message, state: Arc<AppState>) -> BotResult<()> {
        // In groups only explicit /predict commands are classified.
        if !msg.chat.is_private() {
            return Ok(());
        }

        let Some(text) = msg.text() else {
            bot.send_message(msg.chat.id, "Only text messages can be classified.")
                .await?;
            return Ok(());
        };
        if text.starts_with('/') {
            bot.send_message(msg.chat.id, DemoCommand::descriptions().to_string())
                .await?;
            return Ok(());
        }

        let outcome = state.controller.submit(session_id(msg.chat.id), text);
        Self::reply_prediction(&bot, msg.chat.id, outcome).await
    }

    async fn on_command(
        bot: Bot,
        msg: Message,
        cmd: DemoCommand,
        state: Arc<AppState>,
    ) -> BotResult<()> {
        let id = session_id(msg.chat.id);
        match cmd {
            DemoCommand::Start => {
                state.controller.start_session(id);
                bot.send_message(
                    msg.chat.id,
                    "This is an interactive Fake / Real classifier.\n\
                     Send any text to classify it, or try a random example!",
                )
                .reply_markup(example_keyboard())
                .await?;
            }
            DemoCommand::Help => {
                bot.send_message(msg.chat.id, DemoCommand::descriptions().to_string())
                    .await?;
            }
            DemoCommand::Predict(text) => {
                let outcome = if text.trim().is_empty() {
                    state.controller.predict_input(id)
                } else {
                    state.controller.submit(id, &text)
                };
                Self::reply_prediction(&bot, msg.chat.id, outcome).await?;
            }
            DemoCommand::Example => {
                Self::send_example(&bot, msg.chat.id, &state).await?;
            }
            DemoCommand::Status => {
                let session = state.controller.session(id);
                let text = format_status(
                    session.as_ref(),
                    state.timezone(),
                    state.controller.active_sessions(),
                );
                bot.send_message(msg.chat.id, text)
                    .parse_mode(ParseMode::Html)
                    .await?;
            }
            DemoCommand::End => {
                let text = if state.controller.end_session(id) {
                    "Session ended. Send /start to begin again."
                } else {
                    "There is no open session."
                };
                bot.send_message(msg.chat.id, text).await?;
            }
        }
        Ok(())
    }

    async fn on_callback(bot: Bot, q: CallbackQuery, state: Arc<AppState>) -> BotResult<()> {
        let action = q.data.as_deref().and_then(CallbackAction::parse);
        let chat_id = q.message.as_ref().map(|m| m.chat().id);
        let (Some(action), Some(chat_id)) = (action, chat_id) else {
            tracing::debug!(target: "telegram", data = ?q.data, "ignoring callback");
            bot.answer_callback_query(q.id.clone()).await?;
            return Ok(());
        };
        let id = session_id(chat_id);

        match action {
            CallbackAction::Example(slot) => {
                tracing::debug!(target: "telegram", slot, "random example requested");
                bot.answer_callback_query(q.id.clone()).await?;
                Self::send_example(&bot, chat_id, &state).await?;
            }
            CallbackAction::Predict => {
                bot.answer_callback_query(q.id.clone()).await?;
                let outcome = state.controller.predict_input(id);
                Self::reply_prediction(&bot, chat_id, outcome).await?;
            }
            CallbackAction::Feedback(verdict) => {
                let notice = Self::save_feedback(&state, id, verdict);
                bot.answer_callback_query(q.id.clone())
                    .text(notice)
                    .await?;
                bot.send_message(chat_id, notice).await?;
            }
        }
        Ok(())
    }

    fn save_feedback(state: &AppState, id: i64, verdict: Label) -> &'static str {
        match state.controller.record_feedback(id, verdict) {
            Ok(FeedbackOutcome::Saved(_)) => feedback_saved_text(verdict),
            Ok(FeedbackOutcome::NoPrediction) => {
                "There is no prediction to rate yet. Send some text first."
            }
            Err(err) => {
                tracing::error!(
                    target: "feedback",
                    error = %err,
                    session = id,
                    "failed to save feedback"
                );
                "Saving feedback failed."
            }
        }
    }

    async fn send_example(bot: &Bot, chat_id: ChatId, state: &AppState) -> BotResult<()> {
        let example = state.controller.load_example(session_id(chat_id));
        bot.send_message(chat_id, format_example(example))
            .parse_mode(ParseMode::Html)
            .reply_markup(predict_keyboard())
            .await?;
        Ok(())
    }

    async fn reply_prediction(
        bot: &Bot,
        chat_id: ChatId,
        outcome: Result<PredictOutcome, ModelError>,
    ) -> BotResult<()> {
        match outcome {
            Ok(PredictOutcome::Predicted(result)) => {
                bot.send_message(chat_id, format_prediction(&result))
                    .parse_mode(ParseMode::Html)
                    .reply_markup(feedback_keyboard())
                    .await?;
            }
            Ok(PredictOutcome::EmptyInput) => {
                bot.send_message(chat_id, EMPTY_INPUT_WARNING).await?;
            }
            Err(err) => {
                tracing::error!(
                    target: "model",
                    error = %err,
                    chat_id = chat_id.0,
                    "classification failed"
                );
                bot.send_message(chat_id, "Classification failed. Please try again later.")
                    .await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watchdog_counts_failures_within_window() {
        let watchdog = PollingWatchdog::new(Duration::from_secs(60));
        let start = Instant::now();

        assert_eq!(watchdog.bump(start), 1);
        assert_eq!(watchdog.bump(start + Duration::from_secs(10)), 2);
        assert_eq!(watchdog.bump(start + Duration::from_secs(30)), 3);
        // Window is measured from the first failure of the burst.
        assert_eq!(watchdog.bump(start + Duration::from_secs(61)), 1);
    }
}
