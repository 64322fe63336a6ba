use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use teloxide::prelude::*;

use crate::{
    config::AppConfig,
    feedback::FeedbackStore,
    infrastructure::{directories::ResolvedPaths, shutdown::Shutdown},
    model::Predictor,
    session::{DemoController, SessionStore},
    telegram::TelegramService,
};

pub struct ClassifierApp {
    telegram: TelegramService,
    shutdown: Shutdown,
}

impl ClassifierApp {
    pub fn initialize(
        config: AppConfig,
        paths: ResolvedPaths,
        shutdown: Shutdown,
    ) -> Result<Self> {
        let config = Arc::new(config);

        let predictor = Predictor::load(&paths.model_dir, &config.model)
            .context("cannot serve predictions without the model artifacts")?;

        let feedback = Arc::new(FeedbackStore::new(&paths.feedback_path));
        feedback.ensure_exists()?;
        tracing::info!(
            target: "feedback",
            path = %feedback.path().display(),
            "feedback log ready"
        );

        let controller = Arc::new(DemoController::new(
            Arc::new(predictor),
            feedback,
            Arc::new(SessionStore::new(config.session.idle_ttl)),
        ));

        let bot = Bot::new(&config.telegram_bot_token);
        let telegram = TelegramService::new(bot, config, controller);

        Ok(Self {
            telegram,
            shutdown,
        })
    }

    pub async fn run(self) -> Result<()> {
        let ClassifierApp {
            telegram,
            shutdown,
        } = self;

        tracing::info!(target: "lifecycle", "fake/real classifier bot starting");

        let mut shutdown_listener = shutdown.subscribe();
        let shutdown_timeout = Duration::from_secs(5);
        let mut telegram_future = Box::pin(telegram.run(shutdown.subscribe()));
        let mut telegram_completed = false;
        let mut outcome = Ok(());

        tokio::select! {
            _ = shutdown_listener.notified() => {
                tracing::info!(target: "lifecycle", "shutdown signal received (CTRL+C / SIGTERM)");
            }
            res = &mut telegram_future => {
                telegram_completed = true;
                if let Err(err) = res {
                    tracing::error!(target: "lifecycle", ?err, "Telegram dispatcher failed");
                    outcome = Err(err);
                } else {
                    tracing::info!(target: "lifecycle", "Telegram dispatcher finished");
                }
            }
        }

        shutdown.trigger();

        if !telegram_completed {
            let wait = tokio::time::sleep(shutdown_timeout);
            tokio::pin!(wait);
            tokio::select! {
                res = &mut telegram_future => {
                    if let Err(err) = res {
                        tracing::error!(
                            target: "lifecycle",
                            ?err,
                            "Telegram dispatcher failed during shutdown"
                        );
                    }
                }
                _ = &mut wait => {
                    tracing::warn!(
                        target: "lifecycle",
                        "Telegram dispatcher did not stop within {:?}; forcing exit",
                        shutdown_timeout
                    );
                }
            }
        }

        tracing::info!(target: "lifecycle", "bot stopped");
        outcome
    }
}
