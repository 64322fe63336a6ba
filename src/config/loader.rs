use std::{env, time::Duration};

use super::env::{
    AppConfig, ConfigError, DirectoryConfig, LoggingConfig, ModelConfig, ResilienceConfig,
    SessionConfig,
};

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_env()
}

impl AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let telegram_bot_token = env::var("TELEGRAM_BOT_TOKEN")
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;

        let bot_username = env::var("BOT_USERNAME").ok().filter(|v| !v.is_empty());

        let directories = DirectoryConfig {
            logs_dir: var_or("LOGS_DIR", "logs"),
            data_dir: var_or("DATA_DIR", "data"),
            model_dir: var_or("MODEL_DIR", "models"),
            feedback_filename: var_or("FEEDBACK_FILE", "feedback.csv"),
        };

        let model = ModelConfig {
            vectorizer_file: var_or("VECTORIZER_FILE", "tfidf_vectorizer.json"),
            model_file: var_or("MODEL_FILE", "spam_model.json"),
            encoder_file: var_or("ENCODER_FILE", "label_encoder.json"),
        };

        let logging = LoggingConfig {
            level: var_or("LOG_LEVEL", "info"),
            file_name: var_or("LOG_FILE", "classifier.log"),
        };

        let timezone = var_or("BOT_TIMEZONE", "UTC");
        if timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(ConfigError::Invalid {
                key: "BOT_TIMEZONE",
                value: timezone,
            });
        }

        let resilience = ResilienceConfig {
            network_error_window: Duration::from_secs(
                parse_u64("NETWORK_ERROR_WINDOW_SECS")?.unwrap_or(60),
            ),
        };

        let session = SessionConfig {
            idle_ttl: Duration::from_secs(parse_u64("SESSION_IDLE_TTL_SECS")?.unwrap_or(3600)),
        };

        Ok(Self {
            telegram_bot_token,
            bot_username,
            directories,
            model,
            logging,
            timezone,
            resilience,
            session,
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_u64(key: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(None),
    }
}
