use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub telegram_bot_token: String,
    pub bot_username: Option<String>,
    pub directories: DirectoryConfig,
    pub model: ModelConfig,
    pub logging: LoggingConfig,
    pub timezone: String,
    pub resilience: ResilienceConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub logs_dir: String,
    pub data_dir: String,
    pub model_dir: String,
    pub feedback_filename: String,
}

/// File names of the three pre-built artifacts inside `DirectoryConfig::model_dir`.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub vectorizer_file: String,
    pub model_file: String,
    pub encoder_file: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file_name: String,
}

#[derive(Debug, Clone)]
pub struct ResilienceConfig {
    pub network_error_window: Duration,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub idle_ttl: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}
