pub mod env;
mod loader;

pub use env::{AppConfig, DirectoryConfig, LoggingConfig, ModelConfig};
pub use loader::load_config;
