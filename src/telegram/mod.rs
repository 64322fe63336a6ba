pub mod handler;
pub mod types;
pub mod utils;

pub use handler::TelegramService;
