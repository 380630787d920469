pub mod client;
pub mod error;

pub use client::{DEFAULT_API_BASE, Destination, TelegramClient};
pub use error::{TelegramError, TelegramResult};
