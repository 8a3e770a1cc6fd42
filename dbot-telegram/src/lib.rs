//! # dbot-telegram
//!
//! Telegram transport for the bot framework: Bot API client ([`TelegramApi`], implements
//! [`dbot_core::Bot`]), the long-poll [`Poller`], env-based [`BotConfig`] and the [`start_polling`] runner.
//! Routing and conversation state live in the `dispatcher` crate.

mod api;
mod config;
mod keyboard;
mod poller;
mod runner;
mod types;

pub use api::{TelegramApi, DEFAULT_API_URL};
pub use config::{BotConfig, DEFAULT_POLL_TIMEOUT};
pub use keyboard::{KeyboardButton, ReplyKeyboardMarkup};
pub use poller::{backoff_delay, Poller, UpdateSource, MAX_CONSECUTIVE_FAILURES};
pub use runner::{publish_commands, shutdown_signal, start_polling};
pub use types::{PhotoSize, Update, UserProfilePhotos};
