//! # dbot-cli
//!
//! Command line parsing, config overrides and the demo order conversation.

pub mod cli;
pub mod demo;

pub use cli::{load_config, Cli, Commands};
pub use demo::order_registry;
pub use dbot_telegram::BotConfig;
