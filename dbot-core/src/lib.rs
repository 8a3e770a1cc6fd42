//! # dbot-core
//!
//! Core types and traits for the bot framework: [`Message`] with its raw platform snapshot,
//! [`Handler`] / [`StepHandler`], the outbound [`Bot`] trait, error types and tracing initialization.
//! Used by dispatcher and dbot-telegram.

pub mod bot;
pub mod error;
pub mod handler;
pub mod logger;
pub mod types;

pub use bot::{Bot, ParseMode, Reply, SendOptions};
pub use error::{DbotError, HandlerError, Result};
pub use handler::{handler_fn, step_fn, Answers, FnHandler, FnStepHandler, Handler, StepHandler};
pub use logger::init_tracing;
pub use types::{Chat, Message, User};
