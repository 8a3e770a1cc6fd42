//! Middleware around message dispatch: `before` runs in registration order and may stop dispatch,
//! `after` runs in reverse order with the dispatch outcome.

use async_trait::async_trait;
use dbot_core::{Message, Result};
use tracing::{debug, info, instrument};

use crate::dispatcher::DispatchOutcome;

#[async_trait]
pub trait Middleware: Send + Sync {
    /// Return false to stop dispatch; no handler runs.
    async fn before(&self, _message: &Message) -> Result<bool> {
        Ok(true)
    }

    async fn after(&self, _message: &Message, _outcome: &DispatchOutcome) -> Result<()> {
        Ok(())
    }
}

pub struct LoggingMiddleware;

#[async_trait]
impl Middleware for LoggingMiddleware {
    #[instrument(skip(self, message))]
    async fn before(&self, message: &Message) -> Result<bool> {
        info!(
            user_id = message.user.id,
            chat_id = message.chat.id,
            username = %message.user.username.as_deref().unwrap_or("unknown"),
            message_content = %message.text().unwrap_or(""),
            "Received message"
        );
        Ok(true)
    }

    #[instrument(skip(self, message, outcome))]
    async fn after(&self, message: &Message, outcome: &DispatchOutcome) -> Result<()> {
        debug!(
            message_id = message.id,
            outcome = ?outcome,
            "Processed message"
        );
        Ok(())
    }
}
