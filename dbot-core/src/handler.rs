//! Handler traits.
//!
//! A [`Handler`] receives only the message (entry steps, plain commands, fallbacks).
//! A [`StepHandler`] is a mid-conversation step: it also receives every answer collected so far.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Message;

/// Latest message seen at each step name, across the whole conversation.
pub type Answers = BTreeMap<String, Message>;

/// Message-only handler.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, message: &Message) -> Result<()>;
}

/// Conversation step handler: message plus the answers map.
#[async_trait]
pub trait StepHandler: Send + Sync {
    async fn handle(&self, message: &Message, answers: &Answers) -> Result<()>;
}

/// Adapts an async closure `Fn(Message) -> Future` into a [`Handler`].
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn handle(&self, message: &Message) -> Result<()> {
        (self.0)(message.clone()).await
    }
}

/// Adapts an async closure `Fn(Message, Answers) -> Future` into a [`StepHandler`].
pub struct FnStepHandler<F>(pub F);

#[async_trait]
impl<F, Fut> StepHandler for FnStepHandler<F>
where
    F: Fn(Message, Answers) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn handle(&self, message: &Message, answers: &Answers) -> Result<()> {
        (self.0)(message.clone(), answers.clone()).await
    }
}

pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn Handler>
where
    F: Fn(Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

pub fn step_fn<F, Fut>(f: F) -> Arc<dyn StepHandler>
where
    F: Fn(Message, Answers) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(FnStepHandler(f))
}
