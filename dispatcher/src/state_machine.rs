//! Push-down conversation protocol on top of a [`DocumentStore`].
//!
//! - **enter**: resets the user to a fresh conversation at the entry step, then runs the handler.
//! - **advance**: when the current step passes the handler's filter, records the new frame and the
//!   step's answer, then runs the handler with every answer collected so far.
//! - **go_back**: steps back one frame and replays the step it returns to; at the root it runs the
//!   wrapped handler instead.
//!
//! Unknown users and filter mismatches are silent no-ops. Each transition is one read and at most
//! one write per store path; nothing here locks, callers serialize per user.

use std::sync::Arc;

use dbot_core::{Answers, DbotError, Handler, Message, Result, StepHandler};
use serde_json::{Map, Value};
use storage::{DocumentStore, StorageError};
use tracing::{debug, info, instrument, warn};

use crate::registry::{HandlerSpec, Registry, RouteKey, StateFilter, Transition};
use crate::state::{answers_path, user_path, ConversationState, StackFrame, UserDocument, USERS_ROOT};

fn store_error(e: StorageError) -> DbotError {
    DbotError::Database(e.to_string())
}

#[derive(Clone)]
pub struct StateMachine {
    store: Arc<dyn DocumentStore>,
    registry: Arc<Registry>,
}

impl StateMachine {
    pub fn new(store: Arc<dyn DocumentStore>, registry: Arc<Registry>) -> Self {
        Self { store, registry }
    }

    /// Current conversation of a user, `None` before the first entry step.
    pub async fn load(&self, user_id: i64) -> Result<Option<ConversationState>> {
        let Some(doc) = self
            .store
            .get(&user_path(user_id))
            .await
            .map_err(store_error)?
        else {
            return Ok(None);
        };
        let doc: UserDocument = serde_json::from_value(doc)?;
        Ok(doc.into_state())
    }

    /// Every answer recorded for the user, keyed by step name.
    pub async fn answers(&self, user_id: i64) -> Result<Answers> {
        let mut answers = Answers::new();
        let Some(Value::Object(updates)) = self
            .store
            .get(&answers_path(user_id))
            .await
            .map_err(store_error)?
        else {
            return Ok(answers);
        };
        for (step, snapshot) in updates {
            match Message::from_raw(snapshot) {
                Ok(message) => {
                    answers.insert(step, message);
                }
                Err(e) => warn!(user_id, step = %step, error = %e, "Skipping undecodable answer"),
            }
        }
        Ok(answers)
    }

    async fn save(&self, user_id: i64, conversation: &ConversationState) -> Result<()> {
        self.store
            .update(&user_path(user_id), serde_json::to_value(conversation)?)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn record_answer(&self, user_id: i64, step: &str, snapshot: &Value) -> Result<()> {
        let mut update = Map::new();
        update.insert(step.to_string(), snapshot.clone());
        self.store
            .update(&answers_path(user_id), Value::Object(update))
            .await
            .map_err(store_error)?;
        Ok(())
    }

    /// Runs a registry entry with its transition. Returns whether the handler was invoked.
    pub async fn invoke(&self, route: &RouteKey, spec: &HandlerSpec, message: &Message) -> Result<bool> {
        match spec {
            HandlerSpec::Plain {
                step,
                handler,
                transition,
            } => match transition {
                Transition::None => {
                    handler.handle(message).await?;
                    Ok(true)
                }
                Transition::Enter => {
                    self.enter(step, route.clone(), handler.as_ref(), message)
                        .await?;
                    Ok(true)
                }
                Transition::Return => self.go_back(handler.as_ref(), message).await,
            },
            HandlerSpec::Stateful {
                step,
                handler,
                filter,
            } => {
                self.advance(step, route.clone(), filter, handler.as_ref(), message)
                    .await
            }
        }
    }

    /// Starts a fresh conversation at `step`. The whole user document is replaced in one write,
    /// which also clears answers from any earlier conversation.
    #[instrument(skip(self, handler, message), fields(user_id = message.user.id))]
    pub async fn enter(
        &self,
        step: &str,
        route: RouteKey,
        handler: &dyn Handler,
        message: &Message,
    ) -> Result<()> {
        let conversation = ConversationState::start(StackFrame::new(step, message, route));
        let mut users = Map::new();
        users.insert(
            message.user.id.to_string(),
            serde_json::to_value(&conversation)?,
        );
        self.store
            .update(USERS_ROOT, Value::Object(users))
            .await
            .map_err(store_error)?;
        info!(user_id = message.user.id, step = %step, "step: conversation entered");
        handler.handle(message).await
    }

    /// Moves the user forward to `step` if the current step passes `filter`.
    #[instrument(skip(self, handler, message), fields(user_id = message.user.id))]
    pub async fn advance(
        &self,
        step: &str,
        route: RouteKey,
        filter: &StateFilter,
        handler: &dyn StepHandler,
        message: &Message,
    ) -> Result<bool> {
        let user_id = message.user.id;
        let Some(mut conversation) = self.load(user_id).await? else {
            debug!(user_id, step = %step, "Unknown user, advance skipped");
            return Ok(false);
        };
        if !filter.matches(conversation.current_step()) {
            debug!(
                user_id,
                step = %step,
                current = %conversation.current_step(),
                "State filter mismatch, advance skipped"
            );
            return Ok(false);
        }

        let from = conversation.current_step().to_string();
        conversation.advance(StackFrame::new(step, message, route));
        self.save(user_id, &conversation).await?;
        self.record_answer(user_id, step, &message.raw).await?;
        info!(
            user_id,
            from = %from,
            step = %step,
            depth = conversation.depth(),
            "step: conversation advanced"
        );

        let answers = self.answers(user_id).await?;
        handler.handle(message, &answers).await?;
        Ok(true)
    }

    /// Steps back one frame and replays the step returned to. At the root `handler` runs instead.
    #[instrument(skip(self, handler, message), fields(user_id = message.user.id))]
    pub async fn go_back(&self, handler: &dyn Handler, message: &Message) -> Result<bool> {
        let user_id = message.user.id;
        let Some(mut conversation) = self.load(user_id).await? else {
            debug!(user_id, "Unknown user, return skipped");
            return Ok(false);
        };
        let Some(rewind) = conversation.rewind() else {
            debug!(user_id, step = %conversation.current_step(), "At root, running base handler");
            handler.handle(message).await?;
            return Ok(true);
        };

        let Some((route, spec)) = self.registry.resolve_frame(&rewind.top) else {
            warn!(
                user_id,
                step = %rewind.top.step,
                route = ?rewind.top.route,
                "No handler for previous step, return skipped"
            );
            return Ok(false);
        };
        let replayed = rewind.top.message()?;

        self.save(user_id, &conversation).await?;
        info!(
            user_id,
            step = %rewind.top.step,
            below = ?rewind.answer.as_ref().map(|f| f.step.as_str()),
            route = ?route,
            depth = conversation.depth(),
            "step: conversation returned"
        );

        match spec {
            HandlerSpec::Stateful {
                handler: step_handler,
                ..
            } => {
                self.record_answer(user_id, &rewind.top.step, &rewind.top.snapshot)
                    .await?;
                let answers = self.answers(user_id).await?;
                step_handler.handle(&replayed, &answers).await?;
            }
            HandlerSpec::Plain {
                handler: step_handler,
                ..
            } => {
                step_handler.handle(&replayed).await?;
            }
        }
        Ok(true)
    }
}
