//! # dispatcher
//!
//! Routes each inbound [`dbot_core::Message`] to its handlers and keeps per-user conversation state.
//!
//! - [`registry`]: command, text and fallback tables built once at setup.
//! - [`state`]: persisted stack frames and the push-down transitions.
//! - [`state_machine`]: enter / advance / return on top of a [`storage::DocumentStore`].
//! - [`dispatcher`]: command, then text, then every fallback; per-user serialization and middleware.

pub mod dispatcher;
pub mod middleware;
pub mod registry;
pub mod state;
pub mod state_machine;

pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use middleware::{LoggingMiddleware, Middleware};
pub use registry::{
    BotCommand, HandlerSpec, Registry, RegistryBuilder, RouteKey, StateFilter, Transition,
};
pub use state::{answers_path, user_path, ConversationState, StackFrame};
pub use state_machine::StateMachine;
