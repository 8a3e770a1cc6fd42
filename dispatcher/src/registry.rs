//! Routing tables built once at setup: exact command triggers, exact text triggers and fallback handlers.
//!
//! [`RegistryBuilder`] collects entries; [`RegistryBuilder::build`] returns an immutable [`Registry`]
//! that the dispatcher only reads.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use dbot_core::{DbotError, Handler, Result, StepHandler};
use serde::{Deserialize, Serialize};

use crate::state::StackFrame;

/// Key of one registry entry. Stored in every stack frame so a step can be replayed through the
/// same entry after a restart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum RouteKey {
    Command(String),
    Text(String),
    Fallback(String),
}

/// Steps in which a stateful handler may run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateFilter {
    One(String),
    AnyOf(Vec<String>),
}

impl StateFilter {
    pub fn any_of<I, S>(steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StateFilter::AnyOf(steps.into_iter().map(Into::into).collect())
    }

    pub fn matches(&self, step: &str) -> bool {
        match self {
            StateFilter::One(expected) => expected == step,
            StateFilter::AnyOf(expected) => expected.iter().any(|s| s == step),
        }
    }
}

impl From<&str> for StateFilter {
    fn from(step: &str) -> Self {
        StateFilter::One(step.to_string())
    }
}

impl From<String> for StateFilter {
    fn from(step: String) -> Self {
        StateFilter::One(step)
    }
}

impl From<Vec<&str>> for StateFilter {
    fn from(steps: Vec<&str>) -> Self {
        StateFilter::any_of(steps)
    }
}

impl From<Vec<String>> for StateFilter {
    fn from(steps: Vec<String>) -> Self {
        StateFilter::AnyOf(steps)
    }
}

/// What a message-only handler does to the conversation before it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Runs the handler, conversation untouched.
    None,
    /// Starts a fresh conversation at this step.
    Enter,
    /// Steps back to the previous frame; runs this handler only when there is nothing to return to.
    Return,
}

/// One registry entry.
#[derive(Clone)]
pub enum HandlerSpec {
    Plain {
        step: String,
        handler: Arc<dyn Handler>,
        transition: Transition,
    },
    Stateful {
        step: String,
        handler: Arc<dyn StepHandler>,
        filter: StateFilter,
    },
}

impl HandlerSpec {
    /// Plain handler, no conversation side effects.
    pub fn plain(step: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        HandlerSpec::Plain {
            step: step.into(),
            handler,
            transition: Transition::None,
        }
    }

    /// Entry step: resets the user's conversation to this step.
    pub fn enter(step: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        HandlerSpec::Plain {
            step: step.into(),
            handler,
            transition: Transition::Enter,
        }
    }

    /// Back step: replays the previous step, or runs `handler` at the root.
    pub fn back(step: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        HandlerSpec::Plain {
            step: step.into(),
            handler,
            transition: Transition::Return,
        }
    }

    /// Mid-flow step, allowed only while the user's current step matches `filter`.
    pub fn advance(
        step: impl Into<String>,
        filter: impl Into<StateFilter>,
        handler: Arc<dyn StepHandler>,
    ) -> Self {
        HandlerSpec::Stateful {
            step: step.into(),
            handler,
            filter: filter.into(),
        }
    }

    pub fn step(&self) -> &str {
        match self {
            HandlerSpec::Plain { step, .. } | HandlerSpec::Stateful { step, .. } => step,
        }
    }

    /// Whether running this entry reads or writes the user's conversation.
    pub fn touches_state(&self) -> bool {
        !matches!(
            self,
            HandlerSpec::Plain {
                transition: Transition::None,
                ..
            }
        )
    }

    pub fn filter(&self) -> Option<&StateFilter> {
        match self {
            HandlerSpec::Plain { .. } => None,
            HandlerSpec::Stateful { filter, .. } => Some(filter),
        }
    }
}

impl fmt::Debug for HandlerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerSpec::Plain {
                step, transition, ..
            } => f
                .debug_struct("Plain")
                .field("step", step)
                .field("transition", transition)
                .finish(),
            HandlerSpec::Stateful { step, filter, .. } => f
                .debug_struct("Stateful")
                .field("step", step)
                .field("filter", filter)
                .finish(),
        }
    }
}

/// Command entry published to the platform's command list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotCommand {
    pub command: String,
    pub description: String,
}

#[derive(Default)]
pub struct RegistryBuilder {
    commands: HashMap<String, HandlerSpec>,
    texts: HashMap<String, HandlerSpec>,
    fallbacks: BTreeMap<String, HandlerSpec>,
    published: Vec<BotCommand>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `spec` under `/<name lowercased>`. A leading slash in `name` is ignored.
    pub fn command(
        mut self,
        name: &str,
        description: impl Into<String>,
        spec: HandlerSpec,
    ) -> Result<Self> {
        let name = name.trim().trim_start_matches('/');
        if name.is_empty() {
            return Err(DbotError::Registry("command name must not be empty".to_string()));
        }
        let command = BotCommand {
            command: name.to_string(),
            description: description.into(),
        };
        match self
            .published
            .iter_mut()
            .find(|c| c.command.eq_ignore_ascii_case(name))
        {
            Some(existing) => *existing = command,
            None => self.published.push(command),
        }
        self.commands
            .insert(format!("/{}", name.to_lowercase()), spec);
        Ok(self)
    }

    /// Registers `spec` under each literal trigger text.
    pub fn text<I, S>(mut self, triggers: I, spec: HandlerSpec) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let triggers: Vec<String> = triggers.into_iter().map(Into::into).collect();
        if triggers.is_empty() || triggers.iter().any(|t| t.is_empty()) {
            return Err(DbotError::Registry("text trigger must not be empty".to_string()));
        }
        for trigger in triggers {
            self.texts.insert(trigger, spec.clone());
        }
        Ok(self)
    }

    /// Registers a fallback, keyed by its step name.
    pub fn fallback(mut self, spec: HandlerSpec) -> Self {
        self.fallbacks.insert(spec.step().to_string(), spec);
        self
    }

    pub fn build(self) -> Registry {
        Registry {
            commands: self.commands,
            texts: self.texts,
            fallbacks: self.fallbacks,
            published: self.published,
        }
    }
}

/// Immutable routing tables.
pub struct Registry {
    commands: HashMap<String, HandlerSpec>,
    texts: HashMap<String, HandlerSpec>,
    fallbacks: BTreeMap<String, HandlerSpec>,
    published: Vec<BotCommand>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Exact command match first, then exact text match.
    pub fn lookup(&self, content: &str) -> Option<(RouteKey, &HandlerSpec)> {
        if let Some(spec) = self.commands.get(content) {
            return Some((RouteKey::Command(content.to_string()), spec));
        }
        self.texts
            .get(content)
            .map(|spec| (RouteKey::Text(content.to_string()), spec))
    }

    pub fn fallbacks(&self) -> impl Iterator<Item = (RouteKey, &HandlerSpec)> {
        self.fallbacks
            .iter()
            .map(|(step, spec)| (RouteKey::Fallback(step.clone()), spec))
    }

    pub fn resolve(&self, route: &RouteKey) -> Option<&HandlerSpec> {
        match route {
            RouteKey::Command(key) => self.commands.get(key),
            RouteKey::Text(key) => self.texts.get(key),
            RouteKey::Fallback(step) => self.fallbacks.get(step),
        }
    }

    /// Handler owning a stack frame: its recorded route, else its trigger content in the
    /// command/text tables, else the fallback registered under its step name.
    pub fn resolve_frame(&self, frame: &StackFrame) -> Option<(RouteKey, &HandlerSpec)> {
        if let Some(spec) = self.resolve(&frame.route) {
            return Some((frame.route.clone(), spec));
        }
        frame
            .content
            .as_deref()
            .and_then(|content| self.lookup(content))
            .or_else(|| {
                self.fallbacks
                    .get(&frame.step)
                    .map(|spec| (RouteKey::Fallback(frame.step.clone()), spec))
            })
    }

    /// Commands to publish with `setMyCommands`, in registration order.
    pub fn commands(&self) -> &[BotCommand] {
        &self.published
    }

    pub fn fallback_count(&self) -> usize {
        self.fallbacks.len()
    }
}
