//! Per-message dispatch: exact command, then exact text, then every fallback.
//!
//! Messages from the same user are serialized by a per-user async mutex so two messages of one batch
//! cannot interleave their state reads and writes. Messages from different users run in parallel.
//! Within one message, fallbacks that touch the conversation run in sequence.

use std::sync::Arc;

use dashmap::DashMap;
use dbot_core::{Message, Result};
use futures::future::{join, join_all};
use storage::DocumentStore;
use tokio::sync::Mutex;
use tracing::{error, info, instrument};

use crate::middleware::Middleware;
use crate::registry::{Registry, RouteKey};
use crate::state_machine::StateMachine;

/// What happened to one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A command or text entry matched and its handler ran.
    Handled(RouteKey),
    /// A command or text entry matched but the conversation state kept its handler from running.
    Gated(RouteKey),
    /// Nothing matched; the fallbacks whose handlers ran.
    Fallbacks(Vec<RouteKey>),
    /// A middleware stopped dispatch.
    Stopped,
}

pub struct Dispatcher {
    registry: Arc<Registry>,
    machine: StateMachine,
    middleware: Vec<Arc<dyn Middleware>>,
    user_locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl Dispatcher {
    pub fn new(registry: Registry, store: Arc<dyn DocumentStore>) -> Self {
        let registry = Arc::new(registry);
        Self {
            machine: StateMachine::new(store, registry.clone()),
            registry,
            middleware: Vec::new(),
            user_locks: DashMap::new(),
        }
    }

    /// Appends a middleware (before in order, after in reverse).
    pub fn add_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn state_machine(&self) -> &StateMachine {
        &self.machine
    }

    fn user_lock(&self, user_id: i64) -> Arc<Mutex<()>> {
        Arc::clone(&self.user_locks.entry(user_id).or_default())
    }

    /// Dispatches one message while holding the sender's lock.
    #[instrument(skip(self, message), fields(user_id = message.user.id, message_id = message.id))]
    pub async fn dispatch(&self, message: &Message) -> Result<DispatchOutcome> {
        let user_id = message.user.id;
        let lock = self.user_lock(user_id);
        let outcome = {
            let _guard = lock.lock().await;
            self.dispatch_locked(message).await
        };
        drop(lock);
        self.user_locks
            .remove_if(&user_id, |_, lock| Arc::strong_count(lock) == 1);
        outcome
    }

    async fn dispatch_locked(&self, message: &Message) -> Result<DispatchOutcome> {
        for mw in &self.middleware {
            if !mw.before(message).await? {
                info!(
                    user_id = message.user.id,
                    "step: middleware before returned false, dispatch stopped"
                );
                return Ok(DispatchOutcome::Stopped);
            }
        }

        let outcome = self.route(message).await?;

        for mw in self.middleware.iter().rev() {
            mw.after(message, &outcome).await?;
        }
        Ok(outcome)
    }

    async fn route(&self, message: &Message) -> Result<DispatchOutcome> {
        if let Some((route, spec)) = message.text().and_then(|text| self.registry.lookup(text)) {
            let invoked = self.machine.invoke(&route, spec, message).await?;
            info!(
                user_id = message.user.id,
                route = ?route,
                step = %spec.step(),
                invoked,
                "step: routed"
            );
            return Ok(if invoked {
                DispatchOutcome::Handled(route)
            } else {
                DispatchOutcome::Gated(route)
            });
        }

        let fallbacks: Vec<_> = self.registry.fallbacks().collect();
        let (stateful, stateless): (Vec<_>, Vec<_>) = (0..fallbacks.len())
            .partition(|&i| fallbacks[i].1.touches_state());

        // State-aware fallbacks transition one at a time in step-name order, each seeing the
        // previous one's write. Plain fallbacks run concurrently alongside them.
        let chained = async {
            let mut results = Vec::with_capacity(stateful.len());
            for &i in &stateful {
                let (route, spec) = &fallbacks[i];
                results.push(self.machine.invoke(route, spec, message).await);
            }
            results
        };
        let concurrent = join_all(stateless.iter().map(|&i| {
            let (route, spec) = &fallbacks[i];
            self.machine.invoke(route, spec, message)
        }));
        let (chained, concurrent) = join(chained, concurrent).await;

        let mut results: Vec<(usize, Result<bool>)> = stateful
            .into_iter()
            .zip(chained)
            .chain(stateless.into_iter().zip(concurrent))
            .collect();
        results.sort_by_key(|(i, _)| *i);

        let mut invoked = Vec::new();
        let mut first_error = None;
        for ((route, _), (_, result)) in fallbacks.into_iter().zip(results) {
            match result {
                Ok(true) => invoked.push(route),
                Ok(false) => {}
                Err(e) => {
                    error!(user_id = message.user.id, route = ?route, error = %e, "Fallback handler failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        info!(
            user_id = message.user.id,
            fallbacks = invoked.len(),
            "step: fallbacks done"
        );
        Ok(DispatchOutcome::Fallbacks(invoked))
    }
}
