//! `ActiveContextGuard` implementation

use std::future::Future;

use parking_lot::Mutex;

use crate::error::Result;
use crate::types::identifiers::ContextId;
use crate::types::messages::Message;

/// Dispatch-time stamp of the active context
///
/// Two tokens match only if both the context id and the switch generation are
/// equal, so switching `A → B → A` still invalidates work started under the
/// first `A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextToken {
    id: ContextId,
    generation: u64,
}

impl ContextToken {
    /// Context the operation was issued for
    #[must_use]
    pub const fn id(&self) -> ContextId {
        self.id
    }

    /// Switch generation observed at dispatch
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

/// Outcome of a guarded operation
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Guarded<T> {
    /// The context was still active; the result was applied
    Applied(T),
    /// The context changed while the operation ran; the result was dropped
    Stale,
}

impl<T> Guarded<T> {
    /// Whether the result was dropped
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::Stale)
    }

    /// The applied value, if any
    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(value) => Some(value),
            Self::Stale => None,
        }
    }
}

#[derive(Debug, Default)]
struct ContextState {
    active: Option<ContextId>,
    generation: u64,
    messages: Vec<Message>,
}

impl ContextState {
    fn is_current(&self, token: ContextToken) -> bool {
        self.active == Some(token.id) && self.generation == token.generation
    }
}

/// Tracks the active conversation and its cached messages
///
/// All reads and writes happen under one short lock that is never held
/// across an `.await`; check-and-apply is a single critical section, so a
/// switch cannot land between the staleness check and the write.
#[derive(Debug, Default)]
pub struct ActiveContextGuard {
    state: Mutex<ContextState>,
}

impl ActiveContextGuard {
    /// Create a guard with no active context
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently active context
    pub fn active(&self) -> Option<ContextId> {
        self.state.lock().active
    }

    /// Number of switches so far
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Snapshot of the cached messages for the active context
    pub fn messages(&self) -> Vec<Message> {
        self.state.lock().messages.clone()
    }

    /// Make `id` the active context and drop the cached messages
    ///
    /// Every switch starts a new generation, including re-selecting the
    /// context that is already active.
    pub fn switch_to(&self, id: ContextId) -> ContextToken {
        let mut state = self.state.lock();
        state.active = Some(id);
        state.generation += 1;
        state.messages.clear();
        log::debug!("Active context -> {id} (generation {})", state.generation);
        ContextToken {
            id,
            generation: state.generation,
        }
    }

    /// Leave no context active and drop the cached messages
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.active = None;
        state.generation += 1;
        state.messages.clear();
        log::debug!("Active context cleared (generation {})", state.generation);
    }

    /// Stamp an operation for `id` with the current generation
    pub fn capture(&self, id: ContextId) -> ContextToken {
        ContextToken {
            id,
            generation: self.state.lock().generation,
        }
    }

    /// Whether results stamped with `token` may still be applied
    pub fn is_current(&self, token: ContextToken) -> bool {
        self.state.lock().is_current(token)
    }

    /// Run `apply` against the cached messages if `token` is still current
    pub fn apply<R>(&self, token: ContextToken, apply: impl FnOnce(&mut Vec<Message>) -> R) -> Guarded<R> {
        let mut state = self.state.lock();
        if !state.is_current(token) {
            log::debug!(
                "Dropping stale result for context {} (generation {}, now {:?}/{})",
                token.id,
                token.generation,
                state.active,
                state.generation
            );
            return Guarded::Stale;
        }
        Guarded::Applied(apply(&mut state.messages))
    }

    /// Await `op` for context `id` and return its result only if `id` is
    /// still the active context afterwards
    ///
    /// A stale outcome swallows errors too: failures of work the user has
    /// navigated away from never surface.
    ///
    /// # Errors
    /// Returns the error of `op` when the context is still current
    pub async fn with_context<T, F>(&self, id: ContextId, op: F) -> Result<Guarded<T>>
    where
        F: Future<Output = Result<T>>,
    {
        self.with_context_apply(id, op, |_, value| value).await
    }

    /// Like [`with_context`](Self::with_context), and on success also write
    /// the value into the cached messages in the same critical section as
    /// the staleness check
    ///
    /// # Errors
    /// Returns the error of `op` when the context is still current
    pub async fn with_context_apply<T, R, F>(
        &self,
        id: ContextId,
        op: F,
        apply: impl FnOnce(&mut Vec<Message>, T) -> R,
    ) -> Result<Guarded<R>>
    where
        F: Future<Output = Result<T>>,
    {
        let token = self.capture(id);
        self.run(token, op, apply).await
    }

    /// Await `op` under an already captured token
    ///
    /// # Errors
    /// Returns the error of `op` when the context is still current
    pub async fn run<T, R, F>(
        &self,
        token: ContextToken,
        op: F,
        apply: impl FnOnce(&mut Vec<Message>, T) -> R,
    ) -> Result<Guarded<R>>
    where
        F: Future<Output = Result<T>>,
    {
        match op.await {
            Ok(value) => Ok(self.apply(token, |messages| apply(messages, value))),
            Err(err) => {
                if self.is_current(token) {
                    Err(err)
                } else {
                    log::debug!("Suppressing error from stale context {}: {err}", token.id);
                    Ok(Guarded::Stale)
                }
            }
        }
    }
}
