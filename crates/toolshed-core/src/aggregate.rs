//! Immutable state paired with the events that produced it but have not been
//! persisted yet.
//!
//! Every entity mutation takes an `Aggregate` by reference and returns a new one;
//! the prior value is never touched. Persistence collaborators read
//! [`Aggregate::uncommitted_events`], store them in order, then call
//! [`Aggregate::mark_committed`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate<S, E> {
    state: S,
    uncommitted_events: Vec<E>,
}

impl<S, E> Aggregate<S, E> {
    #[must_use]
    pub fn create(state: S, events: Vec<E>) -> Self {
        Self {
            state,
            uncommitted_events: events,
        }
    }

    /// Rehydrates a persisted state with no pending events.
    #[must_use]
    pub fn from_committed(state: S) -> Self {
        Self::create(state, Vec::new())
    }

    #[must_use]
    pub fn state(&self) -> &S {
        &self.state
    }

    #[must_use]
    pub fn uncommitted_events(&self) -> &[E] {
        &self.uncommitted_events
    }

    #[must_use]
    pub fn into_parts(self) -> (S, Vec<E>) {
        (self.state, self.uncommitted_events)
    }
}

impl<S: Clone, E: Clone> Aggregate<S, E> {
    /// Same state, empty event list.
    #[must_use]
    pub fn mark_committed(&self) -> Self {
        Self::from_committed(self.state.clone())
    }

    /// New aggregate holding `state` with `event` appended after the pending ones.
    #[must_use]
    pub fn advance(&self, state: S, event: E) -> Self {
        let mut uncommitted_events = self.uncommitted_events.clone();
        uncommitted_events.push(event);
        Self {
            state,
            uncommitted_events,
        }
    }

    /// New aggregate with a replaced state and the same pending events.
    #[must_use]
    pub fn with_state(&self, state: S) -> Self {
        Self {
            state,
            uncommitted_events: self.uncommitted_events.clone(),
        }
    }
}
