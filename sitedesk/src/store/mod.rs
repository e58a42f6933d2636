//! Reducer-backed state containers, one per entity.
//!
//! A container never mutates local state before the backend confirms the
//! action. Every remote action dispatches [`Action::Begin`] and then exactly
//! one completion action, so `in_flight` always returns to zero once all
//! outstanding calls resolve. Errors are caught at the action boundary and
//! stored as a static message; they never escape to the caller.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

use crate::gateway::{FailureKind, GatewayError};
use crate::models::{Entity, EntityId, Project, Task};
use crate::services::{CrudService, Resource};

pub mod user;

pub use user::{UserState, UserStore};

/// Failure recorded by a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    pub kind: FailureKind,
    /// Human readable text shown to the user
    pub message: String,
}

impl StoreError {
    pub fn new(error: &GatewayError, message: &str) -> Self {
        Self {
            kind: error.kind(),
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreState<E> {
    pub items: Vec<E>,
    pub selected: Option<E>,
    /// Number of remote actions still awaiting a response
    pub in_flight: usize,
    pub error: Option<StoreError>,
}

impl<E> Default for StoreState<E> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            selected: None,
            in_flight: 0,
            error: None,
        }
    }
}

impl<E: Entity> StoreState<E> {
    pub fn loading(&self) -> bool {
        self.in_flight > 0
    }

    /// Items whose name contains `term`, ignoring case. An empty term matches everything.
    pub fn matching(&self, term: &str) -> Vec<&E> {
        let term = term.to_lowercase();
        self.items
            .iter()
            .filter(|item| item.display_name().to_lowercase().contains(&term))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action<E> {
    Begin,
    ListLoaded(Vec<E>),
    OneLoaded(E),
    Added(E),
    Replaced(E),
    Removed(EntityId),
    Failed(StoreError),
    /// A response arrived too late to be applied
    Discarded,
    Select(Option<E>),
    DismissError,
}

pub fn reduce<E: Entity>(state: &mut StoreState<E>, action: Action<E>) {
    match action {
        Action::Begin => {
            state.in_flight += 1;
            state.error = None;
        }
        Action::ListLoaded(items) => {
            state.items = items;
            settle(state);
        }
        Action::OneLoaded(item) => {
            state.selected = Some(item);
            settle(state);
        }
        Action::Added(item) => {
            state.items.push(item);
            settle(state);
        }
        Action::Replaced(item) => {
            let id = item.id();
            if state.selected.as_ref().is_some_and(|selected| selected.id() == id) {
                state.selected = Some(item.clone());
            }
            if let Some(slot) = state.items.iter_mut().find(|existing| existing.id() == id) {
                *slot = item;
            }
            settle(state);
        }
        Action::Removed(id) => {
            state.items.retain(|item| item.id() != id);
            if state.selected.as_ref().is_some_and(|selected| selected.id() == id) {
                state.selected = None;
            }
            settle(state);
        }
        Action::Failed(error) => {
            state.error = Some(error);
            settle(state);
        }
        Action::Discarded => settle(state),
        Action::Select(item) => state.selected = item,
        Action::DismissError => state.error = None,
    }
}

fn settle<E>(state: &mut StoreState<E>) {
    state.in_flight = state.in_flight.saturating_sub(1);
}

/// What to do with a successful response that was overtaken by a later request
/// for the same target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StalePolicy {
    /// Keep the result of the request issued last
    #[default]
    Discard,
    /// Keep whichever response resolved last
    Apply,
}

/// The piece of state a request competes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Slot {
    List,
    Selected,
    Entity(EntityId),
}

#[derive(Debug, Clone, Copy)]
struct Ticket {
    epoch: u64,
    seq: u64,
    slot: Option<Slot>,
}

#[derive(Debug, Default)]
struct Sequencer {
    epoch: u64,
    next: u64,
    applied: HashMap<Slot, u64>,
    /// Deleted ids, keyed to the ticket of the confirming delete
    removed: HashMap<EntityId, u64>,
}

impl Sequencer {
    fn issue(&mut self, slot: Option<Slot>) -> Ticket {
        self.next += 1;
        Ticket {
            epoch: self.epoch,
            seq: self.next,
            slot,
        }
    }

    /// Returns the action to apply for a successful response, or `None` when
    /// the response must not touch the state.
    ///
    /// A confirmed delete always applies. Afterwards the id can only come back
    /// through a list requested after that delete.
    fn admit<E: Entity>(
        &mut self,
        ticket: &Ticket,
        policy: StalePolicy,
        action: Action<E>,
    ) -> Option<Action<E>> {
        if let Action::Removed(id) = action {
            self.applied.remove(&Slot::Entity(id));
            let seq = self.removed.entry(id).or_default();
            *seq = (*seq).max(ticket.seq);
            return Some(Action::Removed(id));
        }
        if let Action::Replaced(item) | Action::OneLoaded(item) = &action
            && self.removed.contains_key(&item.id())
        {
            return None;
        }
        if let Some(slot) = ticket.slot {
            let last = self.applied.entry(slot).or_default();
            if policy == StalePolicy::Discard && ticket.seq < *last {
                return None;
            }
            *last = (*last).max(ticket.seq);
        }
        match action {
            Action::ListLoaded(mut items) => {
                self.removed.retain(|_, deleted| *deleted > ticket.seq);
                items.retain(|item| !self.removed.contains_key(&item.id()));
                Some(Action::ListLoaded(items))
            }
            other => Some(other),
        }
    }
}

struct Inner<R> {
    service: CrudService<R>,
    policy: StalePolicy,
    sequencer: Mutex<Sequencer>,
    state: watch::Sender<StoreState<R>>,
}

/// Container for one entity kind, shared by cloning.
pub struct EntityStore<R> {
    inner: Arc<Inner<R>>,
}

impl<R> Clone for EntityStore<R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

pub type ProjectStore = EntityStore<Project>;
pub type TaskStore = EntityStore<Task>;

impl<R: Resource> EntityStore<R> {
    pub fn new(service: CrudService<R>, policy: StalePolicy) -> Self {
        let (state, _) = watch::channel(StoreState::default());
        Self {
            inner: Arc::new(Inner {
                service,
                policy,
                sequencer: Mutex::new(Sequencer::default()),
                state,
            }),
        }
    }

    /// Replaces `items` with the backend's list. Returns whether it succeeded.
    pub async fn fetch_all(&self, filter: &R::Filter) -> bool {
        let ticket = self.begin(Some(Slot::List));
        let result = self.inner.service.list(filter).await;
        self.complete(ticket, result, R::MESSAGES.fetch_all, Action::ListLoaded)
            .is_some()
    }

    /// Loads one entity into `selected`.
    pub async fn fetch_one(&self, id: EntityId) -> bool {
        let ticket = self.begin(Some(Slot::Selected));
        let result = self.inner.service.get(id).await;
        self.complete(ticket, result, R::MESSAGES.fetch_one, Action::OneLoaded)
            .is_some()
    }

    pub async fn create(&self, form: &R::Form) -> Option<R> {
        let ticket = self.begin(None);
        let result = self.inner.service.create(form).await;
        self.complete(ticket, result, R::MESSAGES.create, Action::Added)
    }

    pub async fn update(&self, id: EntityId, patch: &R::Patch) -> Option<R> {
        let ticket = self.begin(Some(Slot::Entity(id)));
        let result = self.inner.service.update(id, patch).await;
        self.complete(ticket, result, R::MESSAGES.update, Action::Replaced)
    }

    pub async fn delete(&self, id: EntityId) -> bool {
        let ticket = self.begin(Some(Slot::Entity(id)));
        let result = self.inner.service.delete(id).await;
        self.complete(ticket, result, R::MESSAGES.delete, |_| Action::Removed(id))
            .is_some()
    }

    /// Sets `selected` locally without a backend call.
    pub fn select(&self, item: Option<R>) {
        self.dispatch(Action::Select(item));
    }

    pub fn dismiss_error(&self) {
        self.dispatch(Action::DismissError);
    }

    /// Resets the container; responses to requests issued before the reset are ignored.
    pub fn detach(&self) {
        let mut sequencer = self.lock();
        sequencer.epoch += 1;
        sequencer.applied.clear();
        sequencer.removed.clear();
        self.inner.state.send_replace(StoreState::default());
    }

    pub fn state(&self) -> StoreState<R> {
        self.inner.state.borrow().clone()
    }

    /// Receiver that is marked changed after every dispatched action.
    pub fn subscribe(&self) -> watch::Receiver<StoreState<R>> {
        self.inner.state.subscribe()
    }

    pub fn search(&self, term: &str) -> Vec<R> {
        self.inner
            .state
            .borrow()
            .matching(term)
            .into_iter()
            .cloned()
            .collect()
    }

    fn begin(&self, slot: Option<Slot>) -> Ticket {
        let mut sequencer = self.lock();
        let ticket = sequencer.issue(slot);
        self.dispatch(Action::Begin);
        ticket
    }

    fn complete<T: Clone>(
        &self,
        ticket: Ticket,
        result: Result<T, GatewayError>,
        failure: &'static str,
        on_success: impl FnOnce(T) -> Action<R>,
    ) -> Option<T> {
        let mut sequencer = self.lock();
        if ticket.epoch != sequencer.epoch {
            tracing::debug!(resource = R::PLURAL, "ignoring response after detach");
            return None;
        }
        match result {
            Ok(value) => {
                match sequencer.admit(&ticket, self.inner.policy, on_success(value.clone())) {
                    Some(action) => self.dispatch(action),
                    None => {
                        tracing::debug!(resource = R::PLURAL, seq = ticket.seq, "discarding stale response");
                        self.dispatch(Action::Discarded);
                    }
                }
                Some(value)
            }
            Err(error) => {
                tracing::warn!(resource = R::PLURAL, %error, failure, "action failed");
                self.dispatch(Action::Failed(StoreError::new(&error, failure)));
                None
            }
        }
    }

    fn dispatch(&self, action: Action<R>) {
        self.inner.state.send_modify(|state| reduce(state, action));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Sequencer> {
        self.inner
            .sequencer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
