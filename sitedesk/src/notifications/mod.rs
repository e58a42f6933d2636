//! Per-user notification feed.
//!
//! The center loads the user's notifications once, then keeps a listener task
//! attached to the inbound event channel. Pushed events go to the front of the
//! list, unlike the entity containers which append.

use futures_util::StreamExt as _;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::gateway::GatewayError;
use crate::models::{EntityId, Notification, NotificationDraft};
use crate::services::NotificationService;
use crate::store::StoreError;

pub mod listener;

pub use listener::{EventSource, EventStream, WebSocketEventSource};

const LOAD_FAILED: &str = "알림을 불러오는데 실패했습니다";
const MARK_READ_FAILED: &str = "알림 상태 업데이트에 실패했습니다";
const CREATE_FAILED: &str = "알림 생성에 실패했습니다";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationState {
    /// User whose feed is open
    pub user_id: Option<EntityId>,
    /// Most recent first
    pub items: Vec<Notification>,
    pub connected: bool,
    pub in_flight: usize,
    pub error: Option<StoreError>,
}

impl NotificationState {
    pub fn loading(&self) -> bool {
        self.in_flight > 0
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|item| !item.is_read).count()
    }
}

#[derive(Clone)]
pub struct NotificationCenter {
    service: NotificationService,
    source: Arc<dyn EventSource>,
    state: Arc<watch::Sender<NotificationState>>,
    listener: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl NotificationCenter {
    pub fn new(service: NotificationService, source: Arc<dyn EventSource>) -> Self {
        let (state, _) = watch::channel(NotificationState::default());
        Self {
            service,
            source,
            state: Arc::new(state),
            listener: Arc::new(Mutex::new(None)),
        }
    }

    /// Switches the feed to `user_id`: loads the stored notifications and
    /// attaches a listener, replacing any previous one. Returns whether the
    /// initial load succeeded.
    #[tracing::instrument(skip(self))]
    pub async fn open(&self, user_id: EntityId) -> bool {
        self.close();
        self.state.send_modify(|state| {
            state.user_id = Some(user_id);
            state.items.clear();
            state.in_flight += 1;
            state.error = None;
        });
        self.listen(user_id);

        let result = self.service.list_for_user(user_id).await;
        let mut loaded = false;
        self.state.send_modify(|state| {
            state.in_flight = state.in_flight.saturating_sub(1);
            if state.user_id != Some(user_id) {
                return;
            }
            match result {
                Ok(mut items) => {
                    // Events pushed while loading stay in front.
                    items.retain(|item| !state.items.iter().any(|pushed| pushed.id == item.id));
                    state.items.extend(items);
                    loaded = true;
                }
                Err(error) => state.error = Some(StoreError::new(&error, LOAD_FAILED)),
            }
        });
        loaded
    }

    /// Detaches the listener. The loaded items are kept.
    pub fn close(&self) {
        if let Some(handle) = self.lock_listener().take() {
            handle.abort();
            tracing::debug!("notification listener stopped");
        }
        self.state.send_modify(|state| state.connected = false);
    }

    /// Adds a pushed event to the front of the feed.
    pub fn receive(&self, notification: Notification) {
        deliver(&self.state, notification);
    }

    /// Persists the read flag, then flips it locally on success only.
    #[tracing::instrument(skip(self))]
    pub async fn mark_read(&self, id: EntityId) -> bool {
        self.begin();
        let result = self.service.mark_read(id).await;
        self.finish(result, MARK_READ_FAILED, |state, ()| {
            if let Some(item) = state.items.iter_mut().find(|item| item.id == id) {
                item.is_read = true;
            }
        })
        .is_some()
    }

    pub async fn create(&self, draft: &NotificationDraft) -> Option<Notification> {
        self.begin();
        let result = self.service.create(draft).await;
        self.finish(result, CREATE_FAILED, |state, created: Notification| {
            if state.user_id == Some(created.user_id) {
                prepend(state, created);
            }
        })
    }

    pub fn unread_count(&self) -> usize {
        self.state.borrow().unread_count()
    }

    pub fn dismiss_error(&self) {
        self.state.send_modify(|state| state.error = None);
    }

    pub fn state(&self) -> NotificationState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<NotificationState> {
        self.state.subscribe()
    }

    fn listen(&self, user_id: EntityId) {
        let source = self.source.clone();
        let state = self.state.clone();
        let handle = tokio::spawn(async move {
            let mut events = match source.connect(user_id).await {
                Ok(events) => events,
                Err(error) => {
                    tracing::warn!(user_id, %error, "cannot open event channel");
                    return;
                }
            };
            state.send_modify(|state| state.connected = true);
            while let Some(event) = events.next().await {
                match event {
                    Ok(notification) => deliver(&state, notification),
                    Err(error) => {
                        tracing::warn!(user_id, %error, "event channel failed");
                        break;
                    }
                }
            }
            tracing::info!(user_id, "event channel closed");
            state.send_modify(|state| state.connected = false);
        });
        if let Some(previous) = self.lock_listener().replace(handle) {
            previous.abort();
        }
    }

    fn begin(&self) {
        self.state.send_modify(|state| {
            state.in_flight += 1;
            state.error = None;
        });
    }

    fn finish<T: Clone>(
        &self,
        result: Result<T, GatewayError>,
        failure: &'static str,
        apply: impl FnOnce(&mut NotificationState, T),
    ) -> Option<T> {
        let mut outcome = None;
        self.state.send_modify(|state| {
            state.in_flight = state.in_flight.saturating_sub(1);
            match result {
                Ok(value) => {
                    outcome = Some(value.clone());
                    apply(state, value);
                }
                Err(error) => {
                    tracing::warn!(%error, failure, "notification action failed");
                    state.error = Some(StoreError::new(&error, failure));
                }
            }
        });
        outcome
    }

    fn lock_listener(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.listener.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn deliver(state: &watch::Sender<NotificationState>, notification: Notification) {
    state.send_if_modified(|state| {
        if state.user_id != Some(notification.user_id) {
            tracing::debug!(
                user_id = notification.user_id,
                "ignoring event for another user"
            );
            return false;
        }
        prepend(state, notification)
    });
}

/// Inserts at the front unless the feed already holds that id.
fn prepend(state: &mut NotificationState, notification: Notification) -> bool {
    if state.items.iter().any(|item| item.id == notification.id) {
        return false;
    }
    state.items.insert(0, notification);
    true
}
