//! Client session state.
//!
//! The session owns the bearer credential and persists it through a
//! [`CredentialStore`] so it survives restarts. It is constructed explicitly
//! and handed to the gateway, never read from ambient global storage.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;

/// Lifecycle events published by a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn,
    SignedOut,
    /// The backend rejected the credential; the caller should show the login view.
    ReauthenticationRequired,
}

/// Persistence for the bearer credential.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Option<String>;
    /// Persists the token, or removes it when `None`.
    fn save(&self, token: Option<&str>);
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredCredentials {
    token: Option<String>,
}

/// Keeps the credential in a small JSON file.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Option<String> {
        let contents = std::fs::read_to_string(&self.path).ok()?;
        serde_json::from_str::<StoredCredentials>(&contents)
            .ok()
            .and_then(|stored| stored.token)
    }

    fn save(&self, token: Option<&str>) {
        let stored = StoredCredentials {
            token: token.map(str::to_string),
        };
        if let Some(parent) = self.path.parent() {
            if let Err(error) = std::fs::create_dir_all(parent) {
                tracing::warn!(%error, path = %self.path.display(), "cannot create credential directory");
                return;
            }
        }
        let result = serde_json::to_string(&stored)
            .map_err(std::io::Error::other)
            .and_then(|json| std::fs::write(&self.path, json));
        if let Err(error) = result {
            tracing::warn!(%error, path = %self.path.display(), "cannot persist credential");
        }
    }
}

/// Keeps the credential for the lifetime of the process only.
#[derive(Default)]
pub struct MemoryCredentialStore {
    token: RwLock<Option<String>>,
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn save(&self, token: Option<&str>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token.map(str::to_string);
    }
}

pub struct Session {
    token: RwLock<Option<String>>,
    storage: Box<dyn CredentialStore>,
    events: broadcast::Sender<SessionEvent>,
}

impl Session {
    /// Creates a session, restoring any credential the store already holds.
    pub fn new(storage: Box<dyn CredentialStore>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            token: RwLock::new(storage.load()),
            storage,
            events,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryCredentialStore::default()))
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub fn sign_in(&self, token: String) {
        self.storage.save(Some(&token));
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
        self.publish(SessionEvent::SignedIn);
    }

    pub fn sign_out(&self) {
        self.clear();
        self.publish(SessionEvent::SignedOut);
    }

    /// Drops the credential after the backend refused it.
    pub fn expire(&self) {
        self.clear();
        self.publish(SessionEvent::ReauthenticationRequired);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn clear(&self) {
        self.storage.save(None);
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn publish(&self, event: SessionEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }
}
