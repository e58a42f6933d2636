//! Records exchanged with the backend.
//!
//! Each enumeration has one canonical wire form. Legacy spellings still sent
//! by older backends are accepted through serde aliases, and Korean labels are
//! produced only at the presentation edge via `label()`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::fmt::Debug;

pub mod notification;
pub mod project;
pub mod task;
pub mod user;

pub use notification::{Notification, NotificationDraft, NotificationKind};
pub use project::{Project, ProjectForm, ProjectPatch, ProjectStatus};
pub use task::{Task, TaskFilter, TaskForm, TaskPatch, TaskPriority, TaskStatus};
pub use user::{LoginForm, LoginResponse, RegisterForm, User, UserForm, UserRole};

/// Backend-assigned identifier.
pub type EntityId = i64;

/// A record with a stable identity, held by the state containers.
pub trait Entity: Clone + Debug + DeserializeOwned + Send + Sync + 'static {
    fn id(&self) -> EntityId;

    /// Name used for substring search.
    fn display_name(&self) -> &str;
}

/// Payloads that can be checked before they are sent.
pub trait Validate {
    fn validate(&self) -> Result<(), crate::gateway::GatewayError>;
}

/// Reads an explicit `null` the same way as a missing key.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
