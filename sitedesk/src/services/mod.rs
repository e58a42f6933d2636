//! Typed wrappers over the [`Gateway`].
//!
//! Services hold no state: each operation builds a [`Command`], invokes it and
//! decodes the result. Failures are logged and handed back to the caller
//! unchanged; a placeholder value is never returned.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::gateway::{Command, Gateway, GatewayError};
use crate::models::{Entity, EntityId, Validate};

pub mod notification;
pub mod project;
pub mod task;
pub mod user;

pub use notification::NotificationService;
pub use project::ProjectService;
pub use task::TaskService;
pub use user::{AuthService, UserService};

/// User-facing failure messages of a state container, one per action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureMessages {
    pub fetch_all: &'static str,
    pub fetch_one: &'static str,
    pub create: &'static str,
    pub update: &'static str,
    pub delete: &'static str,
}

/// Arguments a list filter contributes to the list command.
pub trait ListFilter: Send + Sync {
    fn apply(&self, command: Command) -> Command;
}

/// Listing without any restriction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoFilter;

impl ListFilter for NoFilter {
    fn apply(&self, command: Command) -> Command {
        command
    }
}

/// Binds an entity to its command names and payload types.
///
/// Commands follow `get_<plural>`, `get_<singular>`, `create_<singular>`,
/// `update_<singular>` and `delete_<singular>`; create and update carry the
/// payload under the singular name.
pub trait Resource: Entity {
    const SINGULAR: &'static str;
    const PLURAL: &'static str;
    const MESSAGES: FailureMessages;

    type Form: Serialize + Validate + Send + Sync;
    type Patch: Serialize + Validate + Send + Sync;
    type Filter: ListFilter + Default;
}

pub(crate) fn encode(payload: &impl Serialize) -> Result<Value, GatewayError> {
    serde_json::to_value(payload).map_err(|e| GatewayError::Decode(e.to_string()))
}

/// Validates and encodes a payload. A rejection is logged like a failed call.
pub(crate) fn prepare(payload: &(impl Serialize + Validate)) -> Result<Value, GatewayError> {
    payload
        .validate()
        .and_then(|()| encode(payload))
        .inspect_err(|error| tracing::error!(%error, "payload rejected before sending"))
}

pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> Result<T, GatewayError> {
    serde_json::from_value(value).map_err(|e| GatewayError::Decode(e.to_string()))
}

/// List, get, create, update and delete for one resource.
pub struct CrudService<R> {
    gateway: Arc<dyn Gateway>,
    _resource: PhantomData<fn() -> R>,
}

impl<R> Clone for CrudService<R> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            _resource: PhantomData,
        }
    }
}

impl<R: Resource> CrudService<R> {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            _resource: PhantomData,
        }
    }

    #[tracing::instrument(skip_all, fields(resource = R::PLURAL))]
    pub async fn list(&self, filter: &R::Filter) -> Result<Vec<R>, GatewayError> {
        let command = filter.apply(Command::new(format!("get_{}", R::PLURAL)));
        self.call(command).await
    }

    #[tracing::instrument(skip(self), fields(resource = R::SINGULAR))]
    pub async fn get(&self, id: EntityId) -> Result<R, GatewayError> {
        let command = Command::new(format!("get_{}", R::SINGULAR)).arg("id", id);
        self.call(command).await
    }

    #[tracing::instrument(skip_all, fields(resource = R::SINGULAR))]
    pub async fn create(&self, form: &R::Form) -> Result<R, GatewayError> {
        let command = Command::new(format!("create_{}", R::SINGULAR)).arg(R::SINGULAR, prepare(form)?);
        self.call(command).await
    }

    #[tracing::instrument(skip(self, patch), fields(resource = R::SINGULAR))]
    pub async fn update(&self, id: EntityId, patch: &R::Patch) -> Result<R, GatewayError> {
        let command = Command::new(format!("update_{}", R::SINGULAR))
            .arg("id", id)
            .arg(R::SINGULAR, prepare(patch)?);
        self.call(command).await
    }

    #[tracing::instrument(skip(self), fields(resource = R::SINGULAR))]
    pub async fn delete(&self, id: EntityId) -> Result<(), GatewayError> {
        let command = Command::new(format!("delete_{}", R::SINGULAR)).arg("id", id);
        self.gateway
            .invoke(command)
            .await
            .map(|_| ())
            .inspect_err(|error| tracing::error!(%error, "delete failed"))
    }

    async fn call<T: DeserializeOwned>(&self, command: Command) -> Result<T, GatewayError> {
        let name = command.name.clone();
        self.gateway
            .invoke(command)
            .await
            .and_then(decode)
            .inspect_err(|error| tracing::error!(command = %name, %error, "service call failed"))
    }
}
