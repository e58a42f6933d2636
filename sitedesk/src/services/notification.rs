use std::sync::Arc;

use super::{decode, encode};
use crate::gateway::{Command, Gateway, GatewayError};
use crate::models::{EntityId, Notification, NotificationDraft};

#[derive(Clone)]
pub struct NotificationService {
    gateway: Arc<dyn Gateway>,
}

impl NotificationService {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: EntityId) -> Result<Vec<Notification>, GatewayError> {
        let command = Command::new("get_notifications").arg("userId", user_id);
        self.gateway
            .invoke(command)
            .await
            .and_then(decode)
            .inspect_err(|error| tracing::error!(%error, "cannot load notifications"))
    }

    #[tracing::instrument(skip_all, fields(user_id = draft.user_id))]
    pub async fn create(&self, draft: &NotificationDraft) -> Result<Notification, GatewayError> {
        let command = Command::new("create_notification").arg("notification", encode(draft)?);
        self.gateway
            .invoke(command)
            .await
            .and_then(decode)
            .inspect_err(|error| tracing::error!(%error, "cannot create notification"))
    }

    #[tracing::instrument(skip(self))]
    pub async fn mark_read(&self, id: EntityId) -> Result<(), GatewayError> {
        let command = Command::new("mark_notification_read").arg("id", id);
        self.gateway
            .invoke(command)
            .await
            .map(|_| ())
            .inspect_err(|error| tracing::error!(%error, "cannot mark notification read"))
    }
}
