use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::{StreamExt as _, future};
use mockall::automock;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::gateway::GatewayError;
use crate::models::{EntityId, Notification};

pub type EventStream = BoxStream<'static, Result<Notification, GatewayError>>;

/// Inbound channel of notification events for one user.
#[automock]
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Opens the channel. The stream ends when the backend closes it.
    async fn connect(&self, user_id: EntityId) -> Result<EventStream, GatewayError>;
}

/// Receives events over a websocket at `{base}/ws/{user_id}`.
pub struct WebSocketEventSource {
    base_url: String,
}

impl WebSocketEventSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, user_id: EntityId) -> String {
        format!("{}/ws/{user_id}", self.base_url)
    }
}

#[async_trait]
impl EventSource for WebSocketEventSource {
    #[tracing::instrument(skip(self))]
    async fn connect(&self, user_id: EntityId) -> Result<EventStream, GatewayError> {
        let url = self.url_for(user_id);
        let (socket, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|error| GatewayError::Network(error.to_string()))?;
        tracing::info!(%url, "event channel connected");

        let events = socket
            .take_while(|frame| future::ready(!matches!(frame, Ok(Message::Close(_)))))
            .filter_map(|frame| future::ready(decode_frame(frame)));
        Ok(events.boxed())
    }
}

/// Turns one websocket frame into an event. Control frames and payloads that
/// are not notifications yield nothing.
fn decode_frame(
    frame: Result<Message, tungstenite::Error>,
) -> Option<Result<Notification, GatewayError>> {
    let parsed = match frame {
        Ok(Message::Text(text)) => serde_json::from_str::<Notification>(text.as_str()),
        Ok(Message::Binary(bytes)) => serde_json::from_slice::<Notification>(&bytes),
        Ok(_) => return None,
        Err(error) => return Some(Err(GatewayError::Network(error.to_string()))),
    };
    match parsed {
        Ok(notification) => Some(Ok(notification)),
        Err(error) => {
            tracing::warn!(%error, "skipping undecodable event");
            None
        }
    }
}
