//! RPC-style transport: every command is posted to one `invoke` endpoint and
//! answered with an [`ApiResponse`] envelope.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use super::{Command, Gateway, GatewayError, error_message, settle};
use crate::session::Session;

#[derive(Debug, Serialize)]
struct Invocation<'a> {
    command: &'a str,
    args: &'a Map<String, Value>,
}

/// Envelope wrapping every command result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub message: Option<String>,
    pub status: u16,
}

impl ApiResponse {
    pub(crate) fn into_result(self) -> Result<Value, GatewayError> {
        if self.status >= 400 {
            let message = self
                .message
                .unwrap_or_else(|| error_message(&self.data, "command failed"));
            return Err(GatewayError::from_status(self.status, message));
        }
        Ok(self.data)
    }
}

pub struct CommandGateway {
    client: reqwest::Client,
    endpoint: String,
    session: Arc<Session>,
}

impl CommandGateway {
    pub fn new(base_url: impl Into<String>, session: Arc<Session>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/invoke", base_url.into().trim_end_matches('/')),
            session,
        }
    }

    async fn send(&self, command: &Command) -> Result<Value, GatewayError> {
        let mut request = self.client.post(&self.endpoint).json(&Invocation {
            command: &command.name,
            args: &command.args,
        });
        if let Some(token) = self.session.token() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        // The transport status wins over whatever the envelope claims.
        if !status.is_success() {
            let fallback = status.canonical_reason().unwrap_or("request failed");
            return Err(GatewayError::from_status(
                status.as_u16(),
                error_message(&body, fallback),
            ));
        }

        serde_json::from_value::<ApiResponse>(body)
            .map_err(|e| GatewayError::Decode(e.to_string()))?
            .into_result()
    }
}

#[async_trait]
impl Gateway for CommandGateway {
    async fn invoke(&self, command: Command) -> Result<Value, GatewayError> {
        tracing::debug!(command = %command.name, "invoking command");
        let result = self.send(&command).await;
        settle(&self.session, &command.name, result)
    }
}
