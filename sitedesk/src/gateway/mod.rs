//! Remote command gateway.
//!
//! Every outbound call to the backend goes through a [`Gateway`]: a named
//! [`Command`] with JSON arguments goes in, a JSON value comes out. Two
//! transports implement the trait:
//! - [`rest::RestGateway`] maps command names onto REST routes
//! - [`command::CommandGateway`] posts the command to a single RPC endpoint
//!
//! Both attach the session's bearer credential and expire the session when the
//! backend answers with an authentication failure.

use async_trait::async_trait;
use mockall::automock;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::session::Session;

pub mod command;
pub mod rest;

/// Named operation plus its JSON arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub name: String,
    pub args: Map<String, Value>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Map::new(),
        }
    }

    /// Adds an argument, replacing any previous value under the same key.
    pub fn arg(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.args.insert(key.to_string(), value.into());
        self
    }

    pub(crate) fn id_arg(&self, key: &str) -> Result<i64, GatewayError> {
        self.args
            .get(key)
            .and_then(Value::as_i64)
            .ok_or_else(|| GatewayError::Decode(format!("missing integer argument '{key}'")))
    }
}

/// Coarse failure class, kept by the state containers next to their message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Network,
    Auth,
    NotFound,
    Validation,
    Server,
    Decode,
}

/// Errors surfaced by a gateway call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// The backend could not be reached at all
    #[error("Backend unreachable: {0}")]
    Network(String),
    /// Missing or expired credential, the session has been cleared
    #[error("Authentication required")]
    Auth,
    #[error("Resource not found")]
    NotFound,
    /// The backend rejected the payload
    #[error("Request rejected ({status}): {message}")]
    Validation { status: u16, message: String },
    #[error("Server failure ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("Unknown command '{0}'")]
    UnknownCommand(String),
    /// The payload could not be encoded or decoded
    #[error("Malformed payload: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Classifies a non-success status code.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => GatewayError::Auth,
            404 => GatewayError::NotFound,
            400..=499 => GatewayError::Validation { status, message },
            _ => GatewayError::Server { status, message },
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        GatewayError::Validation {
            status: 422,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            GatewayError::Network(_) => FailureKind::Network,
            GatewayError::Auth => FailureKind::Auth,
            GatewayError::NotFound => FailureKind::NotFound,
            GatewayError::Validation { .. } => FailureKind::Validation,
            GatewayError::Server { .. } => FailureKind::Server,
            GatewayError::UnknownCommand(_) | GatewayError::Decode(_) => FailureKind::Decode,
        }
    }

    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, GatewayError::Auth)
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            GatewayError::Decode(error.to_string())
        } else if let Some(status) = error.status() {
            GatewayError::from_status(status.as_u16(), error.to_string())
        } else {
            GatewayError::Network(error.to_string())
        }
    }
}

/// Single chokepoint for backend calls.
#[automock]
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Issues the command and resolves to the backend's JSON result.
    ///
    /// Commands without a meaningful result resolve to `Value::Null`.
    async fn invoke(&self, command: Command) -> Result<Value, GatewayError>;
}

/// Pulls a human readable message out of an error body.
pub(crate) fn error_message(body: &Value, fallback: &str) -> String {
    ["message", "detail", "error"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

/// Applies the session side effects of a finished call.
pub(crate) fn settle<T>(
    session: &Session,
    command: &str,
    result: Result<T, GatewayError>,
) -> Result<T, GatewayError> {
    if let Err(error) = &result {
        tracing::warn!(command, %error, "gateway call failed");
        if error.requires_reauthentication() {
            session.expire();
        }
    }
    result
}
