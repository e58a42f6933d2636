//! REST transport for the gateway.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;

use super::{Command, Gateway, GatewayError, error_message, settle};
use crate::session::Session;

/// (singular, plural) names of the resources served under `/api`.
const RESOURCES: &[(&str, &str)] = &[("project", "projects"), ("task", "tasks"), ("user", "users")];

/// HTTP request a command translates into.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Route {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Route {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    fn with_body(mut self, command: &Command, key: &str) -> Result<Self, GatewayError> {
        let body = command
            .args
            .get(key)
            .cloned()
            .ok_or_else(|| GatewayError::Decode(format!("missing argument '{key}'")))?;
        self.body = Some(body);
        Ok(self)
    }
}

/// Maps a command name and its arguments onto a REST route.
pub(crate) fn route(command: &Command) -> Result<Route, GatewayError> {
    match command.name.as_str() {
        "login" => Route::new(Method::POST, "/api/auth/login").with_body(command, "credentials"),
        "register" => Route::new(Method::POST, "/api/auth/register").with_body(command, "userData"),
        "logout" => Ok(Route::new(Method::POST, "/api/auth/logout")),
        "get_current_user" => Ok(Route::new(Method::GET, "/api/auth/me")),
        "get_notifications" => Ok(Route::new(
            Method::GET,
            format!("/notifications/{}", command.id_arg("userId")?),
        )),
        "create_notification" => {
            Route::new(Method::POST, "/notifications/").with_body(command, "notification")
        }
        "mark_notification_read" => Ok(Route::new(
            Method::PUT,
            format!("/notifications/{}/read", command.id_arg("id")?),
        )),
        _ => resource_route(command),
    }
}

fn resource_route(command: &Command) -> Result<Route, GatewayError> {
    let unknown = || GatewayError::UnknownCommand(command.name.clone());
    let (verb, noun) = command.name.split_once('_').ok_or_else(unknown)?;

    for (singular, plural) in RESOURCES {
        let collection = format!("/api/{plural}");
        if noun == *plural && verb == "get" {
            let mut route = Route::new(Method::GET, collection);
            route.query = command
                .args
                .iter()
                .filter_map(|(key, value)| query_value(value).map(|value| (key.clone(), value)))
                .collect();
            return Ok(route);
        }
        if noun != *singular {
            continue;
        }
        return match verb {
            "get" => Ok(Route::new(
                Method::GET,
                format!("{collection}/{}", command.id_arg("id")?),
            )),
            "create" => Route::new(Method::POST, collection).with_body(command, singular),
            "update" => Route::new(
                Method::PUT,
                format!("{collection}/{}", command.id_arg("id")?),
            )
            .with_body(command, singular),
            "delete" => Ok(Route::new(
                Method::DELETE,
                format!("{collection}/{}", command.id_arg("id")?),
            )),
            _ => Err(unknown()),
        };
    }
    Err(unknown())
}

fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Gateway speaking plain REST to the backend.
pub struct RestGateway {
    client: reqwest::Client,
    base_url: String,
    session: Arc<Session>,
}

impl RestGateway {
    pub fn new(base_url: impl Into<String>, session: Arc<Session>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        }
    }

    async fn send(&self, route: Route) -> Result<Value, GatewayError> {
        let url = format!("{}{}", self.base_url, route.path);
        let mut request = self.client.request(route.method, url).query(&route.query);
        if let Some(token) = self.session.token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = &route.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&text).map_err(|e| GatewayError::Decode(e.to_string()));
        }

        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        let fallback = status.canonical_reason().unwrap_or("request failed");
        Err(GatewayError::from_status(
            status.as_u16(),
            error_message(&body, fallback),
        ))
    }
}

#[async_trait]
impl Gateway for RestGateway {
    async fn invoke(&self, command: Command) -> Result<Value, GatewayError> {
        tracing::debug!(command = %command.name, "invoking over REST");
        let result = match route(&command) {
            Ok(route) => self.send(route).await,
            Err(error) => Err(error),
        };
        settle(&self.session, &command.name, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_route_with_filter() {
        let command = Command::new("get_tasks").arg("projectId", 3);

        let route = route(&command).unwrap();

        assert_eq!(route.method, Method::GET);
        assert_eq!(route.path, "/api/tasks");
        assert_eq!(route.query, vec![("projectId".to_string(), "3".to_string())]);
        assert_eq!(route.body, None);
    }

    #[test]
    fn test_entity_routes() {
        let update = Command::new("update_project")
            .arg("id", 5)
            .arg("project", json!({"name": "Tower"}));
        let delete = Command::new("delete_task").arg("id", 9);
        let get = Command::new("get_user").arg("id", 2);

        let update = route(&update).unwrap();
        let delete = route(&delete).unwrap();
        let get = route(&get).unwrap();

        assert_eq!((update.method, update.path.as_str()), (Method::PUT, "/api/projects/5"));
        assert_eq!(update.body, Some(json!({"name": "Tower"})));
        assert_eq!((delete.method, delete.path.as_str()), (Method::DELETE, "/api/tasks/9"));
        assert_eq!((get.method, get.path.as_str()), (Method::GET, "/api/users/2"));
    }

    #[test]
    fn test_auth_and_notification_routes() {
        let login = Command::new("login").arg("credentials", json!({"email": "a@b.c"}));
        let read = Command::new("mark_notification_read").arg("id", 12);
        let inbox = Command::new("get_notifications").arg("userId", 7);

        assert_eq!(route(&login).unwrap().path, "/api/auth/login");
        assert_eq!(route(&Command::new("get_current_user")).unwrap().path, "/api/auth/me");
        assert_eq!(route(&read).unwrap().path, "/notifications/12/read");
        assert_eq!(route(&inbox).unwrap().path, "/notifications/7");
    }

    #[test]
    fn test_unknown_and_incomplete_commands() {
        assert_eq!(
            route(&Command::new("launch_rocket")),
            Err(GatewayError::UnknownCommand("launch_rocket".to_string()))
        );
        assert!(matches!(
            route(&Command::new("create_project")),
            Err(GatewayError::Decode(_))
        ));
        assert!(matches!(
            route(&Command::new("get_project")),
            Err(GatewayError::Decode(_))
        ));
    }
}
