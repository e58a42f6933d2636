#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Value, json};
use sitedesk::gateway::{Command, Gateway, GatewayError};
use std::sync::Mutex;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};

pub fn project_json(id: i64, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": "",
        "status": "in-progress",
        "startDate": "2024-03-01",
        "endDate": "2024-12-31",
        "progress": 40,
        "manager": "Lee",
        "budget": 1500000000.0,
        "location": "Incheon",
        "createdAt": "2024-03-01T00:00:00Z",
        "updatedAt": "2024-03-01T00:00:00Z"
    })
}

pub fn notification_json(id: i64, user_id: i64) -> Value {
    json!({
        "id": id,
        "title": format!("notice {id}"),
        "message": "site update",
        "type": "info",
        "is_read": false,
        "created_at": "2024-05-01T00:00:00Z",
        "user_id": user_id
    })
}

/// A gateway call waiting for the test to answer it.
pub struct PendingCall {
    pub command: Command,
    reply: oneshot::Sender<Result<Value, GatewayError>>,
}

impl PendingCall {
    pub fn respond(self, result: Result<Value, GatewayError>) {
        let _ = self.reply.send(result);
    }
}

/// Gateway whose calls resolve only when the test responds, in any order.
pub struct ScriptedGateway {
    calls: mpsc::UnboundedSender<PendingCall>,
}

impl ScriptedGateway {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PendingCall>) {
        let (calls, receiver) = mpsc::unbounded_channel();
        (Self { calls }, receiver)
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn invoke(&self, command: Command) -> Result<Value, GatewayError> {
        let (reply, response) = oneshot::channel();
        self.calls
            .send(PendingCall { command, reply })
            .map_err(|_| GatewayError::Network("script closed".to_string()))?;
        response
            .await
            .map_err(|_| GatewayError::Network("call dropped".to_string()))?
    }
}

/// In-memory project backend answering the project commands.
pub struct FakeProjectBackend {
    projects: Mutex<Vec<Value>>,
    next_id: Mutex<i64>,
}

impl FakeProjectBackend {
    pub fn with_projects(projects: Vec<Value>) -> Self {
        let next_id = projects
            .iter()
            .filter_map(|project| project["id"].as_i64())
            .max()
            .unwrap_or(0)
            + 1;
        Self {
            projects: Mutex::new(projects),
            next_id: Mutex::new(next_id),
        }
    }
}

#[async_trait]
impl Gateway for FakeProjectBackend {
    async fn invoke(&self, command: Command) -> Result<Value, GatewayError> {
        let mut projects = self.projects.lock().unwrap();
        let id = command.args.get("id").and_then(Value::as_i64);
        let position = id.and_then(|id| projects.iter().position(|p| p["id"] == id));
        match command.name.as_str() {
            "get_projects" => Ok(Value::Array(projects.clone())),
            "get_project" => position
                .map(|index| projects[index].clone())
                .ok_or(GatewayError::NotFound),
            "create_project" => {
                let mut next_id = self.next_id.lock().unwrap();
                let mut project = project_json(*next_id, "");
                *next_id += 1;
                merge(&mut project, &command.args["project"]);
                projects.push(project.clone());
                Ok(project)
            }
            "update_project" => {
                let index = position.ok_or(GatewayError::NotFound)?;
                merge(&mut projects[index], &command.args["project"]);
                Ok(projects[index].clone())
            }
            "delete_project" => {
                let index = position.ok_or(GatewayError::NotFound)?;
                projects.remove(index);
                Ok(Value::Null)
            }
            other => Err(GatewayError::UnknownCommand(other.to_string())),
        }
    }
}

fn merge(target: &mut Value, patch: &Value) {
    if let (Some(target), Some(patch)) = (target.as_object_mut(), patch.as_object()) {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }
}

/// Serves `app` on an ephemeral local port and returns its address.
pub async fn serve(app: axum::Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    address.to_string()
}
