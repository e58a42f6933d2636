use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityId, Validate};
use crate::gateway::GatewayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    #[serde(alias = "TODO")]
    Todo,
    #[serde(alias = "IN_PROGRESS")]
    InProgress,
    #[serde(alias = "DONE")]
    Done,
}

impl TaskStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "대기중",
            TaskStatus::InProgress => "진행중",
            TaskStatus::Done => "완료",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskPriority {
    #[serde(alias = "HIGH")]
    High,
    #[default]
    #[serde(alias = "MEDIUM")]
    Medium,
    #[serde(alias = "LOW")]
    Low,
}

impl TaskPriority {
    pub fn label(&self) -> &'static str {
        match self {
            TaskPriority::High => "높음",
            TaskPriority::Medium => "중간",
            TaskPriority::Low => "낮음",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: EntityId,
    pub project_id: EntityId,
    #[serde(alias = "title")]
    pub name: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub description: String,
    pub status: TaskStatus,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub progress: u8,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub assignee: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub priority: TaskPriority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Task {
    fn id(&self) -> EntityId {
        self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }
}

/// Restricts a task listing; no project means every task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub project_id: Option<EntityId>,
}

impl TaskFilter {
    pub fn for_project(project_id: EntityId) -> Self {
        Self {
            project_id: Some(project_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskForm {
    pub project_id: EntityId,
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
    pub progress: u8,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub assignee: String,
    pub priority: TaskPriority,
}

impl Validate for TaskForm {
    fn validate(&self) -> Result<(), GatewayError> {
        if self.name.trim().is_empty() {
            return Err(GatewayError::validation("task name is required"));
        }
        if self.progress > 100 {
            return Err(GatewayError::validation("progress must be between 0 and 100"));
        }
        if self.end_date < self.start_date {
            return Err(GatewayError::validation("end date precedes start date"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
}

impl Validate for TaskPatch {
    fn validate(&self) -> Result<(), GatewayError> {
        if self.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(GatewayError::validation("task name is required"));
        }
        if self.progress.is_some_and(|progress| progress > 100) {
            return Err(GatewayError::validation("progress must be between 0 and 100"));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(GatewayError::validation("end date precedes start date"));
            }
        }
        Ok(())
    }
}

impl From<TaskForm> for TaskPatch {
    fn from(form: TaskForm) -> Self {
        Self {
            project_id: Some(form.project_id),
            name: Some(form.name),
            description: Some(form.description),
            status: Some(form.status),
            progress: Some(form.progress),
            start_date: Some(form.start_date),
            end_date: Some(form.end_date),
            assignee: Some(form.assignee),
            priority: Some(form.priority),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_accepts_title_and_legacy_enums() {
        let task: Task = serde_json::from_value(json!({
            "id": 11,
            "projectId": 2,
            "title": "Pour foundation",
            "status": "IN_PROGRESS",
            "progress": 35,
            "startDate": "2024-04-01",
            "endDate": "2024-04-20",
            "priority": "HIGH",
            "createdAt": "2024-03-30T08:00:00Z",
            "updatedAt": "2024-04-02T08:00:00Z"
        }))
        .unwrap();

        assert_eq!(task.name, "Pour foundation");
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.priority, TaskPriority::High);
        assert_eq!(task.status.label(), "진행중");
        assert_eq!(task.priority.label(), "높음");
    }

    #[test]
    fn test_form_rejects_progress_over_hundred() {
        let form = TaskForm {
            project_id: 1,
            name: "Scaffolding".to_string(),
            description: String::new(),
            status: TaskStatus::Todo,
            progress: 120,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            assignee: "Lee".to_string(),
            priority: TaskPriority::Low,
        };

        assert!(matches!(form.validate(), Err(GatewayError::Validation { .. })));
        assert!(TaskPatch::from(form).validate().is_err());
    }

    #[test]
    fn test_patch_serialization() {
        let patch = TaskPatch {
            status: Some(TaskStatus::Done),
            progress: Some(100),
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"status": "done", "progress": 100})
        );
    }
}
