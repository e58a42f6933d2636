use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityId, Validate};
use crate::gateway::GatewayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    #[default]
    #[serde(alias = "PLANNING", alias = "계획")]
    Planning,
    #[serde(alias = "IN_PROGRESS", alias = "ACTIVE", alias = "진행중")]
    InProgress,
    #[serde(alias = "COMPLETED", alias = "완료")]
    Completed,
    #[serde(alias = "ON_HOLD", alias = "대기중")]
    OnHold,
}

impl ProjectStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ProjectStatus::Planning => "계획",
            ProjectStatus::InProgress => "진행중",
            ProjectStatus::Completed => "완료",
            ProjectStatus::OnHold => "대기중",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: EntityId,
    pub name: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub description: String,
    pub status: ProjectStatus,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Percentage, 0 to 100
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub progress: u8,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub manager: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub budget: f64,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Project {
    fn id(&self) -> EntityId {
        self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }
}

/// Payload for creating a project; the backend assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectForm {
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub manager: String,
    pub budget: f64,
    pub location: String,
}

impl Validate for ProjectForm {
    fn validate(&self) -> Result<(), GatewayError> {
        if self.name.trim().is_empty() {
            return Err(GatewayError::validation("project name is required"));
        }
        if self.end_date < self.start_date {
            return Err(GatewayError::validation("end date precedes start date"));
        }
        if self.budget < 0.0 {
            return Err(GatewayError::validation("budget cannot be negative"));
        }
        Ok(())
    }
}

/// Partial update; absent fields are left untouched by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Validate for ProjectPatch {
    fn validate(&self) -> Result<(), GatewayError> {
        if self.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(GatewayError::validation("project name is required"));
        }
        if self.progress.is_some_and(|progress| progress > 100) {
            return Err(GatewayError::validation("progress must be between 0 and 100"));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(GatewayError::validation("end date precedes start date"));
            }
        }
        if self.budget.is_some_and(|budget| budget < 0.0) {
            return Err(GatewayError::validation("budget cannot be negative"));
        }
        Ok(())
    }
}

impl From<ProjectForm> for ProjectPatch {
    fn from(form: ProjectForm) -> Self {
        Self {
            name: Some(form.name),
            description: Some(form.description),
            status: Some(form.status),
            start_date: Some(form.start_date),
            end_date: Some(form.end_date),
            progress: None,
            manager: Some(form.manager),
            budget: Some(form.budget),
            location: Some(form.location),
        }
    }
}
