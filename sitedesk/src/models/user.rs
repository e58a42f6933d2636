use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityId, Validate};
use crate::gateway::GatewayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserRole {
    #[serde(alias = "ADMIN", alias = "관리자")]
    Admin,
    #[default]
    #[serde(alias = "USER", alias = "일반사용자")]
    Regular,
}

impl UserRole {
    pub fn label(&self) -> &'static str {
        match self {
            UserRole::Admin => "관리자",
            UserRole::Regular => "일반사용자",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: EntityId,
    #[serde(alias = "name")]
    pub username: String,
    pub email: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub role: UserRole,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub department: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub position: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for User {
    fn id(&self) -> EntityId {
        self.id
    }

    fn display_name(&self) -> &str {
        &self.username
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub department: String,
    pub position: String,
}

impl Validate for RegisterForm {
    fn validate(&self) -> Result<(), GatewayError> {
        if self.username.trim().is_empty() {
            return Err(GatewayError::validation("username is required"));
        }
        if !self.email.contains('@') {
            return Err(GatewayError::validation("email address is invalid"));
        }
        if self.password.is_empty() {
            return Err(GatewayError::validation("password is required"));
        }
        Ok(())
    }
}

/// Profile fields a user may change; the password is only sent when set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

impl Validate for UserForm {
    fn validate(&self) -> Result<(), GatewayError> {
        if self.username.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(GatewayError::validation("username is required"));
        }
        if self.email.as_deref().is_some_and(|email| !email.contains('@')) {
            return Err(GatewayError::validation("email address is invalid"));
        }
        Ok(())
    }
}
