//! Role definitions kept per user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of the system role every user starts with.
pub const DEFAULT_SYSTEM_ROLE: &str = "Admin";

/// Which role collection a definition lives in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoleKind {
    System,
    Project,
}

impl RoleKind {
    pub fn collection(&self) -> &'static str {
        match self {
            RoleKind::System => "system_roles",
            RoleKind::Project => "project_roles",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}
