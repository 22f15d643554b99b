//! Team Registry records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A team, stored authoritatively under its owner and mirrored under each member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Team {
    pub const COLLECTION: &'static str = "teams";

    /// Whether this record, found under `holder_id`, is a mirror rather than the original.
    pub fn is_mirror_for(&self, holder_id: &str) -> bool {
        self.owner_id != holder_id
    }

    /// Snapshot of this team to store under a member's registry.
    pub fn mirror_copy(&self) -> Team {
        Team {
            updated_at: Utc::now(),
            ..self.clone()
        }
    }
}

/// Request body for creating a team.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Request body for updating a team.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTeamRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}
