//! Roster entries: the flat per-owner team member list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role label given to a team creator in their own roster.
pub const OWNER_ROLE: &str = "Owner";

/// A member in an owner's roster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Free-text role label
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TeamMember {
    pub const COLLECTION: &'static str = "team";
}

/// Request body for adding a roster member.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub role: String,
}
