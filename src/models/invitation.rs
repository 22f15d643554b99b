//! Invitation Ledger records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an invitation. `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Rejected => "rejected",
        }
    }
}

/// Terminal outcome an invitee can move an invitation into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Accepted,
    Rejected,
}

impl From<Resolution> for InvitationStatus {
    fn from(resolution: Resolution) -> Self {
        match resolution {
            Resolution::Accepted => InvitationStatus::Accepted,
            Resolution::Rejected => InvitationStatus::Rejected,
        }
    }
}

/// An invitation, stored under the inviter at `users/{inviterId}/teamInvitations/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub id: String,
    pub inviter_id: String,
    pub inviter_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inviter_email: Option<String>,
    pub invitee_id: String,
    pub invitee_name: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invitation {
    pub const COLLECTION: &'static str = "teamInvitations";

    pub fn is_pending(&self) -> bool {
        self.status == InvitationStatus::Pending
    }
}

/// Fields supplied when writing a new invitation to a ledger.
#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub inviter_name: String,
    pub inviter_email: Option<String>,
    pub invitee_id: String,
    pub invitee_name: String,
    pub role: String,
    pub team_id: Option<String>,
    pub team_name: Option<String>,
}

/// Index entry at `users/{inviteeId}/receivedInvitations/{invitationId}` pointing
/// back into the inviter's ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedInvitation {
    pub invitation_id: String,
    pub inviter_id: String,
    pub created_at: DateTime<Utc>,
}

impl ReceivedInvitation {
    pub const COLLECTION: &'static str = "receivedInvitations";
}

/// Request body for issuing an invitation. The invitee is given by share code
/// or by id; exactly one of the two must be set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvitationRequest {
    #[serde(default)]
    pub invitee_code: Option<String>,
    #[serde(default)]
    pub invitee_id: Option<String>,
    pub role: String,
    #[serde(default)]
    pub team_id: Option<String>,
}

/// Query parameters for the received-invitations listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReceivedQuery {
    #[serde(default)]
    pub all: bool,
}
