//! Invitation Ledger at `users/{inviterId}/teamInvitations`, plus the
//! received-invitations index at `users/{inviteeId}/receivedInvitations`.
//!
//! The ledger is partitioned by inviter. The index lets an invitee find the
//! invitations addressed to them without scanning every user's ledger; it is
//! written in the same call as the ledger and can be rebuilt from the ledgers.

use chrono::Utc;
use sqlx::SqliteConnection;

use super::{documents, users, Repository};
use crate::errors::AppError;
use crate::models::{Invitation, InvitationStatus, NewInvitation, ReceivedInvitation, Resolution};

fn ledger(inviter_id: &str) -> Result<String, AppError> {
    documents::subcollection(inviter_id, Invitation::COLLECTION)
}

fn received(invitee_id: &str) -> Result<String, AppError> {
    documents::subcollection(invitee_id, ReceivedInvitation::COLLECTION)
}

async fn index(conn: &mut SqliteConnection, invitation: &Invitation) -> Result<(), AppError> {
    let entry = ReceivedInvitation {
        invitation_id: invitation.id.clone(),
        inviter_id: invitation.inviter_id.clone(),
        created_at: invitation.created_at,
    };
    documents::put(conn, &received(&invitation.invitee_id)?, &invitation.id, &entry).await
}

/// Write a pending invitation into the inviter's ledger and index it for the invitee.
///
/// Run inside a transaction so the two documents land together.
pub async fn create(
    conn: &mut SqliteConnection,
    inviter_id: &str,
    new: NewInvitation,
) -> Result<Invitation, AppError> {
    let now = Utc::now();
    let invitation = Invitation {
        id: uuid::Uuid::new_v4().to_string(),
        inviter_id: inviter_id.to_string(),
        inviter_name: new.inviter_name,
        inviter_email: new.inviter_email,
        invitee_id: new.invitee_id,
        invitee_name: new.invitee_name,
        role: new.role,
        team_id: new.team_id,
        team_name: new.team_name,
        status: InvitationStatus::Pending,
        created_at: now,
        updated_at: now,
    };

    documents::insert(conn, &ledger(inviter_id)?, &invitation.id, &invitation).await?;
    index(conn, &invitation).await?;
    Ok(invitation)
}

pub async fn find(
    conn: &mut SqliteConnection,
    inviter_id: &str,
    invitation_id: &str,
) -> Result<Option<Invitation>, AppError> {
    documents::get(conn, &ledger(inviter_id)?, invitation_id).await
}

pub async fn get(
    conn: &mut SqliteConnection,
    inviter_id: &str,
    invitation_id: &str,
) -> Result<Invitation, AppError> {
    find(conn, inviter_id, invitation_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Invitation {} not found", invitation_id)))
}

/// Move an invitation to a terminal status.
///
/// Re-applying the status it already has is a no-op; switching from one
/// terminal status to the other is a `Conflict`.
pub async fn set_status(
    conn: &mut SqliteConnection,
    inviter_id: &str,
    invitation_id: &str,
    resolution: Resolution,
) -> Result<Invitation, AppError> {
    let mut invitation = get(conn, inviter_id, invitation_id).await?;
    let status = InvitationStatus::from(resolution);

    if invitation.status == status {
        return Ok(invitation);
    }
    if !invitation.is_pending() {
        return Err(AppError::Conflict(format!(
            "Invitation {} is already {}",
            invitation_id,
            invitation.status.as_str()
        )));
    }

    invitation.status = status;
    invitation.updated_at = Utc::now();
    documents::put(conn, &ledger(inviter_id)?, &invitation.id, &invitation).await?;
    Ok(invitation)
}

/// Hard-delete an invitation and its index entry, whatever its status.
pub async fn delete(
    conn: &mut SqliteConnection,
    inviter_id: &str,
    invitation_id: &str,
) -> Result<bool, AppError> {
    let Some(invitation) = find(conn, inviter_id, invitation_id).await? else {
        return Ok(false);
    };

    documents::delete(conn, &received(&invitation.invitee_id)?, invitation_id).await?;
    documents::delete(conn, &ledger(inviter_id)?, invitation_id).await
}

pub async fn list_sent_by(
    conn: &mut SqliteConnection,
    inviter_id: &str,
) -> Result<Vec<Invitation>, AppError> {
    documents::list(conn, &ledger(inviter_id)?).await
}

/// Pending invitations from one inviter to one invitee.
pub async fn list_pending_for_invitee(
    conn: &mut SqliteConnection,
    inviter_id: &str,
    invitee_id: &str,
) -> Result<Vec<Invitation>, AppError> {
    let addressed: Vec<Invitation> =
        documents::query_eq(conn, &ledger(inviter_id)?, "inviteeId", invitee_id).await?;
    Ok(addressed.into_iter().filter(Invitation::is_pending).collect())
}

/// Every invitation addressed to the invitee, from any inviter, any status.
pub async fn list_received(
    conn: &mut SqliteConnection,
    invitee_id: &str,
) -> Result<Vec<Invitation>, AppError> {
    let entries: Vec<ReceivedInvitation> = documents::list(conn, &received(invitee_id)?).await?;

    let mut invitations = Vec::with_capacity(entries.len());
    for entry in entries {
        match find(conn, &entry.inviter_id, &entry.invitation_id).await? {
            Some(invitation) if invitation.invitee_id == invitee_id => invitations.push(invitation),
            _ => tracing::debug!(
                "Dangling index entry {} for invitee {}",
                entry.invitation_id,
                invitee_id
            ),
        }
    }
    Ok(invitations)
}

/// Pending invitations addressed to the invitee across all inviters.
pub async fn list_all_pending_for_invitee(
    conn: &mut SqliteConnection,
    invitee_id: &str,
) -> Result<Vec<Invitation>, AppError> {
    let all = list_received(conn, invitee_id).await?;
    Ok(all.into_iter().filter(Invitation::is_pending).collect())
}

/// Rebuild the received-invitations index by scanning every user's ledger.
///
/// Returns the number of index entries written.
pub async fn rebuild_index(conn: &mut SqliteConnection) -> Result<usize, AppError> {
    let removed = documents::delete_collection_group(conn, ReceivedInvitation::COLLECTION).await?;

    let mut written = 0;
    for user in users::list_users(conn).await? {
        for invitation in list_sent_by(conn, &user.id).await? {
            index(conn, &invitation).await?;
            written += 1;
        }
    }

    tracing::debug!("Replaced {} index entries with {}", removed, written);
    Ok(written)
}

impl Repository {
    pub async fn get_invitation(
        &self,
        inviter_id: &str,
        invitation_id: &str,
    ) -> Result<Invitation, AppError> {
        let mut conn = self.conn().await?;
        get(&mut conn, inviter_id, invitation_id).await
    }

    pub async fn list_sent_invitations(&self, inviter_id: &str) -> Result<Vec<Invitation>, AppError> {
        let mut conn = self.conn().await?;
        list_sent_by(&mut conn, inviter_id).await
    }

    pub async fn list_received_invitations(
        &self,
        invitee_id: &str,
    ) -> Result<Vec<Invitation>, AppError> {
        let mut conn = self.conn().await?;
        list_received(&mut conn, invitee_id).await
    }

    pub async fn list_all_pending_for_invitee(
        &self,
        invitee_id: &str,
    ) -> Result<Vec<Invitation>, AppError> {
        let mut conn = self.conn().await?;
        list_all_pending_for_invitee(&mut conn, invitee_id).await
    }

    pub async fn rebuild_invitee_index(&self) -> Result<usize, AppError> {
        let mut tx = self.begin_immediate().await?;
        let written = rebuild_index(&mut tx).await?;
        tx.commit().await?;
        Ok(written)
    }
}
