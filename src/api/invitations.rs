//! Invitation endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{success, ApiResult};
use crate::auth::ActingUser;
use crate::models::{CreateInvitationRequest, Invitation, ReceivedQuery};
use crate::sync::{self, AcceptOutcome};
use crate::AppState;

/// POST /api/invitations - Invite a user, by share code or id, to the acting user's team.
pub async fn create_invitation(
    State(state): State<AppState>,
    ActingUser(me): ActingUser,
    Json(request): Json<CreateInvitationRequest>,
) -> ApiResult<Invitation> {
    success(sync::issue(&state.repo, &me, &request).await?)
}

/// GET /api/invitations/sent - Everything the acting user sent, any status.
pub async fn list_sent_invitations(
    State(state): State<AppState>,
    ActingUser(me): ActingUser,
) -> ApiResult<Vec<Invitation>> {
    success(state.repo.list_sent_invitations(&me).await?)
}

/// GET /api/invitations/sent/{id} - One invitation from the acting user's ledger.
pub async fn get_sent_invitation(
    State(state): State<AppState>,
    ActingUser(me): ActingUser,
    Path(id): Path<String>,
) -> ApiResult<Invitation> {
    success(state.repo.get_invitation(&me, &id).await?)
}

/// GET /api/invitations/received - Pending invitations addressed to the acting user
/// (`?all=true` for every status).
pub async fn list_received_invitations(
    State(state): State<AppState>,
    ActingUser(me): ActingUser,
    Query(query): Query<ReceivedQuery>,
) -> ApiResult<Vec<Invitation>> {
    let invitations = if query.all {
        state.repo.list_received_invitations(&me).await?
    } else {
        state.repo.list_all_pending_for_invitee(&me).await?
    };
    success(invitations)
}

/// POST /api/invitations/received/{inviter_id}/{id}/accept
pub async fn accept_invitation(
    State(state): State<AppState>,
    ActingUser(me): ActingUser,
    Path((inviter_id, id)): Path<(String, String)>,
) -> ApiResult<AcceptOutcome> {
    success(sync::accept(&state.repo, &me, &inviter_id, &id).await?)
}

/// POST /api/invitations/received/{inviter_id}/{id}/reject
pub async fn reject_invitation(
    State(state): State<AppState>,
    ActingUser(me): ActingUser,
    Path((inviter_id, id)): Path<(String, String)>,
) -> ApiResult<Invitation> {
    success(sync::reject(&state.repo, &me, &inviter_id, &id).await?)
}

/// DELETE /api/invitations/sent/{id} - Cancel a pending invitation the acting user sent.
/// `data` is `null` when the acting user's ledger has no such invitation.
pub async fn cancel_invitation(
    State(state): State<AppState>,
    ActingUser(me): ActingUser,
    Path(id): Path<String>,
) -> ApiResult<Option<Invitation>> {
    success(sync::cancel(&state.repo, &me, &id).await?)
}
