//! Roster endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{require, success, ApiResult};
use crate::auth::ActingUser;
use crate::models::{AddMemberRequest, TeamMember};
use crate::AppState;

/// GET /api/roster - The acting user's roster.
pub async fn list_members(
    State(state): State<AppState>,
    ActingUser(me): ActingUser,
) -> ApiResult<Vec<TeamMember>> {
    success(state.repo.list_members(&me).await?)
}

/// POST /api/roster - Add a member to the acting user's roster.
pub async fn add_member(
    State(state): State<AppState>,
    ActingUser(me): ActingUser,
    Json(request): Json<AddMemberRequest>,
) -> ApiResult<TeamMember> {
    require(&request.name, "Name")?;
    require(&request.role, "Role")?;

    success(state.repo.add_member(&me, &request).await?)
}

/// DELETE /api/roster/{id} - Remove a member; removing an absent member succeeds.
pub async fn remove_member(
    State(state): State<AppState>,
    ActingUser(me): ActingUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.repo.remove_member(&me, &id).await?;
    success(())
}
