//! Team Registry endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{require, success, ApiResult};
use crate::auth::ActingUser;
use crate::errors::AppError;
use crate::models::{CreateTeamRequest, Team, UpdateTeamRequest};
use crate::AppState;

/// GET /api/teams - Teams the acting user owns.
pub async fn list_owned_teams(
    State(state): State<AppState>,
    ActingUser(me): ActingUser,
) -> ApiResult<Vec<Team>> {
    success(state.repo.list_owned_teams(&me).await?)
}

/// GET /api/teams/joined - Every team in the acting user's registry, owned or joined.
pub async fn list_my_teams(
    State(state): State<AppState>,
    ActingUser(me): ActingUser,
) -> ApiResult<Vec<Team>> {
    success(state.repo.list_teams_for(&me).await?)
}

/// GET /api/teams/{id} - A registry entry of the acting user.
pub async fn get_team(
    State(state): State<AppState>,
    ActingUser(me): ActingUser,
    Path(id): Path<String>,
) -> ApiResult<Team> {
    match state.repo.get_team(&me, &id).await? {
        Some(team) => success(team),
        None => Err(AppError::NotFound(format!("Team {} not found", id))),
    }
}

/// POST /api/teams - Create a team owned by the acting user.
pub async fn create_team(
    State(state): State<AppState>,
    ActingUser(me): ActingUser,
    Json(request): Json<CreateTeamRequest>,
) -> ApiResult<Team> {
    require(&request.name, "Team name")?;

    let owner = state.repo.get_user(&me).await?;
    let team = state
        .repo
        .create_team(&owner.id, owner.display_name(), &owner.email, &request)
        .await?;
    success(team)
}

/// PUT /api/teams/{id} - Edit an owned team. Member mirrors keep their snapshot.
pub async fn update_team(
    State(state): State<AppState>,
    ActingUser(me): ActingUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateTeamRequest>,
) -> ApiResult<Team> {
    if let Some(name) = &request.name {
        require(name, "Team name")?;
    }

    success(state.repo.update_team(&me, &id, &request).await?)
}

/// DELETE /api/teams/{id} - Delete an owned team. Member mirrors are left in place.
pub async fn delete_team(
    State(state): State<AppState>,
    ActingUser(me): ActingUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.repo.delete_team(&me, &id).await?;
    success(())
}
