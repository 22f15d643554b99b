//! Role definition endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{require, success, ApiResult};
use crate::auth::ActingUser;
use crate::errors::AppError;
use crate::models::{CreateRoleRequest, Role, RoleKind};
use crate::AppState;

/// GET /api/roles/{kind}
pub async fn list_roles(
    State(state): State<AppState>,
    ActingUser(me): ActingUser,
    Path(kind): Path<RoleKind>,
) -> ApiResult<Vec<Role>> {
    success(state.repo.list_roles(&me, kind).await?)
}

/// POST /api/roles/{kind}
pub async fn create_role(
    State(state): State<AppState>,
    ActingUser(me): ActingUser,
    Path(kind): Path<RoleKind>,
    Json(request): Json<CreateRoleRequest>,
) -> ApiResult<Role> {
    require(&request.name, "Role name")?;

    success(state.repo.create_role(&me, kind, &request).await?)
}

/// DELETE /api/roles/{kind}/{id}
pub async fn delete_role(
    State(state): State<AppState>,
    ActingUser(me): ActingUser,
    Path((kind, id)): Path<(RoleKind, String)>,
) -> ApiResult<()> {
    if state.repo.delete_role(&me, kind, &id).await? {
        success(())
    } else {
        Err(AppError::NotFound(format!("Role {} not found", id)))
    }
}
