//! User directory endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{require, success, ApiResult};
use crate::auth::ActingUser;
use crate::models::{AssignRoleRequest, CreateUserRequest, UpdateUserRequest, User};
use crate::AppState;

/// POST /api/users - Register a user.
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> ApiResult<User> {
    require(&request.name, "Name")?;
    require(&request.email, "Email")?;

    success(state.repo.create_user(&request).await?)
}

/// GET /api/users/{id} - Get a user.
pub async fn get_user(
    State(state): State<AppState>,
    _user: ActingUser,
    Path(id): Path<String>,
) -> ApiResult<User> {
    success(state.repo.get_user(&id).await?)
}

/// GET /api/users/code/{code} - Find a user by share code; `null` when nobody has it.
pub async fn lookup_user_by_code(
    State(state): State<AppState>,
    _user: ActingUser,
    Path(code): Path<String>,
) -> ApiResult<Option<User>> {
    success(state.repo.lookup_by_code(&code).await?)
}

/// GET /api/me - The acting user's record.
pub async fn get_me(State(state): State<AppState>, ActingUser(me): ActingUser) -> ApiResult<User> {
    success(state.repo.get_user(&me).await?)
}

/// PUT /api/me - Edit the acting user's profile.
pub async fn update_me(
    State(state): State<AppState>,
    ActingUser(me): ActingUser,
    Json(request): Json<UpdateUserRequest>,
) -> ApiResult<User> {
    if let Some(name) = &request.name {
        require(name, "Name")?;
    }
    if let Some(email) = &request.email {
        require(email, "Email")?;
    }

    success(state.repo.update_user(&me, &request).await?)
}

/// POST /api/me/roles - Assign one of the acting user's system roles to them.
pub async fn assign_my_role(
    State(state): State<AppState>,
    ActingUser(me): ActingUser,
    Json(request): Json<AssignRoleRequest>,
) -> ApiResult<User> {
    require(&request.role_id, "Role id")?;

    success(state.repo.assign_system_role(&me, &request.role_id).await?)
}
