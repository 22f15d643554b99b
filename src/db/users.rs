//! User Directory: `users/{id}` records and share-code lookup.

use chrono::Utc;
use sqlx::SqliteConnection;

use super::{documents, roles, Repository};
use crate::errors::AppError;
use crate::models::{
    normalize_code, CreateUserRequest, RoleKind, UpdateUserRequest, User, CODE_LEN,
};

/// Attempts at drawing a share code nobody holds yet.
const CODE_ATTEMPTS: usize = 8;

/// Find a user by id.
pub async fn find_user(conn: &mut SqliteConnection, id: &str) -> Result<Option<User>, AppError> {
    documents::get(conn, User::COLLECTION, id).await
}

/// Get a user by id, failing with `NotFound` when absent.
pub async fn get_user(conn: &mut SqliteConnection, id: &str) -> Result<User, AppError> {
    find_user(conn, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
}

/// Look a user up by share code. Absence is `None`; if several users somehow
/// share a code, the oldest wins.
pub async fn lookup_by_code(
    conn: &mut SqliteConnection,
    raw_code: &str,
) -> Result<Option<User>, AppError> {
    let code = normalize_code(raw_code).ok_or_else(|| {
        AppError::Validation(format!(
            "User code must be {} letters or digits",
            CODE_LEN
        ))
    })?;

    let mut found: Vec<User> =
        documents::query_eq(conn, User::COLLECTION, "code", &code).await?;
    if found.len() > 1 {
        tracing::warn!("{} users share code {}, using the first", found.len(), code);
    }

    Ok(if found.is_empty() {
        None
    } else {
        Some(found.swap_remove(0))
    })
}

pub async fn list_users(conn: &mut SqliteConnection) -> Result<Vec<User>, AppError> {
    documents::list(conn, User::COLLECTION).await
}

fn draw_code() -> String {
    let raw = uuid::Uuid::new_v4().simple().to_string();
    raw[..CODE_LEN].to_ascii_uppercase()
}

async fn generate_unique_code(conn: &mut SqliteConnection) -> Result<String, AppError> {
    for _ in 0..CODE_ATTEMPTS {
        let code = draw_code();
        if lookup_by_code(conn, &code).await?.is_none() {
            return Ok(code);
        }
    }
    Err(AppError::Internal(
        "Could not allocate a unique user code".to_string(),
    ))
}

/// Register a user, giving them a fresh share code and the default system role.
pub async fn create_user(
    conn: &mut SqliteConnection,
    request: &CreateUserRequest,
) -> Result<User, AppError> {
    let now = Utc::now();
    let mut user = User {
        id: uuid::Uuid::new_v4().to_string(),
        name: request.name.trim().to_string(),
        email: request.email.trim().to_string(),
        display_name: request.display_name.clone(),
        code: generate_unique_code(conn).await?,
        system_role_ids: Vec::new(),
        project_roles: Vec::new(),
        created_at: now,
        updated_at: now,
    };
    documents::insert(conn, User::COLLECTION, &user.id, &user).await?;

    let default_role = roles::ensure_default_roles(conn, &user.id).await?;
    user.system_role_ids.push(default_role.id);
    documents::put(conn, User::COLLECTION, &user.id, &user).await?;

    tracing::info!("Registered user {} with code {}", user.id, user.code);
    Ok(user)
}

pub async fn update_user(
    conn: &mut SqliteConnection,
    id: &str,
    request: &UpdateUserRequest,
) -> Result<User, AppError> {
    let mut user = get_user(conn, id).await?;

    if let Some(name) = &request.name {
        user.name = name.trim().to_string();
    }
    if let Some(email) = &request.email {
        user.email = email.trim().to_string();
    }
    if request.display_name.is_some() {
        user.display_name = request.display_name.clone();
    }
    user.updated_at = Utc::now();

    documents::put(conn, User::COLLECTION, &user.id, &user).await?;
    Ok(user)
}

/// Grant one of the user's own system roles to them.
pub async fn assign_system_role(
    conn: &mut SqliteConnection,
    user_id: &str,
    role_id: &str,
) -> Result<User, AppError> {
    let mut user = get_user(conn, user_id).await?;

    if roles::get_role(conn, user_id, RoleKind::System, role_id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound(format!("Role {} not found", role_id)));
    }

    if !user.system_role_ids.iter().any(|id| id == role_id) {
        user.system_role_ids.push(role_id.to_string());
        user.updated_at = Utc::now();
        documents::put(conn, User::COLLECTION, &user.id, &user).await?;
    }

    Ok(user)
}

impl Repository {
    pub async fn get_user(&self, id: &str) -> Result<User, AppError> {
        let mut conn = self.conn().await?;
        get_user(&mut conn, id).await
    }

    pub async fn lookup_by_code(&self, code: &str) -> Result<Option<User>, AppError> {
        let mut conn = self.conn().await?;
        lookup_by_code(&mut conn, code).await
    }

    pub async fn create_user(&self, request: &CreateUserRequest) -> Result<User, AppError> {
        let mut tx = self.begin_immediate().await?;
        let user = create_user(&mut tx, request).await?;
        tx.commit().await?;
        Ok(user)
    }

    pub async fn update_user(
        &self,
        id: &str,
        request: &UpdateUserRequest,
    ) -> Result<User, AppError> {
        let mut conn = self.conn().await?;
        update_user(&mut conn, id, request).await
    }

    pub async fn assign_system_role(&self, user_id: &str, role_id: &str) -> Result<User, AppError> {
        let mut conn = self.conn().await?;
        assign_system_role(&mut conn, user_id, role_id).await
    }
}
