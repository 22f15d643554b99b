//! Role definitions under `users/{ownerId}/system_roles` and `.../project_roles`.

use chrono::Utc;
use sqlx::SqliteConnection;

use super::{documents, Repository};
use crate::errors::AppError;
use crate::models::{CreateRoleRequest, Role, RoleKind, DEFAULT_SYSTEM_ROLE};

pub async fn list_roles(
    conn: &mut SqliteConnection,
    owner_id: &str,
    kind: RoleKind,
) -> Result<Vec<Role>, AppError> {
    let collection = documents::subcollection(owner_id, kind.collection())?;
    documents::list(conn, &collection).await
}

pub async fn get_role(
    conn: &mut SqliteConnection,
    owner_id: &str,
    kind: RoleKind,
    role_id: &str,
) -> Result<Option<Role>, AppError> {
    let collection = documents::subcollection(owner_id, kind.collection())?;
    documents::get(conn, &collection, role_id).await
}

pub async fn create_role(
    conn: &mut SqliteConnection,
    owner_id: &str,
    kind: RoleKind,
    request: &CreateRoleRequest,
) -> Result<Role, AppError> {
    let collection = documents::subcollection(owner_id, kind.collection())?;
    let now = Utc::now();
    let role = Role {
        id: uuid::Uuid::new_v4().to_string(),
        name: request.name.trim().to_string(),
        description: request.description.clone(),
        permissions: request.permissions.clone(),
        created_at: now,
        updated_at: now,
    };

    documents::insert(conn, &collection, &role.id, &role).await?;
    Ok(role)
}

pub async fn delete_role(
    conn: &mut SqliteConnection,
    owner_id: &str,
    kind: RoleKind,
    role_id: &str,
) -> Result<bool, AppError> {
    let collection = documents::subcollection(owner_id, kind.collection())?;
    documents::delete(conn, &collection, role_id).await
}

/// Make sure the user owns the default system role, returning it.
///
/// Whether initialization already happened is read from the store, so
/// repeated calls (or concurrent sessions of the same user) converge on one role.
pub async fn ensure_default_roles(
    conn: &mut SqliteConnection,
    owner_id: &str,
) -> Result<Role, AppError> {
    let existing = list_roles(conn, owner_id, RoleKind::System)
        .await?
        .into_iter()
        .find(|role| role.name == DEFAULT_SYSTEM_ROLE);

    if let Some(role) = existing {
        return Ok(role);
    }

    tracing::debug!("Creating default system role for user {}", owner_id);
    let request = CreateRoleRequest {
        name: DEFAULT_SYSTEM_ROLE.to_string(),
        description: Some("Full access to own projects and teams".to_string()),
        permissions: vec!["*".to_string()],
    };
    create_role(conn, owner_id, RoleKind::System, &request).await
}

impl Repository {
    pub async fn list_roles(&self, owner_id: &str, kind: RoleKind) -> Result<Vec<Role>, AppError> {
        let mut conn = self.conn().await?;
        list_roles(&mut conn, owner_id, kind).await
    }

    pub async fn create_role(
        &self,
        owner_id: &str,
        kind: RoleKind,
        request: &CreateRoleRequest,
    ) -> Result<Role, AppError> {
        let mut conn = self.conn().await?;
        create_role(&mut conn, owner_id, kind, request).await
    }

    pub async fn delete_role(
        &self,
        owner_id: &str,
        kind: RoleKind,
        role_id: &str,
    ) -> Result<bool, AppError> {
        let mut conn = self.conn().await?;
        delete_role(&mut conn, owner_id, kind, role_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_repository;

    #[tokio::test]
    async fn test_ensure_default_roles_is_idempotent() {
        let (repo, _dir) = test_repository().await;
        let mut conn = repo.conn().await.unwrap();

        let first = ensure_default_roles(&mut conn, "u1").await.unwrap();
        let second = ensure_default_roles(&mut conn, "u1").await.unwrap();
        assert_eq!(first.id, second.id);

        let roles = list_roles(&mut conn, "u1", RoleKind::System).await.unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].name, DEFAULT_SYSTEM_ROLE);

        let other = list_roles(&mut conn, "u2", RoleKind::System).await.unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_role_kinds_are_separate_collections() {
        let (repo, _dir) = test_repository().await;
        let request = CreateRoleRequest {
            name: "Reviewer".to_string(),
            description: None,
            permissions: vec!["tasks:read".to_string()],
        };

        let role = repo.create_role("u1", RoleKind::Project, &request).await.unwrap();
        assert!(repo.list_roles("u1", RoleKind::System).await.unwrap().is_empty());
        assert_eq!(repo.list_roles("u1", RoleKind::Project).await.unwrap(), vec![role.clone()]);

        assert!(repo.delete_role("u1", RoleKind::Project, &role.id).await.unwrap());
        assert!(!repo.delete_role("u1", RoleKind::Project, &role.id).await.unwrap());
    }
}
