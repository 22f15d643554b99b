//! Team Membership Roster: the flat member list at `users/{ownerId}/team`.

use chrono::Utc;
use sqlx::SqliteConnection;

use super::{documents, Repository};
use crate::errors::AppError;
use crate::models::{AddMemberRequest, TeamMember};

pub async fn list_members(
    conn: &mut SqliteConnection,
    owner_id: &str,
) -> Result<Vec<TeamMember>, AppError> {
    let collection = documents::subcollection(owner_id, TeamMember::COLLECTION)?;
    documents::list(conn, &collection).await
}

pub async fn add_member(
    conn: &mut SqliteConnection,
    owner_id: &str,
    request: &AddMemberRequest,
) -> Result<TeamMember, AppError> {
    let collection = documents::subcollection(owner_id, TeamMember::COLLECTION)?;
    let now = Utc::now();
    let member = TeamMember {
        id: uuid::Uuid::new_v4().to_string(),
        name: request.name.trim().to_string(),
        email: request.email.trim().to_string(),
        role: request.role.trim().to_string(),
        created_at: now,
        updated_at: now,
    };

    documents::insert(conn, &collection, &member.id, &member).await?;
    tracing::debug!("Added {} to roster of {} as {}", member.name, owner_id, member.role);
    Ok(member)
}

/// Remove a roster entry. A missing entry counts as removed.
pub async fn remove_member(
    conn: &mut SqliteConnection,
    owner_id: &str,
    member_id: &str,
) -> Result<(), AppError> {
    let collection = documents::subcollection(owner_id, TeamMember::COLLECTION)?;
    if !documents::delete(conn, &collection, member_id).await? {
        tracing::debug!("Roster entry {} of {} was already gone", member_id, owner_id);
    }
    Ok(())
}

impl Repository {
    pub async fn list_members(&self, owner_id: &str) -> Result<Vec<TeamMember>, AppError> {
        let mut conn = self.conn().await?;
        list_members(&mut conn, owner_id).await
    }

    pub async fn add_member(
        &self,
        owner_id: &str,
        request: &AddMemberRequest,
    ) -> Result<TeamMember, AppError> {
        let mut conn = self.conn().await?;
        add_member(&mut conn, owner_id, request).await
    }

    pub async fn remove_member(&self, owner_id: &str, member_id: &str) -> Result<(), AppError> {
        let mut conn = self.conn().await?;
        remove_member(&mut conn, owner_id, member_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_repository;

    #[tokio::test]
    async fn test_roster_add_list_remove() {
        let (repo, _dir) = test_repository().await;
        let request = AddMemberRequest {
            name: " Ece ".to_string(),
            email: "ece@example.com".to_string(),
            role: "Developer".to_string(),
        };

        let member = repo.add_member("owner", &request).await.unwrap();
        assert_eq!(member.name, "Ece");

        let members = repo.list_members("owner").await.unwrap();
        assert_eq!(members, vec![member.clone()]);
        assert!(repo.list_members("someone-else").await.unwrap().is_empty());

        repo.remove_member("owner", &member.id).await.unwrap();
        // Removing again is not an error
        repo.remove_member("owner", &member.id).await.unwrap();
        assert!(repo.list_members("owner").await.unwrap().is_empty());
    }
}
