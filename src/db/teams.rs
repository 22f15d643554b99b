//! Team Registry at `users/{userId}/teams`.
//!
//! The owner's path holds the authoritative record; each member holds a mirror
//! with the same id. Mirrors are snapshots taken when the member joined: edits
//! and deletes only touch the owner's copy.

use chrono::Utc;
use sqlx::SqliteConnection;

use super::{documents, roster, Repository};
use crate::errors::AppError;
use crate::models::{AddMemberRequest, CreateTeamRequest, Team, UpdateTeamRequest, OWNER_ROLE};

/// Every registry entry under a user: owned teams and mirrors of joined ones.
pub async fn list_teams_for(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Vec<Team>, AppError> {
    let collection = documents::subcollection(user_id, Team::COLLECTION)?;
    documents::list(conn, &collection).await
}

pub async fn list_owned_teams(
    conn: &mut SqliteConnection,
    owner_id: &str,
) -> Result<Vec<Team>, AppError> {
    let collection = documents::subcollection(owner_id, Team::COLLECTION)?;
    documents::query_eq(conn, &collection, "ownerId", owner_id).await
}

/// Registry entry `team_id` under `user_id`, authoritative or mirror.
pub async fn get_team(
    conn: &mut SqliteConnection,
    user_id: &str,
    team_id: &str,
) -> Result<Option<Team>, AppError> {
    let collection = documents::subcollection(user_id, Team::COLLECTION)?;
    documents::get(conn, &collection, team_id).await
}

/// The authoritative record of a team owned by `owner_id`.
pub async fn get_owned_team(
    conn: &mut SqliteConnection,
    owner_id: &str,
    team_id: &str,
) -> Result<Team, AppError> {
    match get_team(conn, owner_id, team_id).await? {
        Some(team) if !team.is_mirror_for(owner_id) => Ok(team),
        Some(_) => Err(AppError::Forbidden(format!(
            "Team {} is owned by another user",
            team_id
        ))),
        None => Err(AppError::NotFound(format!("Team {} not found", team_id))),
    }
}

pub async fn create_team(
    conn: &mut SqliteConnection,
    owner_id: &str,
    request: &CreateTeamRequest,
) -> Result<Team, AppError> {
    let collection = documents::subcollection(owner_id, Team::COLLECTION)?;
    let now = Utc::now();
    let team = Team {
        id: uuid::Uuid::new_v4().to_string(),
        name: request.name.trim().to_string(),
        description: request.description.trim().to_string(),
        owner_id: owner_id.to_string(),
        created_at: now,
        updated_at: now,
    };

    documents::insert(conn, &collection, &team.id, &team).await?;
    Ok(team)
}

/// Copy `team` into the member's registry unless an entry with its id is already there.
pub async fn mirror_team_to_member(
    conn: &mut SqliteConnection,
    member_id: &str,
    team: &Team,
) -> Result<Team, AppError> {
    if let Some(existing) = get_team(conn, member_id, &team.id).await? {
        tracing::debug!("Team {} already in registry of {}", team.id, member_id);
        return Ok(existing);
    }

    let collection = documents::subcollection(member_id, Team::COLLECTION)?;
    let mirror = team.mirror_copy();
    documents::insert(conn, &collection, &mirror.id, &mirror).await?;
    Ok(mirror)
}

pub async fn update_team(
    conn: &mut SqliteConnection,
    owner_id: &str,
    team_id: &str,
    request: &UpdateTeamRequest,
) -> Result<Team, AppError> {
    let mut team = get_owned_team(conn, owner_id, team_id).await?;

    if let Some(name) = &request.name {
        team.name = name.trim().to_string();
    }
    if let Some(description) = &request.description {
        team.description = description.trim().to_string();
    }
    team.updated_at = Utc::now();

    let collection = documents::subcollection(owner_id, Team::COLLECTION)?;
    documents::put(conn, &collection, &team.id, &team).await?;
    Ok(team)
}

pub async fn delete_team(
    conn: &mut SqliteConnection,
    owner_id: &str,
    team_id: &str,
) -> Result<(), AppError> {
    get_owned_team(conn, owner_id, team_id).await?;
    let collection = documents::subcollection(owner_id, Team::COLLECTION)?;
    documents::delete(conn, &collection, team_id).await?;
    Ok(())
}

impl Repository {
    pub async fn list_owned_teams(&self, owner_id: &str) -> Result<Vec<Team>, AppError> {
        let mut conn = self.conn().await?;
        list_owned_teams(&mut conn, owner_id).await
    }

    pub async fn list_teams_for(&self, user_id: &str) -> Result<Vec<Team>, AppError> {
        let mut conn = self.conn().await?;
        list_teams_for(&mut conn, user_id).await
    }

    pub async fn get_team(&self, user_id: &str, team_id: &str) -> Result<Option<Team>, AppError> {
        let mut conn = self.conn().await?;
        get_team(&mut conn, user_id, team_id).await
    }

    /// Create a team and put its creator on their own roster as owner.
    ///
    /// The roster write is a separate step: if it fails the team stays and the
    /// failure is only logged.
    pub async fn create_team(
        &self,
        owner_id: &str,
        owner_name: &str,
        owner_email: &str,
        request: &CreateTeamRequest,
    ) -> Result<Team, AppError> {
        let mut conn = self.conn().await?;
        let team = create_team(&mut conn, owner_id, request).await?;
        tracing::info!("Created team {} ({}) for {}", team.id, team.name, owner_id);

        let owner_entry = AddMemberRequest {
            name: owner_name.to_string(),
            email: owner_email.to_string(),
            role: OWNER_ROLE.to_string(),
        };
        if let Err(e) = roster::add_member(&mut conn, owner_id, &owner_entry).await {
            tracing::warn!("Team {} created but owner roster entry failed: {}", team.id, e);
        }

        Ok(team)
    }

    pub async fn update_team(
        &self,
        owner_id: &str,
        team_id: &str,
        request: &UpdateTeamRequest,
    ) -> Result<Team, AppError> {
        let mut conn = self.conn().await?;
        update_team(&mut conn, owner_id, team_id, request).await
    }

    pub async fn delete_team(&self, owner_id: &str, team_id: &str) -> Result<(), AppError> {
        let mut conn = self.conn().await?;
        delete_team(&mut conn, owner_id, team_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_repository;

    fn engineering() -> CreateTeamRequest {
        CreateTeamRequest {
            name: "Engineering".to_string(),
            description: "Builds things".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_team_adds_owner_to_roster() {
        let (repo, _dir) = test_repository().await;

        let team = repo
            .create_team("alice", "Alice", "alice@example.com", &engineering())
            .await
            .unwrap();
        assert_eq!(team.owner_id, "alice");

        let roster = repo.list_members("alice").await.unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].role, OWNER_ROLE);
        assert_eq!(roster[0].name, "Alice");

        assert_eq!(repo.list_owned_teams("alice").await.unwrap(), vec![team]);
    }

    #[tokio::test]
    async fn test_create_team_survives_roster_failure() {
        let (repo, _dir) = test_repository().await;
        {
            let mut conn = repo.conn().await.unwrap();
            sqlx::query(
                r#"
                CREATE TRIGGER reject_roster BEFORE INSERT ON documents
                WHEN NEW.collection_id = 'team'
                BEGIN SELECT RAISE(ABORT, 'roster unavailable'); END;
                "#,
            )
            .execute(&mut *conn)
            .await
            .unwrap();
        }

        let team = repo
            .create_team("alice", "Alice", "alice@example.com", &engineering())
            .await
            .unwrap();

        assert_eq!(repo.list_owned_teams("alice").await.unwrap(), vec![team]);
        assert!(repo.list_members("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mirror_is_idempotent_and_keeps_first_copy() {
        let (repo, _dir) = test_repository().await;
        let team = repo
            .create_team("alice", "Alice", "alice@example.com", &engineering())
            .await
            .unwrap();

        let mut conn = repo.conn().await.unwrap();
        let first = mirror_team_to_member(&mut conn, "bob", &team).await.unwrap();

        let mut renamed = team.clone();
        renamed.name = "Platform".to_string();
        let second = mirror_team_to_member(&mut conn, "bob", &renamed).await.unwrap();
        drop(conn);

        assert_eq!(second, first);
        let bobs = repo.list_teams_for("bob").await.unwrap();
        assert_eq!(bobs.len(), 1);
        assert_eq!(bobs[0].name, "Engineering");
        assert!(bobs[0].is_mirror_for("bob"));
        assert!(repo.list_owned_teams("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete_do_not_touch_mirrors() {
        let (repo, _dir) = test_repository().await;
        let team = repo
            .create_team("alice", "Alice", "alice@example.com", &engineering())
            .await
            .unwrap();
        {
            let mut conn = repo.conn().await.unwrap();
            mirror_team_to_member(&mut conn, "bob", &team).await.unwrap();
        }

        let updated = repo
            .update_team(
                "alice",
                &team.id,
                &UpdateTeamRequest {
                    name: Some("Platform".to_string()),
                    description: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Platform");
        assert_eq!(updated.description, "Builds things");

        let mirror = repo.get_team("bob", &team.id).await.unwrap().unwrap();
        assert_eq!(mirror.name, "Engineering");

        // A member cannot edit the team through their mirror
        let err = repo
            .update_team("bob", &team.id, &UpdateTeamRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        repo.delete_team("alice", &team.id).await.unwrap();
        assert!(repo.get_team("alice", &team.id).await.unwrap().is_none());
        assert!(repo.get_team("bob", &team.id).await.unwrap().is_some());

        assert!(matches!(
            repo.delete_team("alice", &team.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
