//! Team membership and invitation synchronization.
//!
//! An invitation lives in the inviter's ledger but its effects land in other
//! users' subtrees: the inviter's roster and the invitee's team registry.
//! Each workflow below runs in a single transaction, so an accept either
//! applies the status change and every membership write or none of them.

use serde::Serialize;

use crate::db::{invitations, roster, teams, users, Repository};
use crate::errors::AppError;
use crate::models::{
    AddMemberRequest, CreateInvitationRequest, Invitation, NewInvitation, Resolution, Team,
    TeamMember,
};

/// What an accepted invitation changed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptOutcome {
    pub invitation: Invitation,
    /// Roster entries written, in write order.
    pub roster_entries: Vec<TeamMember>,
    /// Registry entry now held by the invitee, for team invitations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirrored_team: Option<Team>,
}

fn ensure_addressed_to(invitation: &Invitation, user_id: &str) -> Result<(), AppError> {
    if invitation.invitee_id != user_id {
        return Err(AppError::Forbidden(format!(
            "Invitation {} is not addressed to you",
            invitation.id
        )));
    }
    Ok(())
}

fn ensure_pending(invitation: &Invitation) -> Result<(), AppError> {
    if !invitation.is_pending() {
        return Err(AppError::Conflict(format!(
            "Invitation {} is already {}",
            invitation.id,
            invitation.status.as_str()
        )));
    }
    Ok(())
}

/// Issue an invitation from `inviter_id` to the user named by code or id.
pub async fn issue(
    repo: &Repository,
    inviter_id: &str,
    request: &CreateInvitationRequest,
) -> Result<Invitation, AppError> {
    let role = request.role.trim();
    if role.is_empty() {
        return Err(AppError::Validation("Role is required".to_string()));
    }

    let mut tx = repo.begin_immediate().await?;
    let inviter = users::get_user(&mut tx, inviter_id).await?;

    let invitee = match (&request.invitee_code, &request.invitee_id) {
        (Some(_), Some(_)) => {
            return Err(AppError::Validation(
                "Give either inviteeCode or inviteeId, not both".to_string(),
            ))
        }
        (Some(code), None) => users::lookup_by_code(&mut tx, code)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No user with code {}", code.trim())))?,
        (None, Some(id)) => users::get_user(&mut tx, id).await?,
        (None, None) => {
            return Err(AppError::Validation(
                "inviteeCode or inviteeId is required".to_string(),
            ))
        }
    };
    if invitee.id == inviter.id {
        return Err(AppError::Validation("You cannot invite yourself".to_string()));
    }

    let team = match request.team_id.as_deref() {
        Some(team_id) => Some(teams::get_owned_team(&mut tx, inviter_id, team_id).await?),
        None => None,
    };
    let team_id = team.as_ref().map(|t| t.id.clone());

    let duplicate = invitations::list_pending_for_invitee(&mut tx, inviter_id, &invitee.id)
        .await?
        .into_iter()
        .any(|pending| pending.team_id == team_id);
    if duplicate {
        return Err(AppError::Conflict(format!(
            "{} already has a pending invitation from you for this team",
            invitee.display_name()
        )));
    }

    let invitation = invitations::create(
        &mut tx,
        inviter_id,
        NewInvitation {
            inviter_name: inviter.display_name().to_string(),
            inviter_email: Some(inviter.email.clone()),
            invitee_id: invitee.id.clone(),
            invitee_name: invitee.display_name().to_string(),
            role: role.to_string(),
            team_id,
            team_name: team.map(|t| t.name),
        },
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        "Invitation {} issued by {} to {}",
        invitation.id,
        inviter_id,
        invitation.invitee_id
    );
    Ok(invitation)
}

/// Accept an invitation on behalf of its invitee and apply the membership writes.
///
/// Team invitations put the invitee on the inviter's roster and mirror the team
/// into the invitee's registry. Team-less invitations put each user on the
/// other's roster.
pub async fn accept(
    repo: &Repository,
    invitee_id: &str,
    inviter_id: &str,
    invitation_id: &str,
) -> Result<AcceptOutcome, AppError> {
    let mut tx = repo.begin_immediate().await?;

    let pending = invitations::get(&mut tx, inviter_id, invitation_id).await?;
    ensure_addressed_to(&pending, invitee_id)?;
    ensure_pending(&pending)?;

    let invitation =
        invitations::set_status(&mut tx, inviter_id, invitation_id, Resolution::Accepted).await?;
    let invitee = users::get_user(&mut tx, invitee_id).await?;
    let invitee_entry = AddMemberRequest {
        name: invitee.display_name().to_string(),
        email: invitee.email.clone(),
        role: invitation.role.clone(),
    };

    let mut roster_entries = Vec::new();
    let mirrored_team = match invitation.team_id.as_deref() {
        Some(team_id) => {
            roster_entries.push(roster::add_member(&mut tx, inviter_id, &invitee_entry).await?);
            let team = teams::get_owned_team(&mut tx, inviter_id, team_id).await?;
            Some(teams::mirror_team_to_member(&mut tx, invitee_id, &team).await?)
        }
        None => {
            let inviter_entry = AddMemberRequest {
                name: invitation.inviter_name.clone(),
                email: invitation.inviter_email.clone().unwrap_or_default(),
                role: invitation.role.clone(),
            };
            roster_entries.push(roster::add_member(&mut tx, invitee_id, &inviter_entry).await?);
            roster_entries.push(roster::add_member(&mut tx, inviter_id, &invitee_entry).await?);
            None
        }
    };

    tx.commit().await?;

    tracing::info!(
        "Invitation {} accepted by {} ({} roster entries, team mirrored: {})",
        invitation.id,
        invitee_id,
        roster_entries.len(),
        mirrored_team.is_some()
    );
    Ok(AcceptOutcome {
        invitation,
        roster_entries,
        mirrored_team,
    })
}

/// Reject an invitation on behalf of its invitee. Nothing else changes.
pub async fn reject(
    repo: &Repository,
    invitee_id: &str,
    inviter_id: &str,
    invitation_id: &str,
) -> Result<Invitation, AppError> {
    let mut tx = repo.begin_immediate().await?;

    let pending = invitations::get(&mut tx, inviter_id, invitation_id).await?;
    ensure_addressed_to(&pending, invitee_id)?;
    ensure_pending(&pending)?;

    let invitation =
        invitations::set_status(&mut tx, inviter_id, invitation_id, Resolution::Rejected).await?;
    tx.commit().await?;

    tracing::info!("Invitation {} rejected by {}", invitation.id, invitee_id);
    Ok(invitation)
}

/// Withdraw a pending invitation from the inviter's own ledger.
///
/// Only `inviter_id`'s ledger is addressed, so nobody else can cancel it.
/// Returns `None` when there is no such invitation.
pub async fn cancel(
    repo: &Repository,
    inviter_id: &str,
    invitation_id: &str,
) -> Result<Option<Invitation>, AppError> {
    let mut tx = repo.begin_immediate().await?;

    let Some(invitation) = invitations::find(&mut tx, inviter_id, invitation_id).await? else {
        return Ok(None);
    };
    ensure_pending(&invitation)?;

    invitations::delete(&mut tx, inviter_id, invitation_id).await?;
    tx.commit().await?;

    tracing::info!("Invitation {} cancelled by {}", invitation_id, inviter_id);
    Ok(Some(invitation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{documents, test_repository};
    use crate::models::{
        CreateTeamRequest, CreateUserRequest, InvitationStatus, ReceivedInvitation, User,
        OWNER_ROLE,
    };

    async fn register(repo: &Repository, name: &str) -> User {
        repo.create_user(&CreateUserRequest {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            display_name: None,
        })
        .await
        .unwrap()
    }

    async fn engineering(repo: &Repository, owner: &User) -> Team {
        repo.create_team(
            &owner.id,
            &owner.name,
            &owner.email,
            &CreateTeamRequest {
                name: "Engineering".to_string(),
                description: String::new(),
            },
        )
        .await
        .unwrap()
    }

    fn invite(invitee: &User, team: Option<&Team>) -> CreateInvitationRequest {
        CreateInvitationRequest {
            invitee_code: Some(invitee.code.clone()),
            invitee_id: None,
            role: "Member".to_string(),
            team_id: team.map(|t| t.id.clone()),
        }
    }

    #[tokio::test]
    async fn test_accept_team_invitation() {
        let (repo, _dir) = test_repository().await;
        let alice = register(&repo, "Alice").await;
        let bob = register(&repo, "Bob").await;
        let team = engineering(&repo, &alice).await;

        let invitation = issue(&repo, &alice.id, &invite(&bob, Some(&team))).await.unwrap();
        assert_eq!(invitation.team_name.as_deref(), Some("Engineering"));
        assert_eq!(invitation.inviter_name, "Alice");

        let outcome = accept(&repo, &bob.id, &alice.id, &invitation.id).await.unwrap();
        assert_eq!(outcome.invitation.status, InvitationStatus::Accepted);

        let roster = repo.list_members(&alice.id).await.unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].role, OWNER_ROLE);
        assert_eq!(roster[1].name, "Bob");
        assert_eq!(roster[1].role, "Member");

        let bobs_teams = repo.list_teams_for(&bob.id).await.unwrap();
        assert_eq!(bobs_teams.len(), 1);
        assert_eq!(bobs_teams[0].id, team.id);
        assert_eq!(bobs_teams[0].name, "Engineering");
        assert_eq!(outcome.mirrored_team.map(|t| t.id), Some(team.id));

        // Legacy mutual insert does not happen on the team path
        assert!(repo.list_members(&bob.id).await.unwrap().is_empty());
        assert!(repo.list_all_pending_for_invitee(&bob.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_accept_teamless_invitation_is_mutual() {
        let (repo, _dir) = test_repository().await;
        let alice = register(&repo, "Alice").await;
        let bob = register(&repo, "Bob").await;

        let invitation = issue(&repo, &alice.id, &invite(&bob, None)).await.unwrap();
        let outcome = accept(&repo, &bob.id, &alice.id, &invitation.id).await.unwrap();
        assert_eq!(outcome.roster_entries.len(), 2);
        assert!(outcome.mirrored_team.is_none());

        let alices = repo.list_members(&alice.id).await.unwrap();
        let bobs = repo.list_members(&bob.id).await.unwrap();
        assert!(alices.iter().any(|m| m.email == bob.email));
        assert!(bobs.iter().any(|m| m.email == alice.email));
    }

    #[tokio::test]
    async fn test_accept_twice_does_not_duplicate_membership() {
        let (repo, _dir) = test_repository().await;
        let alice = register(&repo, "Alice").await;
        let bob = register(&repo, "Bob").await;
        let team = engineering(&repo, &alice).await;
        let invitation = issue(&repo, &alice.id, &invite(&bob, Some(&team))).await.unwrap();

        accept(&repo, &bob.id, &alice.id, &invitation.id).await.unwrap();
        let again = accept(&repo, &bob.id, &alice.id, &invitation.id).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));

        assert_eq!(repo.list_members(&alice.id).await.unwrap().len(), 2);
        let rejected = reject(&repo, &bob.id, &alice.id, &invitation.id).await;
        assert!(matches!(rejected, Err(AppError::Conflict(_))));
        let stored = repo.get_invitation(&alice.id, &invitation.id).await.unwrap();
        assert_eq!(stored.status, InvitationStatus::Accepted);
    }

    #[tokio::test]
    async fn test_failed_accept_rolls_back_status() {
        let (repo, _dir) = test_repository().await;
        let alice = register(&repo, "Alice").await;
        let bob = register(&repo, "Bob").await;
        let team = engineering(&repo, &alice).await;
        let invitation = issue(&repo, &alice.id, &invite(&bob, Some(&team))).await.unwrap();

        repo.delete_team(&alice.id, &team.id).await.unwrap();
        let result = accept(&repo, &bob.id, &alice.id, &invitation.id).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let stored = repo.get_invitation(&alice.id, &invitation.id).await.unwrap();
        assert_eq!(stored.status, InvitationStatus::Pending);
        // Only the owner entry from team creation
        assert_eq!(repo.list_members(&alice.id).await.unwrap().len(), 1);
        assert!(repo.list_teams_for(&bob.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_only_invitee_may_resolve() {
        let (repo, _dir) = test_repository().await;
        let alice = register(&repo, "Alice").await;
        let bob = register(&repo, "Bob").await;
        let carol = register(&repo, "Carol").await;
        let invitation = issue(&repo, &alice.id, &invite(&bob, None)).await.unwrap();

        let result = accept(&repo, &carol.id, &alice.id, &invitation.id).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
        let result = reject(&repo, &alice.id, &alice.id, &invitation.id).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_reject_has_no_side_effects() {
        let (repo, _dir) = test_repository().await;
        let alice = register(&repo, "Alice").await;
        let bob = register(&repo, "Bob").await;
        let team = engineering(&repo, &alice).await;
        let invitation = issue(&repo, &alice.id, &invite(&bob, Some(&team))).await.unwrap();

        let rejected = reject(&repo, &bob.id, &alice.id, &invitation.id).await.unwrap();
        assert_eq!(rejected.status, InvitationStatus::Rejected);
        assert!(rejected.updated_at > invitation.updated_at);

        assert_eq!(repo.list_members(&alice.id).await.unwrap().len(), 1);
        assert!(repo.list_members(&bob.id).await.unwrap().is_empty());
        assert!(repo.list_teams_for(&bob.id).await.unwrap().is_empty());
        assert!(repo.list_all_pending_for_invitee(&bob.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_is_scoped_to_inviter() {
        let (repo, _dir) = test_repository().await;
        let alice = register(&repo, "Alice").await;
        let bob = register(&repo, "Bob").await;
        let invitation = issue(&repo, &alice.id, &invite(&bob, None)).await.unwrap();

        // Bob addresses his own ledger, which does not hold it
        assert!(cancel(&repo, &bob.id, &invitation.id).await.unwrap().is_none());
        assert_eq!(repo.list_sent_invitations(&alice.id).await.unwrap().len(), 1);

        let cancelled = cancel(&repo, &alice.id, &invitation.id).await.unwrap();
        assert_eq!(cancelled.map(|i| i.id), Some(invitation.id.clone()));
        assert!(repo.list_sent_invitations(&alice.id).await.unwrap().is_empty());
        assert!(repo.list_received_invitations(&bob.id).await.unwrap().is_empty());
        assert!(cancel(&repo, &alice.id, &invitation.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancel_resolved_invitation_conflicts() {
        let (repo, _dir) = test_repository().await;
        let alice = register(&repo, "Alice").await;
        let bob = register(&repo, "Bob").await;
        let invitation = issue(&repo, &alice.id, &invite(&bob, None)).await.unwrap();
        reject(&repo, &bob.id, &alice.id, &invitation.id).await.unwrap();

        let result = cancel(&repo, &alice.id, &invitation.id).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(repo.list_sent_invitations(&alice.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_issue_guards() {
        let (repo, _dir) = test_repository().await;
        let alice = register(&repo, "Alice").await;
        let bob = register(&repo, "Bob").await;
        let team = engineering(&repo, &alice).await;
        let bobs_team = engineering(&repo, &bob).await;

        let to_self = issue(&repo, &alice.id, &invite(&alice, None)).await;
        assert!(matches!(to_self, Err(AppError::Validation(_))));

        let mut blank_role = invite(&bob, None);
        blank_role.role = "  ".to_string();
        assert!(matches!(
            issue(&repo, &alice.id, &blank_role).await,
            Err(AppError::Validation(_))
        ));

        let mut unknown = invite(&bob, None);
        unknown.invitee_code = Some("ZZZZZZZZ".to_string());
        assert!(matches!(
            issue(&repo, &alice.id, &unknown).await,
            Err(AppError::NotFound(_))
        ));

        let mut both = invite(&bob, None);
        both.invitee_id = Some(bob.id.clone());
        assert!(matches!(
            issue(&repo, &alice.id, &both).await,
            Err(AppError::Validation(_))
        ));

        let foreign_team = issue(&repo, &alice.id, &invite(&bob, Some(&bobs_team))).await;
        assert!(matches!(foreign_team, Err(AppError::NotFound(_))));

        issue(&repo, &alice.id, &invite(&bob, Some(&team))).await.unwrap();
        let duplicate = issue(&repo, &alice.id, &invite(&bob, Some(&team))).await;
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));

        // A different team (here: none) is a different invitation
        issue(&repo, &alice.id, &invite(&bob, None)).await.unwrap();
        assert_eq!(repo.list_all_pending_for_invitee(&bob.id).await.unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_accepts_one_wins() {
        let (repo, _dir) = test_repository().await;
        let alice = register(&repo, "Alice").await;
        let bob = register(&repo, "Bob").await;
        let team = engineering(&repo, &alice).await;

        for _ in 0..10 {
            let invitation = issue(&repo, &alice.id, &invite(&bob, Some(&team))).await.unwrap();
            let (first, second) = tokio::join!(
                accept(&repo, &bob.id, &alice.id, &invitation.id),
                accept(&repo, &bob.id, &alice.id, &invitation.id),
            );
            let results = [first.map(|_| ()), second.map(|_| ())];
            assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
            assert_eq!(
                results
                    .iter()
                    .filter(|r| matches!(r, Err(AppError::Conflict(_))))
                    .count(),
                1
            );
        }

        // Owner plus one entry per accepted invitation
        assert_eq!(repo.list_members(&alice.id).await.unwrap().len(), 11);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_duplicate_issue_conflicts() {
        let (repo, _dir) = test_repository().await;
        let alice = register(&repo, "Alice").await;
        let bob = register(&repo, "Bob").await;
        let team = engineering(&repo, &alice).await;
        let request = invite(&bob, Some(&team));

        let (first, second) = tokio::join!(
            issue(&repo, &alice.id, &request),
            issue(&repo, &alice.id, &request),
        );
        let results = [first.map(|_| ()), second.map(|_| ())];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(AppError::Conflict(_)))));
        assert_eq!(repo.list_all_pending_for_invitee(&bob.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rebuild_index_from_ledgers() {
        let (repo, _dir) = test_repository().await;
        let alice = register(&repo, "Alice").await;
        let bob = register(&repo, "Bob").await;
        let carol = register(&repo, "Carol").await;
        issue(&repo, &alice.id, &invite(&bob, None)).await.unwrap();
        issue(&repo, &carol.id, &invite(&bob, None)).await.unwrap();
        issue(&repo, &bob.id, &invite(&alice, None)).await.unwrap();

        {
            let mut conn = repo.conn().await.unwrap();
            documents::delete_collection_group(&mut conn, ReceivedInvitation::COLLECTION)
                .await
                .unwrap();
        }
        assert!(repo.list_all_pending_for_invitee(&bob.id).await.unwrap().is_empty());

        assert_eq!(repo.rebuild_invitee_index().await.unwrap(), 3);
        assert_eq!(repo.list_all_pending_for_invitee(&bob.id).await.unwrap().len(), 2);
        assert_eq!(repo.list_all_pending_for_invitee(&alice.id).await.unwrap().len(), 1);
        assert!(repo.list_all_pending_for_invitee(&carol.id).await.unwrap().is_empty());
    }
}
