use std::sync::Arc;

use axum::extract::FromRef;
use chrono::Utc;
use minder_core::{
    db::{
        errors::{TeamLimitReached, is_unique_violation},
        team_repo::{TransferOutcome, UpdateMemberParams},
    },
    membership::{MemberStatus, MembershipRequirement, TeamRole},
    team::{TeamRecord, TeamStore, UserTeamMembership},
    team_member::TeamMemberRecord,
};
use tracing::{info, warn};

use crate::{AppError, state::AppState};

#[derive(Debug, Clone, Default)]
pub struct TeamPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub avatar_url: Option<Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct InviteRequest {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub role: Option<TeamRole>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MemberPatch {
    pub role: Option<TeamRole>,
    pub status: Option<MemberStatus>,
}

/// Membership lifecycle and team management on top of [`TeamStore`].
pub struct TeamService {
    team_store: TeamStore,
    max_owned_teams: i64,
}

impl TeamService {
    pub fn new(team_store: TeamStore, max_owned_teams: i64) -> Self {
        Self {
            team_store,
            max_owned_teams,
        }
    }

    pub async fn fetch_team(&self, team_id: &str) -> Result<TeamRecord, AppError> {
        self.team_store
            .find_by_id(team_id)
            .await
            .map_err(AppError::from_anyhow)?
            .ok_or_else(|| AppError::team_not_found(team_id))
    }

    pub async fn find_membership(
        &self,
        team_id: &str,
        user_id: &str,
    ) -> Result<Option<TeamMemberRecord>, AppError> {
        self.team_store
            .get_member(team_id, user_id)
            .await
            .map_err(AppError::from_anyhow)
    }

    /// Loads the caller's membership and checks it against `requirement`.
    pub async fn require_membership(
        &self,
        team_id: &str,
        user_id: &str,
        requirement: &MembershipRequirement,
    ) -> Result<TeamMemberRecord, AppError> {
        let Some(member) = self.find_membership(team_id, user_id).await? else {
            return Err(AppError::team_access_denied(team_id));
        };

        if !requirement.statuses.contains(&member.status) {
            return Err(AppError::forbidden(
                "Your membership status prohibits this action.",
            ));
        }

        if !requirement.roles.contains(&member.role) {
            return Err(AppError::forbidden("Insufficient permissions for this action."));
        }

        Ok(member)
    }

    pub async fn ensure_personal_team(&self, user_id: &str) -> Result<TeamRecord, AppError> {
        self.team_store
            .ensure_personal_team(user_id)
            .await
            .map_err(AppError::from_anyhow)
    }

    pub async fn create_team(
        &self,
        owner_id: &str,
        name: &str,
        description: Option<&str>,
        avatar_url: Option<&str>,
    ) -> Result<TeamRecord, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::validation("Team name is required."));
        }

        self.team_store
            .create_within_limit(owner_id, name, description, avatar_url, self.max_owned_teams)
            .await
            .map_err(|err| {
                if err.downcast_ref::<TeamLimitReached>().is_some() {
                    AppError::forbidden(format!(
                        "You have reached the maximum limit of {} teams.",
                        self.max_owned_teams
                    ))
                    .with_name("TEAM_LIMIT_REACHED")
                } else {
                    AppError::from_anyhow(err)
                }
            })
    }

    pub async fn list_teams_for_user(
        &self,
        user_id: &str,
        include_pending: bool,
    ) -> Result<Vec<UserTeamMembership>, AppError> {
        self.team_store
            .list_for_user(user_id, include_pending)
            .await
            .map_err(AppError::from_anyhow)
    }

    pub async fn list_pending_invites(
        &self,
        user_id: &str,
    ) -> Result<Vec<UserTeamMembership>, AppError> {
        self.team_store
            .list_pending_invites(user_id)
            .await
            .map_err(AppError::from_anyhow)
    }

    pub async fn update_team(
        &self,
        team_id: &str,
        actor_id: &str,
        patch: TeamPatch,
    ) -> Result<TeamRecord, AppError> {
        self.require_membership(team_id, actor_id, &MembershipRequirement::managers())
            .await?;

        if patch.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(AppError::validation("Team name cannot be empty."));
        }

        self.team_store
            .update(
                team_id,
                patch.name.as_deref(),
                patch.description.as_ref().map(Option::as_deref),
                patch.avatar_url.as_ref().map(Option::as_deref),
            )
            .await
            .map_err(AppError::from_anyhow)?
            .ok_or_else(|| AppError::team_not_found(team_id))
    }

    pub async fn delete_team(&self, team_id: &str, actor_id: &str) -> Result<(), AppError> {
        let team = self.fetch_team(team_id).await?;
        self.require_membership(team_id, actor_id, &MembershipRequirement::owner())
            .await?;

        if team.is_personal {
            return Err(AppError::validation("Personal teams cannot be deleted."));
        }

        self.team_store
            .delete(team_id)
            .await
            .map_err(AppError::from_anyhow)?;
        info!(team_id, actor_id, "team deleted");
        Ok(())
    }

    /// Active and pending members, visible to any active member.
    pub async fn list_members(
        &self,
        team_id: &str,
        actor_id: &str,
    ) -> Result<Vec<TeamMemberRecord>, AppError> {
        self.require_membership(team_id, actor_id, &MembershipRequirement::default())
            .await?;

        self.team_store
            .list_members(team_id, &[MemberStatus::Active, MemberStatus::Pending])
            .await
            .map_err(AppError::from_anyhow)
    }

    /// Verifies the caller may work in `team_id` and records the selection.
    pub async fn select_team(
        &self,
        team_id: &str,
        user_id: &str,
    ) -> Result<TeamMemberRecord, AppError> {
        let member = self
            .require_membership(team_id, user_id, &MembershipRequirement::default())
            .await?;

        if let Err(error) = self.team_store.touch_last_used(team_id, user_id).await {
            warn!(team_id, user_id, ?error, "failed to record team selection");
        }

        Ok(member)
    }

    pub async fn invite_member(
        &self,
        team_id: &str,
        actor_id: &str,
        request: InviteRequest,
    ) -> Result<TeamMemberRecord, AppError> {
        let target_user_id = request
            .user_id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::validation("Target user is required."))?;
        let email = request
            .email
            .as_deref()
            .and_then(TeamStore::normalize_email)
            .ok_or_else(|| AppError::validation("Target email is required."))?;
        let role = request.role.unwrap_or(TeamRole::Member);
        if role == TeamRole::Owner {
            return Err(AppError::validation(
                "The owner role can only be granted through ownership transfer.",
            ));
        }

        let team = self.fetch_team(team_id).await?;
        if team.is_personal {
            return Err(AppError::validation(
                "Cannot invite members to personal teams.",
            ));
        }

        self.require_membership(team_id, actor_id, &MembershipRequirement::managers())
            .await?;

        let existing = self.find_membership(team_id, target_user_id).await?;
        let now = Utc::now().timestamp();

        let member = match existing {
            Some(member) if member.is_active() => {
                return Err(AppError::conflict("User is already a team member."));
            }
            Some(member) => {
                // Pending rows are refreshed in place; removed rows are revived.
                let mut params = UpdateMemberParams {
                    email: Some(email),
                    role: Some(role),
                    invited_by: Some(actor_id.to_owned()),
                    invited_at: Some(now),
                    expected_role: Some(member.role),
                    expected_status: Some(member.status),
                    ..UpdateMemberParams::default()
                };
                if member.status == MemberStatus::Removed {
                    params.status = Some(MemberStatus::Pending);
                    params.joined_at = Some(None);
                    params.left_at = Some(None);
                }

                self.team_store
                    .update_member(&member.id, params)
                    .await
                    .map_err(AppError::from_anyhow)?
                    .ok_or_else(|| AppError::membership_changed(team_id, target_user_id))?
            }
            None => self
                .team_store
                .insert_pending_member(team_id, target_user_id, &email, role, actor_id)
                .await
                .map_err(|err| {
                    if is_unique_violation(&err) {
                        AppError::conflict("An invitation for this user already exists.")
                    } else {
                        AppError::from_anyhow(err)
                    }
                })?,
        };

        info!(
            team_id,
            actor_id,
            user_id = target_user_id,
            role = %role,
            "team member invited"
        );
        Ok(member)
    }

    /// Moves the caller's invitation from `pending` to `active`.
    ///
    /// The row is looked up by (team, user) first. When the invitation was
    /// issued to the caller's email under another id, it is rebound to the
    /// caller.
    pub async fn accept_invite(
        &self,
        team_id: &str,
        user_id: &str,
        verified_email: Option<&str>,
    ) -> Result<TeamMemberRecord, AppError> {
        let verified_email = verified_email.and_then(TeamStore::normalize_email);

        let mut rebind = false;
        let mut membership = self.find_membership(team_id, user_id).await?;
        if membership.is_none() {
            if let Some(email) = verified_email.as_deref() {
                membership = self
                    .team_store
                    .find_pending_member_by_email(team_id, email)
                    .await
                    .map_err(AppError::from_anyhow)?;
                rebind = membership.is_some();
            }
        }

        let Some(membership) = membership else {
            return Err(AppError::not_found("Invite not found.").with_name("INVITE_NOT_FOUND"));
        };

        if let (Some(invited), Some(verified)) =
            (membership.email.as_deref(), verified_email.as_deref())
        {
            if invited != verified {
                return Err(AppError::forbidden(
                    "This invitation was issued to a different email address.",
                ));
            }
        }

        if !membership.status.can_transition_to(MemberStatus::Active) {
            return Err(AppError::conflict("Invite is no longer pending."));
        }

        let params = UpdateMemberParams {
            user_id: rebind.then(|| user_id.to_owned()),
            email: if membership.email.is_none() {
                verified_email
            } else {
                None
            },
            status: Some(MemberStatus::Active),
            joined_at: Some(Some(Utc::now().timestamp())),
            expected_status: Some(membership.status),
            ..UpdateMemberParams::default()
        };

        let accepted = self
            .team_store
            .update_member(&membership.id, params)
            .await
            .map_err(AppError::from_anyhow)?
            .ok_or_else(|| AppError::membership_changed(team_id, user_id))?;

        info!(team_id, user_id, role = %accepted.role, "team invite accepted");
        Ok(accepted)
    }

    pub async fn update_member(
        &self,
        team_id: &str,
        target_user_id: &str,
        actor_id: &str,
        patch: MemberPatch,
    ) -> Result<TeamMemberRecord, AppError> {
        self.require_membership(team_id, actor_id, &MembershipRequirement::managers())
            .await?;

        let target = self
            .find_membership(team_id, target_user_id)
            .await?
            .ok_or_else(|| AppError::member_not_found(team_id, target_user_id))?;

        if let Some(status) = patch.status {
            if status != target.status && status != MemberStatus::Removed {
                return Err(AppError::validation(
                    "Members become active only by accepting their invite.",
                ));
            }
        }

        let mut current = target;

        if let Some(role) = patch.role.filter(|role| *role != current.role) {
            if current.user_id.as_str() == actor_id {
                return Err(AppError::validation(
                    "Use ownership transfer or leave actions for yourself.",
                ));
            }
            if role == TeamRole::Owner || current.role == TeamRole::Owner {
                return Err(AppError::validation(
                    "Use ownership transfer to change the owner role.",
                ));
            }
            if current.status == MemberStatus::Removed {
                return Err(AppError::conflict("Member has been removed from the team."));
            }

            current = self
                .team_store
                .update_member(
                    &current.id,
                    UpdateMemberParams {
                        role: Some(role),
                        expected_role: Some(current.role),
                        expected_status: Some(current.status),
                        ..UpdateMemberParams::default()
                    },
                )
                .await
                .map_err(AppError::from_anyhow)?
                .ok_or_else(|| AppError::membership_changed(team_id, target_user_id))?;

            info!(
                team_id,
                actor_id,
                user_id = target_user_id,
                role = %role,
                "team member role changed"
            );
        }

        if patch.status == Some(MemberStatus::Removed) {
            return self.remove_member(team_id, target_user_id, actor_id).await;
        }

        Ok(current)
    }

    pub async fn remove_member(
        &self,
        team_id: &str,
        target_user_id: &str,
        actor_id: &str,
    ) -> Result<TeamMemberRecord, AppError> {
        let target = if target_user_id == actor_id {
            let member = self
                .find_membership(team_id, actor_id)
                .await?
                .ok_or_else(|| AppError::member_not_found(team_id, actor_id))?;
            if member.role == TeamRole::Owner {
                return Err(AppError::validation(
                    "Transfer ownership before leaving the team.",
                ));
            }
            member
        } else {
            self.require_membership(team_id, actor_id, &MembershipRequirement::managers())
                .await?;
            let member = self
                .find_membership(team_id, target_user_id)
                .await?
                .ok_or_else(|| AppError::member_not_found(team_id, target_user_id))?;
            if member.role == TeamRole::Owner {
                return Err(AppError::forbidden("Cannot remove the team owner."));
            }
            member
        };

        if target.status == MemberStatus::Removed {
            return Ok(target);
        }

        let removed = self
            .team_store
            .update_member(
                &target.id,
                UpdateMemberParams {
                    status: Some(MemberStatus::Removed),
                    left_at: Some(Some(Utc::now().timestamp())),
                    expected_role: Some(target.role),
                    expected_status: Some(target.status),
                    ..UpdateMemberParams::default()
                },
            )
            .await
            .map_err(AppError::from_anyhow)?
            .ok_or_else(|| AppError::membership_changed(team_id, target_user_id))?;

        info!(
            team_id,
            actor_id,
            user_id = target_user_id,
            "team member removed"
        );
        Ok(removed)
    }

    pub async fn transfer_ownership(
        &self,
        team_id: &str,
        actor_id: &str,
        target_user_id: Option<&str>,
    ) -> Result<(), AppError> {
        let target_user_id = target_user_id
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::validation("Target user is required."))?;
        if target_user_id == actor_id {
            return Err(AppError::validation("You already own this team."));
        }

        let team = self.fetch_team(team_id).await?;
        self.require_membership(team_id, actor_id, &MembershipRequirement::owner())
            .await?;
        if team.is_personal {
            return Err(AppError::validation(
                "Ownership of a personal team cannot be transferred.",
            ));
        }

        let outcome = self
            .team_store
            .transfer_ownership(team_id, actor_id, target_user_id)
            .await
            .map_err(AppError::from_anyhow)?;

        match outcome {
            TransferOutcome::Transferred => {
                info!(
                    team_id,
                    from_user_id = actor_id,
                    to_user_id = target_user_id,
                    "team ownership transferred"
                );
                Ok(())
            }
            TransferOutcome::ActorNotOwner => Err(AppError::team_access_denied(team_id)),
            TransferOutcome::TargetNotActive => Err(AppError::validation(
                "New owner must be an active team member.",
            )),
        }
    }
}

impl FromRef<AppState> for Arc<TeamService> {
    fn from_ref(state: &AppState) -> Arc<TeamService> {
        Arc::clone(&state.team_service)
    }
}
