use anyhow::{Result, anyhow};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    db::{
        Database,
        errors::is_unique_violation,
        team_repo::{
            CreateTeamParams, InsertMemberParams, TeamRepositoryRef, TransferOutcome,
            UpdateMemberParams, UpdateTeamParams,
        },
    },
    ids::{MembershipId, TeamId, UserId},
    membership::{MemberStatus, TeamRole},
    team_member::TeamMemberRecord,
};

pub const PERSONAL_TEAM_NAME: &str = "Personal workspace";
pub const PERSONAL_TEAM_DESCRIPTION: &str = "Auto-generated personal space";

#[derive(Debug, Clone, Serialize)]
pub struct TeamRecord {
    pub id: TeamId,
    pub name: String,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub is_personal: bool,
    pub owner_id: UserId,
    pub created_by: UserId,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A team as seen from one of its members.
#[derive(Debug, Clone, Serialize)]
pub struct UserTeamMembership {
    pub membership_id: MembershipId,
    pub user_id: UserId,
    pub role: TeamRole,
    pub status: MemberStatus,
    pub invited_at: Option<i64>,
    pub joined_at: Option<i64>,
    pub team: TeamRecord,
}

#[derive(Clone)]
pub struct TeamStore {
    team_repo: TeamRepositoryRef,
}

impl TeamStore {
    pub fn new(database: &Database) -> Self {
        Self {
            team_repo: database.repositories().team_repo(),
        }
    }

    pub fn normalize_email(email: &str) -> Option<String> {
        let trimmed = email.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_ascii_lowercase())
        }
    }

    pub async fn create(
        &self,
        owner_id: &str,
        name: &str,
        description: Option<&str>,
        avatar_url: Option<&str>,
        is_personal: bool,
    ) -> Result<TeamRecord> {
        self.insert_team(owner_id, name, description, avatar_url, is_personal, None)
            .await
    }

    /// Creates a collaborative team unless the owner already holds `limit`
    /// of them. Personal teams do not count towards the limit.
    pub async fn create_within_limit(
        &self,
        owner_id: &str,
        name: &str,
        description: Option<&str>,
        avatar_url: Option<&str>,
        limit: i64,
    ) -> Result<TeamRecord> {
        self.insert_team(owner_id, name, description, avatar_url, false, Some(limit))
            .await
    }

    async fn insert_team(
        &self,
        owner_id: &str,
        name: &str,
        description: Option<&str>,
        avatar_url: Option<&str>,
        is_personal: bool,
        owned_team_limit: Option<i64>,
    ) -> Result<TeamRecord> {
        let name = name.trim();
        if name.is_empty() {
            return Err(anyhow!("team name must not be empty"));
        }

        let team = self
            .team_repo
            .create_team(CreateTeamParams {
                id: TeamId::generate().into_inner(),
                name: name.to_owned(),
                description: description.map(ToOwned::to_owned),
                avatar_url: avatar_url.map(ToOwned::to_owned),
                is_personal,
                owner_id: owner_id.to_owned(),
                owner_membership_id: MembershipId::generate().into_inner(),
                created_at: Utc::now().timestamp(),
                owned_team_limit,
            })
            .await?;

        info!(
            team_id = %team.id,
            owner_id,
            is_personal,
            "team created"
        );
        Ok(team)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<TeamRecord>> {
        self.team_repo.fetch_team(id).await
    }

    pub async fn find_personal_team(&self, user_id: &str) -> Result<Option<TeamRecord>> {
        self.team_repo.find_personal_team(user_id).await
    }

    /// Returns the user's personal team, creating it on first use.
    ///
    /// Concurrent callers race on the partial unique index over
    /// `(owner_id) WHERE is_personal`; the loser re-reads and returns the
    /// winner's row.
    pub async fn ensure_personal_team(&self, user_id: &str) -> Result<TeamRecord> {
        if let Some(team) = self.team_repo.find_personal_team(user_id).await? {
            self.team_repo
                .ensure_owner_membership(&team.id, user_id, Utc::now().timestamp())
                .await?;
            return Ok(team);
        }

        match self
            .create(
                user_id,
                PERSONAL_TEAM_NAME,
                Some(PERSONAL_TEAM_DESCRIPTION),
                None,
                true,
            )
            .await
        {
            Ok(team) => Ok(team),
            Err(err) if is_unique_violation(&err) => {
                debug!(user_id, "personal team created concurrently, re-reading");
                self.team_repo
                    .find_personal_team(user_id)
                    .await?
                    .ok_or_else(|| anyhow!("personal team for {user_id} missing after conflict"))
            }
            Err(err) => Err(err),
        }
    }

    pub async fn update(
        &self,
        id: &str,
        name: Option<&str>,
        description: Option<Option<&str>>,
        avatar_url: Option<Option<&str>>,
    ) -> Result<Option<TeamRecord>> {
        let normalized_name = name.map(str::trim).map(ToOwned::to_owned);
        if normalized_name.as_deref() == Some("") {
            return Err(anyhow!("team name must not be empty"));
        }

        if normalized_name.is_none() && description.is_none() && avatar_url.is_none() {
            return self.find_by_id(id).await;
        }

        self.team_repo
            .update_team(UpdateTeamParams {
                id: id.to_owned(),
                name: normalized_name,
                description: description.map(|value| value.map(ToOwned::to_owned)),
                avatar_url: avatar_url.map(|value| value.map(ToOwned::to_owned)),
                updated_at: Utc::now().timestamp(),
            })
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        self.team_repo.delete_team(id).await
    }

    pub async fn list_for_user(
        &self,
        user_id: &str,
        include_pending: bool,
    ) -> Result<Vec<UserTeamMembership>> {
        let statuses: &[MemberStatus] = if include_pending {
            &[MemberStatus::Active, MemberStatus::Pending]
        } else {
            &[MemberStatus::Active]
        };
        self.team_repo.list_teams_for_user(user_id, statuses).await
    }

    pub async fn list_pending_invites(&self, user_id: &str) -> Result<Vec<UserTeamMembership>> {
        self.team_repo
            .list_teams_for_user(user_id, &[MemberStatus::Pending])
            .await
    }

    pub async fn get_member(
        &self,
        team_id: &str,
        user_id: &str,
    ) -> Result<Option<TeamMemberRecord>> {
        self.team_repo.get_member(team_id, user_id).await
    }

    pub async fn find_pending_member_by_email(
        &self,
        team_id: &str,
        email: &str,
    ) -> Result<Option<TeamMemberRecord>> {
        let Some(normalized) = Self::normalize_email(email) else {
            return Ok(None);
        };
        self.team_repo
            .find_pending_member_by_email(team_id, &normalized)
            .await
    }

    pub async fn list_members(
        &self,
        team_id: &str,
        statuses: &[MemberStatus],
    ) -> Result<Vec<TeamMemberRecord>> {
        self.team_repo.list_members(team_id, statuses).await
    }

    pub async fn insert_pending_member(
        &self,
        team_id: &str,
        user_id: &str,
        email: &str,
        role: TeamRole,
        inviter_id: &str,
    ) -> Result<TeamMemberRecord> {
        let now = Utc::now().timestamp();
        self.team_repo
            .insert_member(InsertMemberParams {
                id: MembershipId::generate().into_inner(),
                team_id: team_id.to_owned(),
                user_id: user_id.to_owned(),
                email: Self::normalize_email(email),
                role,
                status: MemberStatus::Pending,
                invited_by: Some(inviter_id.to_owned()),
                invited_at: Some(now),
                joined_at: None,
                created_at: now,
                created_by: Some(inviter_id.to_owned()),
            })
            .await
    }

    pub async fn update_member(
        &self,
        membership_id: &str,
        params: UpdateMemberParams,
    ) -> Result<Option<TeamMemberRecord>> {
        self.team_repo
            .update_member(membership_id, params, Utc::now().timestamp())
            .await
    }

    pub async fn touch_last_used(&self, team_id: &str, user_id: &str) -> Result<()> {
        self.team_repo
            .touch_last_used(team_id, user_id, Utc::now().timestamp())
            .await
    }

    pub async fn transfer_ownership(
        &self,
        team_id: &str,
        from_user_id: &str,
        to_user_id: &str,
    ) -> Result<TransferOutcome> {
        self.team_repo
            .transfer_ownership(team_id, from_user_id, to_user_id, Utc::now().timestamp())
            .await
    }
}
