use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    membership::{MemberStatus, TeamRole},
    team::{TeamRecord, UserTeamMembership},
    team_member::TeamMemberRecord,
};

#[derive(Debug, Clone)]
pub struct CreateTeamParams {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub is_personal: bool,
    pub owner_id: String,
    pub owner_membership_id: String,
    pub created_at: i64,
    /// Checked inside the insert; counts only the owner's non-personal teams.
    pub owned_team_limit: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct UpdateTeamParams {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub avatar_url: Option<Option<String>>,
    pub updated_at: i64,
}

#[derive(Debug, Clone)]
pub struct InsertMemberParams {
    pub id: String,
    pub team_id: String,
    pub user_id: String,
    pub email: Option<String>,
    pub role: TeamRole,
    pub status: MemberStatus,
    pub invited_by: Option<String>,
    pub invited_at: Option<i64>,
    pub joined_at: Option<i64>,
    pub created_at: i64,
    pub created_by: Option<String>,
}

/// Partial update of a membership row. `None` leaves a column untouched; the
/// nested options on timestamp columns allow clearing them.
///
/// `expected_role` and `expected_status` turn the write into a
/// compare-and-set: the row is only touched while it still holds those
/// values, and the write reports no row otherwise.
#[derive(Debug, Clone, Default)]
pub struct UpdateMemberParams {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub role: Option<TeamRole>,
    pub status: Option<MemberStatus>,
    pub invited_by: Option<String>,
    pub invited_at: Option<i64>,
    pub joined_at: Option<Option<i64>>,
    pub left_at: Option<Option<i64>>,
    pub expected_role: Option<TeamRole>,
    pub expected_status: Option<MemberStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    Transferred,
    ActorNotOwner,
    TargetNotActive,
}

#[async_trait]
pub trait TeamRepository: Send + Sync {
    /// Inserts the team and its active owner membership in one transaction.
    /// Fails with [`TeamLimitReached`](crate::db::errors::TeamLimitReached)
    /// when `owned_team_limit` is already met.
    async fn create_team(&self, params: CreateTeamParams) -> Result<TeamRecord>;

    async fn fetch_team(&self, id: &str) -> Result<Option<TeamRecord>>;

    async fn find_personal_team(&self, owner_id: &str) -> Result<Option<TeamRecord>>;

    async fn update_team(&self, params: UpdateTeamParams) -> Result<Option<TeamRecord>>;

    async fn delete_team(&self, id: &str) -> Result<bool>;

    async fn list_teams_for_user(
        &self,
        user_id: &str,
        statuses: &[MemberStatus],
    ) -> Result<Vec<UserTeamMembership>>;

    async fn get_member(&self, team_id: &str, user_id: &str)
    -> Result<Option<TeamMemberRecord>>;

    async fn find_pending_member_by_email(
        &self,
        team_id: &str,
        email: &str,
    ) -> Result<Option<TeamMemberRecord>>;

    async fn list_members(
        &self,
        team_id: &str,
        statuses: &[MemberStatus],
    ) -> Result<Vec<TeamMemberRecord>>;

    async fn insert_member(&self, params: InsertMemberParams) -> Result<TeamMemberRecord>;

    async fn update_member(
        &self,
        membership_id: &str,
        params: UpdateMemberParams,
        updated_at: i64,
    ) -> Result<Option<TeamMemberRecord>>;

    async fn touch_last_used(&self, team_id: &str, user_id: &str, now: i64) -> Result<()>;

    /// Makes `user_id` the active owner of `team_id`, inserting the row if it
    /// is missing.
    async fn ensure_owner_membership(&self, team_id: &str, user_id: &str, now: i64)
    -> Result<()>;

    /// Demotes the current owner to admin and promotes the target in a single
    /// transaction, then records the new owner on the team row.
    async fn transfer_ownership(
        &self,
        team_id: &str,
        from_user_id: &str,
        to_user_id: &str,
        now: i64,
    ) -> Result<TransferOutcome>;
}

pub type TeamRepositoryRef = Arc<dyn TeamRepository>;
