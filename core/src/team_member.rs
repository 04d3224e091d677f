use serde::Serialize;

use crate::{
    ids::{MembershipId, TeamId, UserId},
    membership::{MemberStatus, TeamRole},
};

#[derive(Debug, Clone, Serialize)]
pub struct TeamMemberRecord {
    pub id: MembershipId,
    pub team_id: TeamId,
    pub user_id: UserId,
    pub email: Option<String>,
    pub role: TeamRole,
    pub status: MemberStatus,
    pub invited_by: Option<String>,
    pub invited_at: Option<i64>,
    pub joined_at: Option<i64>,
    pub left_at: Option<i64>,
    /// Last time the member picked this team as their current scope.
    pub last_used_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    pub created_by: Option<String>,
}

impl TeamMemberRecord {
    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }

    pub fn is_pending(&self) -> bool {
        self.status == MemberStatus::Pending
    }

    pub fn is_active_owner(&self) -> bool {
        self.is_active() && self.role == TeamRole::Owner
    }
}
