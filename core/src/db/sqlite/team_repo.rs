use std::str::FromStr;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Pool, QueryBuilder, Row, Sqlite, sqlite::SqliteRow};

use crate::{
    db::{
        errors::TeamLimitReached,
        team_repo::{
            CreateTeamParams, InsertMemberParams, TeamRepository, TransferOutcome,
            UpdateMemberParams, UpdateTeamParams,
        },
    },
    ids::{MembershipId, TeamId, UserId},
    membership::{MemberStatus, TeamRole},
    team::{TeamRecord, UserTeamMembership},
    team_member::TeamMemberRecord,
};

const TEAM_COLUMNS: &str = "id, name, description, avatar_url, is_personal, owner_id, created_by, created_at, updated_at";

const MEMBER_COLUMNS: &str = "id, team_id, user_id, email, role, status, invited_by, invited_at, joined_at, left_at, last_used_at, created_at, updated_at, created_by";

pub struct SqliteTeamRepository {
    pool: Pool<Sqlite>,
}

impl SqliteTeamRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    fn map_team_row(row: &SqliteRow) -> TeamRecord {
        TeamRecord {
            id: TeamId::from(row.get::<String, _>("id")),
            name: row.get("name"),
            description: row.get("description"),
            avatar_url: row.get("avatar_url"),
            is_personal: row.get::<i64, _>("is_personal") != 0,
            owner_id: UserId::from(row.get::<String, _>("owner_id")),
            created_by: UserId::from(row.get::<String, _>("created_by")),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }

    fn map_member_row(row: &SqliteRow) -> Result<TeamMemberRecord> {
        Ok(TeamMemberRecord {
            id: MembershipId::from(row.get::<String, _>("id")),
            team_id: TeamId::from(row.get::<String, _>("team_id")),
            user_id: UserId::from(row.get::<String, _>("user_id")),
            email: row.get("email"),
            role: TeamRole::from_str(&row.get::<String, _>("role"))?,
            status: MemberStatus::from_str(&row.get::<String, _>("status"))?,
            invited_by: row.get("invited_by"),
            invited_at: row.get("invited_at"),
            joined_at: row.get("joined_at"),
            left_at: row.get("left_at"),
            last_used_at: row.get("last_used_at"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            created_by: row.get("created_by"),
        })
    }

    fn map_user_team_row(row: &SqliteRow) -> Result<UserTeamMembership> {
        Ok(UserTeamMembership {
            membership_id: MembershipId::from(row.get::<String, _>("membership_id")),
            user_id: UserId::from(row.get::<String, _>("member_user_id")),
            role: TeamRole::from_str(&row.get::<String, _>("member_role"))?,
            status: MemberStatus::from_str(&row.get::<String, _>("member_status"))?,
            invited_at: row.get("member_invited_at"),
            joined_at: row.get("member_joined_at"),
            team: Self::map_team_row(row),
        })
    }

    async fn fetch_member_by_id(&self, membership_id: &str) -> Result<Option<TeamMemberRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {MEMBER_COLUMNS} FROM team_members WHERE id = ?"
        ))
        .bind(membership_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::map_member_row).transpose()
    }
}

fn push_status_list(builder: &mut QueryBuilder<'_, Sqlite>, statuses: &[MemberStatus]) {
    builder.push("(");
    {
        let mut separated = builder.separated(", ");
        for status in statuses {
            separated.push_bind(status.as_str());
        }
    }
    builder.push(")");
}

#[async_trait]
impl TeamRepository for SqliteTeamRepository {
    async fn create_team(&self, params: CreateTeamParams) -> Result<TeamRecord> {
        let CreateTeamParams {
            id,
            name,
            description,
            avatar_url,
            is_personal,
            owner_id,
            owner_membership_id,
            created_at,
            owned_team_limit,
        } = params;

        let mut tx = self.pool.begin().await?;

        // The count runs inside the insert statement, under the write lock.
        let mut builder = QueryBuilder::<Sqlite>::new(
            "INSERT INTO teams (
                 id,
                 name,
                 description,
                 avatar_url,
                 is_personal,
                 owner_id,
                 created_by,
                 created_at,
                 updated_at
             ) SELECT ",
        );
        {
            let mut values = builder.separated(", ");
            values.push_bind(id.clone());
            values.push_bind(name.clone());
            values.push_bind(description.clone());
            values.push_bind(avatar_url.clone());
            values.push_bind(if is_personal { 1_i64 } else { 0_i64 });
            values.push_bind(owner_id.clone());
            values.push_bind(owner_id.clone());
            values.push_bind(created_at);
            values.push_bind(created_at);
        }
        if let Some(limit) = owned_team_limit {
            builder.push(
                " WHERE (SELECT COUNT(*) FROM teams WHERE is_personal = 0 AND owner_id = ",
            );
            builder.push_bind(owner_id.clone());
            builder.push(") < ");
            builder.push_bind(limit);
        }

        let inserted = builder.build().execute(&mut *tx).await?;
        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(TeamLimitReached {
                owner_id,
                limit: owned_team_limit.unwrap_or_default(),
            }
            .into());
        }

        sqlx::query(
            "INSERT INTO team_members (
                 id,
                 team_id,
                 user_id,
                 role,
                 status,
                 joined_at,
                 created_at,
                 updated_at,
                 created_by
             ) VALUES (?, ?, ?, 'owner', 'active', ?, ?, ?, ?)",
        )
        .bind(&owner_membership_id)
        .bind(&id)
        .bind(&owner_id)
        .bind(created_at)
        .bind(created_at)
        .bind(created_at)
        .bind(&owner_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(TeamRecord {
            id: TeamId::from(id),
            name,
            description,
            avatar_url,
            is_personal,
            owner_id: UserId::from(owner_id.clone()),
            created_by: UserId::from(owner_id),
            created_at,
            updated_at: created_at,
        })
    }

    async fn fetch_team(&self, id: &str) -> Result<Option<TeamRecord>> {
        let row = sqlx::query(&format!("SELECT {TEAM_COLUMNS} FROM teams WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(Self::map_team_row))
    }

    async fn find_personal_team(&self, owner_id: &str) -> Result<Option<TeamRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {TEAM_COLUMNS} FROM teams WHERE owner_id = ? AND is_personal = 1 LIMIT 1"
        ))
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(Self::map_team_row))
    }

    async fn update_team(&self, params: UpdateTeamParams) -> Result<Option<TeamRecord>> {
        let UpdateTeamParams {
            id,
            name,
            description,
            avatar_url,
            updated_at,
        } = params;

        let mut builder = QueryBuilder::new("UPDATE teams SET ");
        {
            let mut separated = builder.separated(", ");
            if let Some(name) = name {
                separated.push("name = ");
                separated.push_bind_unseparated(name);
            }
            if let Some(description) = description {
                separated.push("description = ");
                separated.push_bind_unseparated(description);
            }
            if let Some(avatar_url) = avatar_url {
                separated.push("avatar_url = ");
                separated.push_bind_unseparated(avatar_url);
            }
            separated.push("updated_at = ");
            separated.push_bind_unseparated(updated_at);
        }
        builder.push(" WHERE id = ");
        builder.push_bind(&id);

        let result = builder.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.fetch_team(&id).await
    }

    async fn delete_team(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM teams WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_teams_for_user(
        &self,
        user_id: &str,
        statuses: &[MemberStatus],
    ) -> Result<Vec<UserTeamMembership>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::new(
            "SELECT
                 tm.id AS membership_id,
                 tm.user_id AS member_user_id,
                 tm.role AS member_role,
                 tm.status AS member_status,
                 tm.invited_at AS member_invited_at,
                 tm.joined_at AS member_joined_at,
                 t.id,
                 t.name,
                 t.description,
                 t.avatar_url,
                 t.is_personal,
                 t.owner_id,
                 t.created_by,
                 t.created_at,
                 t.updated_at
             FROM team_members tm
             JOIN teams t ON t.id = tm.team_id
             WHERE tm.user_id = ",
        );
        builder.push_bind(user_id);
        builder.push(" AND tm.status IN ");
        push_status_list(&mut builder, statuses);
        builder.push(" ORDER BY tm.created_at ASC, t.name ASC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(Self::map_user_team_row).collect()
    }

    async fn get_member(
        &self,
        team_id: &str,
        user_id: &str,
    ) -> Result<Option<TeamMemberRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {MEMBER_COLUMNS} FROM team_members WHERE team_id = ? AND user_id = ?"
        ))
        .bind(team_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::map_member_row).transpose()
    }

    async fn find_pending_member_by_email(
        &self,
        team_id: &str,
        email: &str,
    ) -> Result<Option<TeamMemberRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {MEMBER_COLUMNS}
             FROM team_members
             WHERE team_id = ? AND email = ? AND status = 'pending'
             ORDER BY invited_at DESC
             LIMIT 1"
        ))
        .bind(team_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::map_member_row).transpose()
    }

    async fn list_members(
        &self,
        team_id: &str,
        statuses: &[MemberStatus],
    ) -> Result<Vec<TeamMemberRecord>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::new(format!(
            "SELECT {MEMBER_COLUMNS} FROM team_members WHERE team_id = "
        ));
        builder.push_bind(team_id);
        builder.push(" AND status IN ");
        push_status_list(&mut builder, statuses);
        builder.push(" ORDER BY created_at ASC, user_id ASC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(Self::map_member_row).collect()
    }

    async fn insert_member(&self, params: InsertMemberParams) -> Result<TeamMemberRecord> {
        let InsertMemberParams {
            id,
            team_id,
            user_id,
            email,
            role,
            status,
            invited_by,
            invited_at,
            joined_at,
            created_at,
            created_by,
        } = params;

        sqlx::query(
            "INSERT INTO team_members (
                 id,
                 team_id,
                 user_id,
                 email,
                 role,
                 status,
                 invited_by,
                 invited_at,
                 joined_at,
                 created_at,
                 updated_at,
                 created_by
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&team_id)
        .bind(&user_id)
        .bind(email.as_ref())
        .bind(role.as_str())
        .bind(status.as_str())
        .bind(invited_by.as_ref())
        .bind(invited_at)
        .bind(joined_at)
        .bind(created_at)
        .bind(created_at)
        .bind(created_by.as_ref())
        .execute(&self.pool)
        .await?;

        Ok(TeamMemberRecord {
            id: MembershipId::from(id),
            team_id: TeamId::from(team_id),
            user_id: UserId::from(user_id),
            email,
            role,
            status,
            invited_by,
            invited_at,
            joined_at,
            left_at: None,
            last_used_at: None,
            created_at,
            updated_at: created_at,
            created_by,
        })
    }

    async fn update_member(
        &self,
        membership_id: &str,
        params: UpdateMemberParams,
        updated_at: i64,
    ) -> Result<Option<TeamMemberRecord>> {
        let UpdateMemberParams {
            user_id,
            email,
            role,
            status,
            invited_by,
            invited_at,
            joined_at,
            left_at,
            expected_role,
            expected_status,
        } = params;

        let mut builder = QueryBuilder::new("UPDATE team_members SET ");
        {
            let mut separated = builder.separated(", ");
            if let Some(user_id) = user_id {
                separated.push("user_id = ");
                separated.push_bind_unseparated(user_id);
            }
            if let Some(email) = email {
                separated.push("email = ");
                separated.push_bind_unseparated(email);
            }
            if let Some(role) = role {
                separated.push("role = ");
                separated.push_bind_unseparated(role.as_str());
            }
            if let Some(status) = status {
                separated.push("status = ");
                separated.push_bind_unseparated(status.as_str());
            }
            if let Some(invited_by) = invited_by {
                separated.push("invited_by = ");
                separated.push_bind_unseparated(invited_by);
            }
            if let Some(invited_at) = invited_at {
                separated.push("invited_at = ");
                separated.push_bind_unseparated(invited_at);
            }
            if let Some(joined_at) = joined_at {
                separated.push("joined_at = ");
                separated.push_bind_unseparated(joined_at);
            }
            if let Some(left_at) = left_at {
                separated.push("left_at = ");
                separated.push_bind_unseparated(left_at);
            }
            separated.push("updated_at = ");
            separated.push_bind_unseparated(updated_at);
        }
        builder.push(" WHERE id = ");
        builder.push_bind(membership_id);
        if let Some(expected_role) = expected_role {
            builder.push(" AND role = ");
            builder.push_bind(expected_role.as_str());
        }
        if let Some(expected_status) = expected_status {
            builder.push(" AND status = ");
            builder.push_bind(expected_status.as_str());
        }

        let result = builder.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.fetch_member_by_id(membership_id).await
    }

    async fn touch_last_used(&self, team_id: &str, user_id: &str, now: i64) -> Result<()> {
        sqlx::query(
            "UPDATE team_members SET last_used_at = ? WHERE team_id = ? AND user_id = ? AND status = 'active'",
        )
        .bind(now)
        .bind(team_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn ensure_owner_membership(
        &self,
        team_id: &str,
        user_id: &str,
        now: i64,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO team_members (
                 id,
                 team_id,
                 user_id,
                 role,
                 status,
                 joined_at,
                 created_at,
                 updated_at,
                 created_by
             ) VALUES (?, ?, ?, 'owner', 'active', ?, ?, ?, ?)
             ON CONFLICT (team_id, user_id) DO UPDATE SET
                 role = 'owner',
                 status = 'active',
                 joined_at = COALESCE(team_members.joined_at, excluded.joined_at),
                 left_at = NULL,
                 updated_at = excluded.updated_at
             WHERE team_members.role <> 'owner' OR team_members.status <> 'active'",
        )
        .bind(MembershipId::generate().as_str())
        .bind(team_id)
        .bind(user_id)
        .bind(now)
        .bind(now)
        .bind(now)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn transfer_ownership(
        &self,
        team_id: &str,
        from_user_id: &str,
        to_user_id: &str,
        now: i64,
    ) -> Result<TransferOutcome> {
        let mut tx = self.pool.begin().await?;

        // Write first so the transaction takes the write lock before it reads.
        let demoted = sqlx::query(
            "UPDATE team_members
             SET role = 'admin', updated_at = ?
             WHERE team_id = ? AND user_id = ? AND role = 'owner' AND status = 'active'",
        )
        .bind(now)
        .bind(team_id)
        .bind(from_user_id)
        .execute(&mut *tx)
        .await?;

        if demoted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(TransferOutcome::ActorNotOwner);
        }

        let promoted = sqlx::query(
            "UPDATE team_members
             SET role = 'owner', updated_at = ?
             WHERE team_id = ? AND user_id = ? AND status = 'active'",
        )
        .bind(now)
        .bind(team_id)
        .bind(to_user_id)
        .execute(&mut *tx)
        .await?;

        if promoted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(TransferOutcome::TargetNotActive);
        }

        sqlx::query("UPDATE teams SET owner_id = ?, updated_at = ? WHERE id = ?")
            .bind(to_user_id)
            .bind(now)
            .bind(team_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(TransferOutcome::Transferred)
    }
}
