use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite, sqlite::SqliteRow};

use crate::{
    db::tag_repo::{CreateTagParams, TagRepository},
    ids::{TagId, TeamId, UserId},
    scope::ResourceScope,
    tag::TagRecord,
};

const TAG_COLUMNS: &str = "id, team_id, user_id, created_by, name, created_at, updated_at";

pub struct SqliteTagRepository {
    pool: Pool<Sqlite>,
}

impl SqliteTagRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    fn map_tag_row(row: &SqliteRow) -> TagRecord {
        TagRecord {
            id: TagId::from(row.get::<String, _>("id")),
            team_id: row.get::<Option<String>, _>("team_id").map(TeamId::from),
            user_id: row.get::<Option<String>, _>("user_id").map(UserId::from),
            created_by: row.get::<Option<String>, _>("created_by").map(UserId::from),
            name: row.get("name"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl TagRepository for SqliteTagRepository {
    async fn insert_tag(&self, params: CreateTagParams) -> Result<TagRecord> {
        let CreateTagParams {
            id,
            team_id,
            created_by,
            name,
            created_at,
        } = params;
        let user_id = team_id.is_none().then(|| created_by.clone());

        sqlx::query(
            "INSERT INTO tags (id, team_id, user_id, created_by, name, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(team_id.as_ref())
        .bind(user_id.as_ref())
        .bind(&created_by)
        .bind(&name)
        .bind(created_at)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(TagRecord {
            id: TagId::from(id),
            team_id: team_id.map(TeamId::from),
            user_id: user_id.map(UserId::from),
            created_by: Some(UserId::from(created_by)),
            name,
            created_at,
            updated_at: created_at,
        })
    }

    async fn fetch_tag(&self, id: &str) -> Result<Option<TagRecord>> {
        let row = sqlx::query(&format!("SELECT {TAG_COLUMNS} FROM tags WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(Self::map_tag_row))
    }

    async fn list_tags(&self, scope: &ResourceScope) -> Result<Vec<TagRecord>> {
        let rows = match scope {
            ResourceScope::Team(team_id) => {
                sqlx::query(&format!(
                    "SELECT {TAG_COLUMNS} FROM tags WHERE team_id = ? ORDER BY name ASC"
                ))
                .bind(team_id.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            ResourceScope::Personal(user_id) => {
                sqlx::query(&format!(
                    "SELECT {TAG_COLUMNS}
                     FROM tags
                     WHERE team_id IS NULL AND user_id = ?
                     ORDER BY name ASC"
                ))
                .bind(user_id.as_str())
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.iter().map(Self::map_tag_row).collect())
    }

    async fn rename_tag(
        &self,
        id: &str,
        name: &str,
        updated_at: i64,
    ) -> Result<Option<TagRecord>> {
        let result = sqlx::query("UPDATE tags SET name = ?, updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(updated_at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.fetch_tag(id).await
    }

    async fn delete_tag(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
