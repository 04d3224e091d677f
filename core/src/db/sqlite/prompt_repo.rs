use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Pool, QueryBuilder, Row, Sqlite, sqlite::SqliteRow};

use crate::{
    db::prompt_repo::{CreatePromptParams, PromptRepository, UpdatePromptParams},
    ids::{PromptId, TeamId, UserId},
    prompt::PromptRecord,
    scope::ResourceScope,
};

const PROMPT_COLUMNS: &str =
    "id, team_id, created_by, user_id, title, content, description, version, created_at, updated_at";

pub struct SqlitePromptRepository {
    pool: Pool<Sqlite>,
}

impl SqlitePromptRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    fn map_prompt_row(row: &SqliteRow) -> PromptRecord {
        PromptRecord {
            id: PromptId::from(row.get::<String, _>("id")),
            team_id: row.get::<Option<String>, _>("team_id").map(TeamId::from),
            created_by: row.get::<Option<String>, _>("created_by").map(UserId::from),
            user_id: row.get::<Option<String>, _>("user_id").map(UserId::from),
            title: row.get("title"),
            content: row.get("content"),
            description: row.get("description"),
            version: row.get("version"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl PromptRepository for SqlitePromptRepository {
    async fn insert_prompt(&self, params: CreatePromptParams) -> Result<PromptRecord> {
        let CreatePromptParams {
            id,
            team_id,
            created_by,
            title,
            content,
            description,
            version,
            created_at,
        } = params;

        sqlx::query(
            "INSERT INTO prompts (
                 id,
                 team_id,
                 created_by,
                 user_id,
                 title,
                 content,
                 description,
                 version,
                 created_at,
                 updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(team_id.as_ref())
        .bind(&created_by)
        .bind(&created_by)
        .bind(&title)
        .bind(&content)
        .bind(description.as_ref())
        .bind(&version)
        .bind(created_at)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(PromptRecord {
            id: PromptId::from(id),
            team_id: team_id.map(TeamId::from),
            created_by: Some(UserId::from(created_by.clone())),
            user_id: Some(UserId::from(created_by)),
            title,
            content,
            description,
            version,
            created_at,
            updated_at: created_at,
        })
    }

    async fn fetch_prompt(&self, id: &str) -> Result<Option<PromptRecord>> {
        let row = sqlx::query(&format!("SELECT {PROMPT_COLUMNS} FROM prompts WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(Self::map_prompt_row))
    }

    async fn list_prompts(&self, scope: &ResourceScope) -> Result<Vec<PromptRecord>> {
        let rows = match scope {
            ResourceScope::Team(team_id) => {
                sqlx::query(&format!(
                    "SELECT {PROMPT_COLUMNS}
                     FROM prompts
                     WHERE team_id = ?
                     ORDER BY updated_at DESC, id ASC"
                ))
                .bind(team_id.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            ResourceScope::Personal(user_id) => {
                sqlx::query(&format!(
                    "SELECT {PROMPT_COLUMNS}
                     FROM prompts
                     WHERE team_id IS NULL AND (created_by = ? OR user_id = ?)
                     ORDER BY updated_at DESC, id ASC"
                ))
                .bind(user_id.as_str())
                .bind(user_id.as_str())
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.iter().map(Self::map_prompt_row).collect())
    }

    async fn update_prompt(&self, params: UpdatePromptParams) -> Result<Option<PromptRecord>> {
        let UpdatePromptParams {
            id,
            title,
            content,
            description,
            version,
            updated_at,
        } = params;

        let mut builder = QueryBuilder::new("UPDATE prompts SET ");
        {
            let mut separated = builder.separated(", ");
            if let Some(title) = title {
                separated.push("title = ");
                separated.push_bind_unseparated(title);
            }
            if let Some(content) = content {
                separated.push("content = ");
                separated.push_bind_unseparated(content);
            }
            if let Some(description) = description {
                separated.push("description = ");
                separated.push_bind_unseparated(description);
            }
            if let Some(version) = version {
                separated.push("version = ");
                separated.push_bind_unseparated(version);
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

        self.fetch_prompt(&id).await
    }

    async fn delete_prompt(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM prompts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
