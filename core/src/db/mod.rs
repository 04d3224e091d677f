use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};

use self::{
    prompt_repo::PromptRepositoryRef,
    sqlite::{
        connection as sqlite_connection, prompt_repo::SqlitePromptRepository,
        tag_repo::SqliteTagRepository, team_repo::SqliteTeamRepository,
    },
    tag_repo::TagRepositoryRef,
    team_repo::TeamRepositoryRef,
};
use crate::config::AppConfig;

pub mod errors;
pub mod prompt_repo;
pub mod sqlite;
pub mod tag_repo;
pub mod team_repo;

#[derive(Clone)]
pub struct RepositoryRegistry {
    team_repo: TeamRepositoryRef,
    prompt_repo: PromptRepositoryRef,
    tag_repo: TagRepositoryRef,
}

impl RepositoryRegistry {
    pub fn new(
        team_repo: TeamRepositoryRef,
        prompt_repo: PromptRepositoryRef,
        tag_repo: TagRepositoryRef,
    ) -> Self {
        Self {
            team_repo,
            prompt_repo,
            tag_repo,
        }
    }

    pub fn team_repo(&self) -> TeamRepositoryRef {
        self.team_repo.clone()
    }

    pub fn prompt_repo(&self) -> PromptRepositoryRef {
        self.prompt_repo.clone()
    }

    pub fn tag_repo(&self) -> TagRepositoryRef {
        self.tag_repo.clone()
    }
}

#[derive(Clone)]
pub struct Database {
    pool: sqlite_connection::SqlitePool,
    path: PathBuf,
    repositories: Arc<RepositoryRegistry>,
}

impl Database {
    /// Opens the SQLite database named by the config and applies pending
    /// migrations.
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let db_file = Self::resolve_db_path(&config.database_path)?;
        if let Some(parent) = db_file.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory: {}", parent.display())
            })?;
        }

        let pool =
            sqlite_connection::create_pool(&db_file, config.database_max_connections).await?;
        sqlite_connection::run_migrations(&pool).await?;

        let team_repo = Arc::new(SqliteTeamRepository::new(pool.clone())) as TeamRepositoryRef;
        let prompt_repo =
            Arc::new(SqlitePromptRepository::new(pool.clone())) as PromptRepositoryRef;
        let tag_repo = Arc::new(SqliteTagRepository::new(pool.clone())) as TagRepositoryRef;
        let repositories = Arc::new(RepositoryRegistry::new(team_repo, prompt_repo, tag_repo));

        Ok(Self {
            pool,
            path: db_file,
            repositories,
        })
    }

    pub fn pool(&self) -> &sqlite_connection::SqlitePool {
        &self.pool
    }

    pub fn database_path(&self) -> &PathBuf {
        &self.path
    }

    pub fn repositories(&self) -> Arc<RepositoryRegistry> {
        self.repositories.clone()
    }

    fn resolve_db_path(path: &str) -> Result<PathBuf> {
        let path = PathBuf::from(path);
        if path.is_absolute() {
            Ok(path)
        } else {
            let cwd = std::env::current_dir().context("failed to obtain current directory")?;
            Ok(cwd.join(path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_creates_missing_directories_and_migrates() -> anyhow::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let nested = temp_dir.path().join("nested").join("minder.db");
        let config = AppConfig {
            database_path: nested.to_string_lossy().into_owned(),
            ..AppConfig::default()
        };

        let database = Database::connect(&config).await?;
        assert_eq!(database.database_path(), &nested);
        assert!(nested.exists());

        let tables: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('teams', 'team_members', 'prompts', 'tags')",
        )
        .fetch_one(database.pool())
        .await?;
        assert_eq!(tables, 4);

        // Reconnecting re-runs migrations as a no-op.
        Database::connect(&config).await?;
        Ok(())
    }
}
