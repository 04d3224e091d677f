use anyhow::{Result, anyhow};
use chrono::Utc;
use serde::Serialize;

use crate::{
    db::{
        Database,
        prompt_repo::{CreatePromptParams, PromptRepositoryRef, UpdatePromptParams},
    },
    ids::{PromptId, TeamId, UserId},
    permission::OwnedResource,
    scope::{ResourceScope, ScopedResource},
};

pub const DEFAULT_PROMPT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize)]
pub struct PromptRecord {
    pub id: PromptId,
    pub team_id: Option<TeamId>,
    pub created_by: Option<UserId>,
    pub user_id: Option<UserId>,
    pub title: String,
    pub content: String,
    pub description: Option<String>,
    pub version: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl OwnedResource for PromptRecord {
    fn creator_id(&self) -> Option<&str> {
        self.created_by.as_deref()
    }

    fn legacy_owner_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}

impl ScopedResource for PromptRecord {
    fn team_id(&self) -> Option<&TeamId> {
        self.team_id.as_ref()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PromptPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub description: Option<Option<String>>,
    pub version: Option<String>,
}

impl PromptPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.description.is_none()
            && self.version.is_none()
    }
}

#[derive(Clone)]
pub struct PromptStore {
    prompt_repo: PromptRepositoryRef,
}

impl PromptStore {
    pub fn new(database: &Database) -> Self {
        Self {
            prompt_repo: database.repositories().prompt_repo(),
        }
    }

    pub async fn create(
        &self,
        scope: &ResourceScope,
        actor_id: &str,
        title: &str,
        content: &str,
        description: Option<&str>,
        version: Option<&str>,
    ) -> Result<PromptRecord> {
        let title = title.trim();
        if title.is_empty() {
            return Err(anyhow!("prompt title must not be empty"));
        }

        let version = version
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_PROMPT_VERSION);

        self.prompt_repo
            .insert_prompt(CreatePromptParams {
                id: PromptId::generate().into_inner(),
                team_id: scope.team_id().map(ToString::to_string),
                created_by: actor_id.to_owned(),
                title: title.to_owned(),
                content: content.to_owned(),
                description: description.map(ToOwned::to_owned),
                version: version.to_owned(),
                created_at: Utc::now().timestamp(),
            })
            .await
    }

    pub async fn list(&self, scope: &ResourceScope) -> Result<Vec<PromptRecord>> {
        self.prompt_repo.list_prompts(scope).await
    }

    /// Fetches a prompt only if it lives inside `scope`.
    pub async fn get(&self, scope: &ResourceScope, id: &str) -> Result<Option<PromptRecord>> {
        Ok(self
            .prompt_repo
            .fetch_prompt(id)
            .await?
            .filter(|prompt| scope.contains(prompt)))
    }

    pub async fn update(&self, id: &str, patch: PromptPatch) -> Result<Option<PromptRecord>> {
        if let Some(title) = patch.title.as_deref() {
            if title.trim().is_empty() {
                return Err(anyhow!("prompt title must not be empty"));
            }
        }

        if patch.is_empty() {
            return self.prompt_repo.fetch_prompt(id).await;
        }

        self.prompt_repo
            .update_prompt(UpdatePromptParams {
                id: id.to_owned(),
                title: patch.title.map(|title| title.trim().to_owned()),
                content: patch.content,
                description: patch.description,
                version: patch.version,
                updated_at: Utc::now().timestamp(),
            })
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        self.prompt_repo.delete_prompt(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, team::TeamStore};
    use tempfile::TempDir;

    async fn setup() -> (TempDir, Database, PromptStore, TeamStore) {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let mut config = AppConfig::default();
        config.database_path = temp_dir
            .path()
            .join("prompts.db")
            .to_string_lossy()
            .into_owned();
        let database = Database::connect(&config).await.expect("connect database");
        let prompts = PromptStore::new(&database);
        let teams = TeamStore::new(&database);
        (temp_dir, database, prompts, teams)
    }

    #[tokio::test]
    async fn personal_and_team_scopes_are_disjoint() -> anyhow::Result<()> {
        let (_dir, _db, prompts, teams) = setup().await;
        let team = teams.create("alice", "Writers", None, None, false).await?;
        let personal = ResourceScope::Personal(UserId::from("alice"));
        let shared = ResourceScope::Team(team.id.clone());

        let mine = prompts
            .create(&personal, "alice", "Draft", "hello", None, None)
            .await?;
        let ours = prompts
            .create(&shared, "alice", "Shared", "hi team", Some("notes"), Some("2.0"))
            .await?;

        assert_eq!(mine.version, DEFAULT_PROMPT_VERSION);
        assert!(mine.team_id.is_none());
        assert_eq!(ours.team_id.as_ref(), Some(&team.id));

        let personal_list = prompts.list(&personal).await?;
        assert_eq!(personal_list.len(), 1);
        assert_eq!(personal_list[0].id, mine.id);

        let team_list = prompts.list(&shared).await?;
        assert_eq!(team_list.len(), 1);
        assert_eq!(team_list[0].id, ours.id);

        assert!(prompts.get(&personal, &ours.id).await?.is_none());
        assert!(prompts.get(&shared, &mine.id).await?.is_none());
        assert!(prompts.get(&shared, &ours.id).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn personal_scope_hides_other_users_prompts() -> anyhow::Result<()> {
        let (_dir, _db, prompts, _teams) = setup().await;
        let alice = ResourceScope::Personal(UserId::from("alice"));
        let bob = ResourceScope::Personal(UserId::from("bob"));

        let prompt = prompts
            .create(&alice, "alice", "Draft", "hello", None, None)
            .await?;
        assert!(prompts.list(&bob).await?.is_empty());
        assert!(prompts.get(&bob, &prompt.id).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn update_applies_patch_and_validates_title() -> anyhow::Result<()> {
        let (_dir, _db, prompts, _teams) = setup().await;
        let scope = ResourceScope::Personal(UserId::from("alice"));
        let prompt = prompts
            .create(&scope, "alice", "Draft", "hello", Some("old"), None)
            .await?;

        assert!(
            prompts
                .update(
                    &prompt.id,
                    PromptPatch {
                        title: Some("  ".into()),
                        ..PromptPatch::default()
                    },
                )
                .await
                .is_err()
        );

        let updated = prompts
            .update(
                &prompt.id,
                PromptPatch {
                    content: Some("updated".into()),
                    description: Some(None),
                    ..PromptPatch::default()
                },
            )
            .await?
            .expect("prompt");
        assert_eq!(updated.title, "Draft");
        assert_eq!(updated.content, "updated");
        assert!(updated.description.is_none());

        assert!(prompts.delete(&prompt.id).await?);
        assert!(!prompts.delete(&prompt.id).await?);
        Ok(())
    }

    #[tokio::test]
    async fn deleting_a_team_removes_its_prompts() -> anyhow::Result<()> {
        let (_dir, _db, prompts, teams) = setup().await;
        let team = teams.create("alice", "Writers", None, None, false).await?;
        let scope = ResourceScope::Team(team.id.clone());
        let prompt = prompts
            .create(&scope, "alice", "Shared", "hi", None, None)
            .await?;

        assert!(teams.delete(&team.id).await?);
        assert!(prompts.get(&scope, &prompt.id).await?.is_none());
        Ok(())
    }
}
