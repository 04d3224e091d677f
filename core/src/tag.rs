use anyhow::{Result, anyhow};
use chrono::Utc;
use serde::Serialize;

use crate::{
    db::{
        Database,
        tag_repo::{CreateTagParams, TagRepositoryRef},
    },
    ids::{TagId, TeamId, UserId},
    permission::OwnedResource,
    scope::{ResourceScope, ScopedResource},
};

/// A label in a team (`team_id` set, `user_id` empty) or in one user's
/// personal space (`team_id` empty, `user_id` set).
#[derive(Debug, Clone, Serialize)]
pub struct TagRecord {
    pub id: TagId,
    pub team_id: Option<TeamId>,
    pub user_id: Option<UserId>,
    pub created_by: Option<UserId>,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl OwnedResource for TagRecord {
    fn creator_id(&self) -> Option<&str> {
        self.created_by.as_deref()
    }

    fn legacy_owner_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}

impl ScopedResource for TagRecord {
    fn team_id(&self) -> Option<&TeamId> {
        self.team_id.as_ref()
    }
}

fn normalize_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("tag name must not be empty"));
    }
    Ok(name)
}

#[derive(Clone)]
pub struct TagStore {
    tag_repo: TagRepositoryRef,
}

impl TagStore {
    pub fn new(database: &Database) -> Self {
        Self {
            tag_repo: database.repositories().tag_repo(),
        }
    }

    pub async fn create(
        &self,
        scope: &ResourceScope,
        actor_id: &str,
        name: &str,
    ) -> Result<TagRecord> {
        let name = normalize_name(name)?;
        self.tag_repo
            .insert_tag(CreateTagParams {
                id: TagId::generate().into_inner(),
                team_id: scope.team_id().map(ToString::to_string),
                created_by: actor_id.to_owned(),
                name: name.to_owned(),
                created_at: Utc::now().timestamp(),
            })
            .await
    }

    /// Tags visible in `scope`, ordered by name.
    pub async fn list(&self, scope: &ResourceScope) -> Result<Vec<TagRecord>> {
        self.tag_repo.list_tags(scope).await
    }

    pub async fn get(&self, scope: &ResourceScope, id: &str) -> Result<Option<TagRecord>> {
        Ok(self
            .tag_repo
            .fetch_tag(id)
            .await?
            .filter(|tag| scope.contains(tag)))
    }

    pub async fn rename(&self, id: &str, name: &str) -> Result<Option<TagRecord>> {
        let name = normalize_name(name)?;
        self.tag_repo
            .rename_tag(id, name, Utc::now().timestamp())
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        self.tag_repo.delete_tag(id).await
    }
}
