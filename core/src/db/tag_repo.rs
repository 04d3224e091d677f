use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::{scope::ResourceScope, tag::TagRecord};

#[derive(Debug, Clone)]
pub struct CreateTagParams {
    pub id: String,
    /// Set for team tags; personal tags carry `user_id` instead.
    pub team_id: Option<String>,
    pub created_by: String,
    pub name: String,
    pub created_at: i64,
}

#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Fails with a unique violation when the scope already has a tag of
    /// that name.
    async fn insert_tag(&self, params: CreateTagParams) -> Result<TagRecord>;

    async fn fetch_tag(&self, id: &str) -> Result<Option<TagRecord>>;

    async fn list_tags(&self, scope: &ResourceScope) -> Result<Vec<TagRecord>>;

    async fn rename_tag(&self, id: &str, name: &str, updated_at: i64)
    -> Result<Option<TagRecord>>;

    async fn delete_tag(&self, id: &str) -> Result<bool>;
}

pub type TagRepositoryRef = Arc<dyn TagRepository>;
