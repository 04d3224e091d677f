use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::{prompt::PromptRecord, scope::ResourceScope};

#[derive(Debug, Clone)]
pub struct CreatePromptParams {
    pub id: String,
    pub team_id: Option<String>,
    pub created_by: String,
    pub title: String,
    pub content: String,
    pub description: Option<String>,
    pub version: String,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct UpdatePromptParams {
    pub id: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub description: Option<Option<String>>,
    pub version: Option<String>,
    pub updated_at: i64,
}

#[async_trait]
pub trait PromptRepository: Send + Sync {
    async fn insert_prompt(&self, params: CreatePromptParams) -> Result<PromptRecord>;

    async fn fetch_prompt(&self, id: &str) -> Result<Option<PromptRecord>>;

    async fn list_prompts(&self, scope: &ResourceScope) -> Result<Vec<PromptRecord>>;

    async fn update_prompt(&self, params: UpdatePromptParams) -> Result<Option<PromptRecord>>;

    async fn delete_prompt(&self, id: &str) -> Result<bool>;
}

pub type PromptRepositoryRef = Arc<dyn PromptRepository>;
