use std::{env, sync::Arc};

use serde::Serialize;

use minder_core::{
    config::AppConfig, db::Database, prompt::PromptStore, tag::TagStore, team::TeamStore,
};

use crate::team::service::TeamService;

#[derive(Clone)]
pub struct AppState {
    pub prompt_store: PromptStore,
    pub tag_store: TagStore,
    pub team_service: Arc<TeamService>,
    pub metadata: ServerMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerMetadata {
    pub version: String,
    pub message: String,
}

impl ServerMetadata {
    pub fn load() -> Self {
        let version = env::var("MINDER_VERSION")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

        let message = env::var("MINDER_SERVER_MESSAGE")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| format!("Prompt Minder {version} Server"));

        Self { version, message }
    }
}

pub fn build_state(database: &Database, app_config: &AppConfig) -> AppState {
    let team_store = TeamStore::new(database);
    let team_service = Arc::new(TeamService::new(team_store, app_config.max_owned_teams));

    AppState {
        prompt_store: PromptStore::new(database),
        tag_store: TagStore::new(database),
        team_service,
        metadata: ServerMetadata::load(),
    }
}
