// Prompt handlers, scoped by the resolved team context

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use minder_core::{
    permission::ensure_can_modify,
    prompt::{PromptPatch, PromptRecord},
};
use tracing::info;

use super::resource_context;
use crate::{
    error::AppError,
    state::AppState,
    team::context::TeamContext,
    types::{
        CreatePromptRequest, PromptResponse, PromptsResponse, SuccessResponse,
        UpdatePromptRequest,
    },
};

async fn load_prompt(
    state: &AppState,
    context: &TeamContext,
    prompt_id: &str,
) -> Result<PromptRecord, AppError> {
    state
        .prompt_store
        .get(&context.resource_scope(), prompt_id)
        .await
        .map_err(AppError::from_anyhow)?
        .ok_or_else(|| AppError::prompt_not_found(prompt_id))
}

pub(crate) async fn list_prompts_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Json<PromptsResponse>, AppError> {
    let (_user, context) = resource_context(&state, &headers, &uri).await?;
    let prompts = state
        .prompt_store
        .list(&context.resource_scope())
        .await
        .map_err(AppError::from_anyhow)?;

    Ok(Json(PromptsResponse {
        team_id: context.team_id.map(|id| id.into_inner()),
        prompts: prompts.into_iter().map(Into::into).collect(),
    }))
}

pub(crate) async fn create_prompt_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    Json(payload): Json<CreatePromptRequest>,
) -> Result<Response, AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::validation("Prompt title is required."));
    }

    let (user, context) = resource_context(&state, &headers, &uri).await?;
    let prompt = state
        .prompt_store
        .create(
            &context.resource_scope(),
            &user.id,
            &payload.title,
            &payload.content,
            payload.description.as_deref(),
            payload.version.as_deref(),
        )
        .await
        .map_err(AppError::from_anyhow)?;

    info!(
        prompt_id = %prompt.id,
        team_id = ?context.team_id,
        user_id = %user.id,
        "prompt created"
    );
    Ok((StatusCode::CREATED, Json(PromptResponse::from(prompt))).into_response())
}

pub(crate) async fn get_prompt_handler(
    Path(prompt_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Json<PromptResponse>, AppError> {
    let (_user, context) = resource_context(&state, &headers, &uri).await?;
    let prompt = load_prompt(&state, &context, &prompt_id).await?;
    Ok(Json(prompt.into()))
}

pub(crate) async fn update_prompt_handler(
    Path(prompt_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    Json(payload): Json<UpdatePromptRequest>,
) -> Result<Json<PromptResponse>, AppError> {
    if payload
        .title
        .as_deref()
        .is_some_and(|title| title.trim().is_empty())
    {
        return Err(AppError::validation("Prompt title cannot be empty."));
    }

    let (user, context) = resource_context(&state, &headers, &uri).await?;
    let prompt = load_prompt(&state, &context, &prompt_id).await?;
    ensure_can_modify(&prompt, &user.id, context.role())?;

    let updated = state
        .prompt_store
        .update(
            &prompt_id,
            PromptPatch {
                title: payload.title,
                content: payload.content,
                description: payload.description,
                version: payload.version,
            },
        )
        .await
        .map_err(AppError::from_anyhow)?
        .ok_or_else(|| AppError::prompt_not_found(&prompt_id))?;

    Ok(Json(updated.into()))
}

pub(crate) async fn delete_prompt_handler(
    Path(prompt_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Json<SuccessResponse>, AppError> {
    let (user, context) = resource_context(&state, &headers, &uri).await?;
    let prompt = load_prompt(&state, &context, &prompt_id).await?;
    ensure_can_modify(&prompt, &user.id, context.role())?;

    let deleted = state
        .prompt_store
        .delete(&prompt_id)
        .await
        .map_err(AppError::from_anyhow)?;
    if !deleted {
        return Err(AppError::prompt_not_found(&prompt_id));
    }

    info!(
        prompt_id = %prompt_id,
        team_id = ?context.team_id,
        user_id = %user.id,
        "prompt deleted"
    );
    Ok(Json(SuccessResponse { success: true }))
}
