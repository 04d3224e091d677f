// Tag handlers: team tags and personal tags share one route set

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use minder_core::{db::errors::is_unique_violation, permission::ensure_can_modify, tag::TagRecord};
use tracing::info;

use super::resource_context;
use crate::{
    error::AppError,
    state::AppState,
    team::context::TeamContext,
    types::{CreateTagRequest, SuccessResponse, TagResponse, TagsResponse, UpdateTagRequest},
};

fn duplicate_or_internal(err: anyhow::Error) -> AppError {
    if is_unique_violation(&err) {
        AppError::conflict("A tag with this name already exists.")
    } else {
        AppError::from_anyhow(err)
    }
}

async fn load_tag(
    state: &AppState,
    context: &TeamContext,
    tag_id: &str,
) -> Result<TagRecord, AppError> {
    state
        .tag_store
        .get(&context.resource_scope(), tag_id)
        .await
        .map_err(AppError::from_anyhow)?
        .ok_or_else(|| AppError::tag_not_found(tag_id))
}

pub(crate) async fn list_tags_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Json<TagsResponse>, AppError> {
    let (_user, context) = resource_context(&state, &headers, &uri).await?;
    let tags = state
        .tag_store
        .list(&context.resource_scope())
        .await
        .map_err(AppError::from_anyhow)?;

    Ok(Json(TagsResponse {
        team_id: context.team_id.map(|id| id.into_inner()),
        tags: tags.into_iter().map(Into::into).collect(),
    }))
}

pub(crate) async fn create_tag_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    Json(payload): Json<CreateTagRequest>,
) -> Result<Response, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::validation("Tag name is required."));
    }

    let (user, context) = resource_context(&state, &headers, &uri).await?;
    let tag = state
        .tag_store
        .create(&context.resource_scope(), &user.id, &payload.name)
        .await
        .map_err(duplicate_or_internal)?;

    info!(
        tag_id = %tag.id,
        team_id = ?context.team_id,
        user_id = %user.id,
        "tag created"
    );
    Ok((StatusCode::CREATED, Json(TagResponse::from(tag))).into_response())
}

pub(crate) async fn update_tag_handler(
    Path(tag_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    Json(payload): Json<UpdateTagRequest>,
) -> Result<Json<TagResponse>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::validation("Tag name cannot be empty."));
    }

    let (user, context) = resource_context(&state, &headers, &uri).await?;
    let tag = load_tag(&state, &context, &tag_id).await?;
    ensure_can_modify(&tag, &user.id, context.role())?;

    let renamed = state
        .tag_store
        .rename(&tag_id, &payload.name)
        .await
        .map_err(duplicate_or_internal)?
        .ok_or_else(|| AppError::tag_not_found(&tag_id))?;

    Ok(Json(renamed.into()))
}

pub(crate) async fn delete_tag_handler(
    Path(tag_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Json<SuccessResponse>, AppError> {
    let (user, context) = resource_context(&state, &headers, &uri).await?;
    let tag = load_tag(&state, &context, &tag_id).await?;
    ensure_can_modify(&tag, &user.id, context.role())?;

    let deleted = state
        .tag_store
        .delete(&tag_id)
        .await
        .map_err(AppError::from_anyhow)?;
    if !deleted {
        return Err(AppError::tag_not_found(&tag_id));
    }

    info!(
        tag_id = %tag_id,
        team_id = ?context.team_id,
        user_id = %user.id,
        "tag deleted"
    );
    Ok(Json(SuccessResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use minder_core::membership::TeamRole;

    use crate::{
        error::ErrorKind,
        test_support::{identity_headers, seed_team_with_member, setup_state, team_headers},
    };

    fn tags_uri() -> Uri {
        Uri::from_static("/api/tags")
    }

    async fn create_tag(state: &AppState, headers: HeaderMap, name: &str) -> String {
        let response = create_tag_handler(
            State(state.clone()),
            headers,
            tags_uri(),
            Json(CreateTagRequest { name: name.into() }),
        )
        .await
        .expect("create tag");
        assert_eq!(response.status(), StatusCode::CREATED);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        json["id"].as_str().expect("tag id").to_string()
    }

    #[tokio::test]
    async fn tags_follow_the_resolved_scope() {
        let (_dir, _db, state) = setup_state().await;
        let team = seed_team_with_member(&state, "owner", "writer", TeamRole::Member).await;
        create_tag(&state, team_headers("writer", &team.id), "release").await;
        create_tag(&state, identity_headers("writer"), "personal").await;

        let Json(shared) =
            list_tags_handler(State(state.clone()), team_headers("owner", &team.id), tags_uri())
                .await
                .expect("list team tags");
        assert_eq!(shared.team_id.as_deref(), Some(team.id.as_str()));
        assert_eq!(shared.tags.len(), 1);
        assert_eq!(shared.tags[0].name, "release");
        assert_eq!(shared.tags[0].created_by.as_deref(), Some("writer"));

        let Json(mine) =
            list_tags_handler(State(state.clone()), identity_headers("writer"), tags_uri())
                .await
                .expect("list personal tags");
        assert!(mine.team_id.is_none());
        assert_eq!(mine.tags.len(), 1);
        assert_eq!(mine.tags[0].name, "personal");

        let err = list_tags_handler(
            State(state.clone()),
            team_headers("stranger", &team.id),
            tags_uri(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[tokio::test]
    async fn plain_member_cannot_edit_someone_elses_tag() {
        let (_dir, _db, state) = setup_state().await;
        let team = seed_team_with_member(&state, "owner", "writer", TeamRole::Member).await;
        let tag_id = create_tag(&state, team_headers("owner", &team.id), "release").await;

        let err = update_tag_handler(
            Path(tag_id.clone()),
            State(state.clone()),
            team_headers("writer", &team.id),
            tags_uri(),
            Json(UpdateTagRequest {
                name: "renamed".into(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let err = delete_tag_handler(
            Path(tag_id.clone()),
            State(state.clone()),
            team_headers("writer", &team.id),
            tags_uri(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let Json(renamed) = update_tag_handler(
            Path(tag_id.clone()),
            State(state.clone()),
            team_headers("owner", &team.id),
            tags_uri(),
            Json(UpdateTagRequest {
                name: "shipped".into(),
            }),
        )
        .await
        .expect("owner rename");
        assert_eq!(renamed.name, "shipped");
    }

    #[tokio::test]
    async fn creator_and_managers_may_delete() {
        let (_dir, _db, state) = setup_state().await;
        let team = seed_team_with_member(&state, "owner", "writer", TeamRole::Member).await;
        let own = create_tag(&state, team_headers("writer", &team.id), "mine").await;
        let other = create_tag(&state, team_headers("writer", &team.id), "theirs").await;

        let Json(deleted) = delete_tag_handler(
            Path(own.clone()),
            State(state.clone()),
            team_headers("writer", &team.id),
            tags_uri(),
        )
        .await
        .expect("creator delete");
        assert!(deleted.success);

        delete_tag_handler(
            Path(other),
            State(state.clone()),
            team_headers("owner", &team.id),
            tags_uri(),
        )
        .await
        .expect("owner delete");

        let err = delete_tag_handler(
            Path(own),
            State(state.clone()),
            team_headers("writer", &team.id),
            tags_uri(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn duplicate_and_blank_names_are_rejected() {
        let (_dir, _db, state) = setup_state().await;
        create_tag(&state, identity_headers("alice"), "ideas").await;

        let err = create_tag_handler(
            State(state.clone()),
            identity_headers("alice"),
            tags_uri(),
            Json(CreateTagRequest {
                name: "ideas".into(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err = create_tag_handler(
            State(state.clone()),
            identity_headers("alice"),
            tags_uri(),
            Json(CreateTagRequest { name: " ".into() }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn personal_tags_are_invisible_to_other_users() {
        let (_dir, _db, state) = setup_state().await;
        let tag_id = create_tag(&state, identity_headers("alice"), "ideas").await;

        let err = delete_tag_handler(
            Path(tag_id),
            State(state.clone()),
            identity_headers("bob"),
            tags_uri(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
