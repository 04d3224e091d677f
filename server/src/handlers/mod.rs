// HTTP handlers module structure

use axum::http::{HeaderMap, Uri};

use crate::{
    auth::{AuthenticatedUser, authenticate_request},
    error::AppError,
    state::AppState,
    team::context::{TeamContext, TeamContextOptions, resolve_team_context},
};

pub(crate) mod headers;
pub(crate) mod health_handlers;
pub(crate) mod member_handlers;
pub(crate) mod prompt_handlers;
pub(crate) mod tag_handlers;
pub(crate) mod team_handlers;

/// Caller and scope for prompt and tag routes; no team selects the personal
/// space.
pub(crate) async fn resource_context(
    state: &AppState,
    headers: &HeaderMap,
    uri: &Uri,
) -> Result<(AuthenticatedUser, TeamContext), AppError> {
    let user = authenticate_request(headers)?;
    let context = resolve_team_context(
        &state.team_service,
        headers,
        uri,
        &user.id,
        &TeamContextOptions::personal_fallback(),
    )
    .await?;
    Ok((user, context))
}
