// Team management handlers

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use minder_core::membership::MembershipRequirement;

use crate::{
    auth::authenticate_request,
    cookies::{build_team_hint_cookie, clear_team_hint_cookie, extract_team_hint},
    error::AppError,
    http::append_set_cookie_headers,
    team::{
        context::{PERSONAL_SCOPE_SENTINEL, normalize_team_id},
        service::{TeamPatch, TeamService},
    },
    types::{
        CreateTeamRequest, CurrentTeamResponse, InvitesResponse, ListTeamsQuery,
        SelectTeamRequest, SuccessResponse, TeamDetailResponse, TeamResponse, TeamsResponse,
        UpdateTeamRequest,
    },
};

pub(crate) async fn list_teams_handler(
    State(teams): State<Arc<TeamService>>,
    headers: HeaderMap,
    Query(query): Query<ListTeamsQuery>,
) -> Result<Json<TeamsResponse>, AppError> {
    let user = authenticate_request(&headers)?;
    let entries = teams
        .list_teams_for_user(&user.id, query.include_pending)
        .await?;

    Ok(Json(TeamsResponse {
        teams: entries.into_iter().map(Into::into).collect(),
    }))
}

pub(crate) async fn create_team_handler(
    State(teams): State<Arc<TeamService>>,
    headers: HeaderMap,
    Json(payload): Json<CreateTeamRequest>,
) -> Result<Response, AppError> {
    let user = authenticate_request(&headers)?;
    let team = teams
        .create_team(
            &user.id,
            &payload.name,
            payload.description.as_deref(),
            payload.avatar_url.as_deref(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(TeamResponse::from(team))).into_response())
}

pub(crate) async fn ensure_personal_team_handler(
    State(teams): State<Arc<TeamService>>,
    headers: HeaderMap,
) -> Result<Json<TeamResponse>, AppError> {
    let user = authenticate_request(&headers)?;
    let team = teams.ensure_personal_team(&user.id).await?;
    Ok(Json(team.into()))
}

pub(crate) async fn list_invites_handler(
    State(teams): State<Arc<TeamService>>,
    headers: HeaderMap,
) -> Result<Json<InvitesResponse>, AppError> {
    let user = authenticate_request(&headers)?;
    let invites = teams.list_pending_invites(&user.id).await?;

    Ok(Json(InvitesResponse {
        invites: invites.into_iter().map(Into::into).collect(),
    }))
}

/// Stores the caller's preferred team in the hint cookie. Passing no team,
/// or the personal sentinel, clears it.
pub(crate) async fn select_team_handler(
    State(teams): State<Arc<TeamService>>,
    headers: HeaderMap,
    Json(payload): Json<SelectTeamRequest>,
) -> Result<Response, AppError> {
    let user = authenticate_request(&headers)?;
    let team_id = payload
        .team_id
        .as_deref()
        .and_then(normalize_team_id)
        .filter(|team_id| team_id != PERSONAL_SCOPE_SENTINEL);

    let Some(team_id) = team_id else {
        let mut response = Json(CurrentTeamResponse {
            team_id: None,
            role: None,
        })
        .into_response();
        append_set_cookie_headers(&mut response, &[clear_team_hint_cookie()])?;
        return Ok(response);
    };

    let member = teams.select_team(&team_id, &user.id).await?;

    let mut response = Json(CurrentTeamResponse {
        team_id: Some(team_id.clone()),
        role: Some(member.role),
    })
    .into_response();
    append_set_cookie_headers(&mut response, &[build_team_hint_cookie(&team_id)])?;
    Ok(response)
}

pub(crate) async fn get_team_handler(
    Path(team_id): Path<String>,
    State(teams): State<Arc<TeamService>>,
    headers: HeaderMap,
) -> Result<Json<TeamDetailResponse>, AppError> {
    let user = authenticate_request(&headers)?;
    let team = teams.fetch_team(&team_id).await?;
    let membership = teams
        .require_membership(&team_id, &user.id, &MembershipRequirement::default())
        .await?;
    let members = teams.list_members(&team_id, &user.id).await?;

    Ok(Json(TeamDetailResponse {
        team: team.into(),
        membership: membership.into(),
        members: members.into_iter().map(Into::into).collect(),
    }))
}

pub(crate) async fn update_team_handler(
    Path(team_id): Path<String>,
    State(teams): State<Arc<TeamService>>,
    headers: HeaderMap,
    Json(payload): Json<UpdateTeamRequest>,
) -> Result<Json<TeamResponse>, AppError> {
    let user = authenticate_request(&headers)?;
    let team = teams
        .update_team(
            &team_id,
            &user.id,
            TeamPatch {
                name: payload.name,
                description: payload.description,
                avatar_url: payload.avatar_url,
            },
        )
        .await?;

    Ok(Json(team.into()))
}

pub(crate) async fn delete_team_handler(
    Path(team_id): Path<String>,
    State(teams): State<Arc<TeamService>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user = authenticate_request(&headers)?;
    teams.delete_team(&team_id, &user.id).await?;

    let mut response = Json(SuccessResponse { success: true }).into_response();
    if extract_team_hint(&headers).as_deref() == Some(team_id.as_str()) {
        append_set_cookie_headers(&mut response, &[clear_team_hint_cookie()])?;
    }
    Ok(response)
}
