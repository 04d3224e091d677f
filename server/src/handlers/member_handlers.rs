// Team membership handlers

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use minder_core::membership::MemberStatus;

use crate::{
    auth::{AuthenticatedUser, authenticate_request},
    cookies::{clear_team_hint_cookie, extract_team_hint},
    error::AppError,
    http::append_set_cookie_headers,
    team::service::{InviteRequest, MemberPatch, TeamService},
    types::{
        InviteMemberRequest, MembersResponse, MembershipResponse, SuccessResponse,
        TransferOwnershipRequest, UpdateMemberRequest,
    },
};

/// Path segment that stands for the authenticated caller.
const SELF_ALIAS: &str = "me";

fn resolve_target<'a>(user: &'a AuthenticatedUser, target: &'a str) -> &'a str {
    if target == SELF_ALIAS {
        user.id.as_str()
    } else {
        target
    }
}

pub(crate) async fn list_members_handler(
    Path(team_id): Path<String>,
    State(teams): State<Arc<TeamService>>,
    headers: HeaderMap,
) -> Result<Json<MembersResponse>, AppError> {
    let user = authenticate_request(&headers)?;
    let members = teams.list_members(&team_id, &user.id).await?;

    Ok(Json(MembersResponse {
        members: members.into_iter().map(Into::into).collect(),
    }))
}

pub(crate) async fn invite_member_handler(
    Path(team_id): Path<String>,
    State(teams): State<Arc<TeamService>>,
    headers: HeaderMap,
    Json(payload): Json<InviteMemberRequest>,
) -> Result<Response, AppError> {
    let user = authenticate_request(&headers)?;
    let member = teams
        .invite_member(
            &team_id,
            &user.id,
            InviteRequest {
                user_id: payload.user_id,
                email: payload.email,
                role: payload.role,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MembershipResponse {
            membership: member.into(),
        }),
    )
        .into_response())
}

/// Role changes by managers, removal via `status=removed`, and invite
/// acceptance when a caller activates their own row.
pub(crate) async fn update_member_handler(
    Path((team_id, target)): Path<(String, String)>,
    State(teams): State<Arc<TeamService>>,
    headers: HeaderMap,
    Json(payload): Json<UpdateMemberRequest>,
) -> Result<Json<MembershipResponse>, AppError> {
    let user = authenticate_request(&headers)?;
    let target_user_id = resolve_target(&user, &target);

    let member = if target_user_id == user.id.as_str()
        && payload.status == Some(MemberStatus::Active)
    {
        teams
            .accept_invite(&team_id, &user.id, user.email.as_deref())
            .await?
    } else {
        teams
            .update_member(
                &team_id,
                target_user_id,
                &user.id,
                MemberPatch {
                    role: payload.role,
                    status: payload.status,
                },
            )
            .await?
    };

    Ok(Json(MembershipResponse {
        membership: member.into(),
    }))
}

pub(crate) async fn remove_member_handler(
    Path((team_id, target)): Path<(String, String)>,
    State(teams): State<Arc<TeamService>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user = authenticate_request(&headers)?;
    let target_user_id = resolve_target(&user, &target);
    let leaving = target_user_id == user.id.as_str();

    let member = teams
        .remove_member(&team_id, target_user_id, &user.id)
        .await?;

    let mut response = Json(MembershipResponse {
        membership: member.into(),
    })
    .into_response();
    if leaving && extract_team_hint(&headers).as_deref() == Some(team_id.as_str()) {
        append_set_cookie_headers(&mut response, &[clear_team_hint_cookie()])?;
    }
    Ok(response)
}

pub(crate) async fn transfer_ownership_handler(
    Path(team_id): Path<String>,
    State(teams): State<Arc<TeamService>>,
    headers: HeaderMap,
    Json(payload): Json<TransferOwnershipRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let user = authenticate_request(&headers)?;
    teams
        .transfer_ownership(&team_id, &user.id, payload.target_user_id.as_deref())
        .await?;

    Ok(Json(SuccessResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, header::COOKIE};
    use minder_core::membership::TeamRole;

    use crate::{
        error::ErrorKind,
        test_support::{email_for, identity_headers, seed_team_with_member, setup_state},
    };

    #[tokio::test]
    async fn invite_and_self_activation_flow() {
        let (_dir, _db, state) = setup_state().await;
        let team = state
            .team_service
            .create_team("owner", "Writers", None, None)
            .await
            .expect("team");

        let response = invite_member_handler(
            Path(team.id.to_string()),
            State(state.team_service.clone()),
            identity_headers("owner"),
            Json(InviteMemberRequest {
                user_id: Some("guest".into()),
                email: Some(email_for("guest")),
                role: Some(TeamRole::Admin),
            }),
        )
        .await
        .expect("invite");
        assert_eq!(response.status(), StatusCode::CREATED);

        let Json(accepted) = update_member_handler(
            Path((team.id.to_string(), SELF_ALIAS.to_string())),
            State(state.team_service.clone()),
            identity_headers("guest"),
            Json(UpdateMemberRequest {
                status: Some(MemberStatus::Active),
                ..UpdateMemberRequest::default()
            }),
        )
        .await
        .expect("accept");
        assert_eq!(accepted.membership.status, MemberStatus::Active);
        assert_eq!(accepted.membership.role, TeamRole::Admin);

        let Json(members) = list_members_handler(
            Path(team.id.to_string()),
            State(state.team_service.clone()),
            identity_headers("guest"),
        )
        .await
        .expect("members");
        assert_eq!(members.members.len(), 2);
    }

    #[tokio::test]
    async fn manager_cannot_activate_someone_else() {
        let (_dir, _db, state) = setup_state().await;
        let team = state
            .team_service
            .create_team("owner", "Writers", None, None)
            .await
            .expect("team");
        state
            .team_service
            .invite_member(
                &team.id,
                "owner",
                InviteRequest {
                    user_id: Some("guest".into()),
                    email: Some(email_for("guest")),
                    role: None,
                },
            )
            .await
            .expect("invite");

        let err = update_member_handler(
            Path((team.id.to_string(), "guest".to_string())),
            State(state.team_service.clone()),
            identity_headers("owner"),
            Json(UpdateMemberRequest {
                status: Some(MemberStatus::Active),
                ..UpdateMemberRequest::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn leaving_clears_matching_hint_cookie() {
        let (_dir, _db, state) = setup_state().await;
        let team = seed_team_with_member(&state, "owner", "writer", TeamRole::Member).await;

        let mut headers = identity_headers("writer");
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("minder_team={}", team.id)).unwrap(),
        );

        let response = remove_member_handler(
            Path((team.id.to_string(), SELF_ALIAS.to_string())),
            State(state.team_service.clone()),
            headers,
        )
        .await
        .expect("leave");
        assert!(response.headers().contains_key("set-cookie"));

        let member = state
            .team_service
            .find_membership(&team.id, "writer")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(member.status, MemberStatus::Removed);
        assert!(member.left_at.is_some());
    }

    #[tokio::test]
    async fn owner_cannot_leave_without_transfer() {
        let (_dir, _db, state) = setup_state().await;
        let team = seed_team_with_member(&state, "owner", "writer", TeamRole::Member).await;

        let err = remove_member_handler(
            Path((team.id.to_string(), SELF_ALIAS.to_string())),
            State(state.team_service.clone()),
            identity_headers("owner"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = remove_member_handler(
            Path((team.id.to_string(), "owner".to_string())),
            State(state.team_service.clone()),
            identity_headers("writer"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[tokio::test]
    async fn transfer_leaves_exactly_one_owner() {
        let (_dir, _db, state) = setup_state().await;
        let team = seed_team_with_member(&state, "owner", "writer", TeamRole::Member).await;

        let Json(result) = transfer_ownership_handler(
            Path(team.id.to_string()),
            State(state.team_service.clone()),
            identity_headers("owner"),
            Json(TransferOwnershipRequest {
                target_user_id: Some("writer".into()),
            }),
        )
        .await
        .expect("transfer");
        assert!(result.success);

        let Json(members) = list_members_handler(
            Path(team.id.to_string()),
            State(state.team_service.clone()),
            identity_headers("writer"),
        )
        .await
        .expect("members");
        let owners: Vec<_> = members
            .members
            .iter()
            .filter(|member| member.role == TeamRole::Owner)
            .collect();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].user_id, "writer");
        let previous = members
            .members
            .iter()
            .find(|member| member.user_id == "owner")
            .unwrap();
        assert_eq!(previous.role, TeamRole::Admin);

        let team = state.team_service.fetch_team(&team.id).await.unwrap();
        assert_eq!(team.owner_id.as_str(), "writer");

        let err = transfer_ownership_handler(
            Path(team.id.to_string()),
            State(state.team_service.clone()),
            identity_headers("owner"),
            Json(TransferOwnershipRequest {
                target_user_id: Some("owner".into()),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
