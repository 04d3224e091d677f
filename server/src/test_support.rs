#![allow(dead_code)]

use axum::http::{HeaderMap, HeaderValue};
use minder_core::{config::AppConfig, db::Database, membership::TeamRole, team::TeamRecord};
use tempfile::TempDir;

use crate::{
    handlers::headers::{HEADER_TEAM_ID, HEADER_USER_EMAIL, HEADER_USER_ID},
    state::{AppState, build_state},
    team::service::InviteRequest,
};

pub(crate) async fn setup_state() -> (TempDir, Database, AppState) {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let mut config = AppConfig::default();
    let db_path = temp_dir.path().join("test.db");
    config.database_path = db_path.to_string_lossy().into_owned();

    let database = Database::connect(&config).await.expect("connect database");
    let state = build_state(&database, &config);

    (temp_dir, database, state)
}

pub(crate) fn email_for(user_id: &str) -> String {
    format!("{user_id}@example.com")
}

/// Creates a team owned by `owner` with `member` invited and accepted.
pub(crate) async fn seed_team_with_member(
    state: &AppState,
    owner: &str,
    member: &str,
    role: TeamRole,
) -> TeamRecord {
    let team = state
        .team_service
        .create_team(owner, "Seeded Team", None, None)
        .await
        .expect("create team");
    state
        .team_service
        .invite_member(
            &team.id,
            owner,
            InviteRequest {
                user_id: Some(member.to_owned()),
                email: Some(email_for(member)),
                role: Some(role),
            },
        )
        .await
        .expect("invite member");
    state
        .team_service
        .accept_invite(&team.id, member, Some(email_for(member).as_str()))
        .await
        .expect("accept invite");
    team
}

/// Identity headers the gateway would attach for `user_id`.
pub(crate) fn identity_headers(user_id: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        HEADER_USER_ID,
        HeaderValue::from_str(user_id).expect("user id header"),
    );
    headers.insert(
        HEADER_USER_EMAIL,
        HeaderValue::from_str(&email_for(user_id)).expect("email header"),
    );
    headers
}

pub(crate) fn team_headers(user_id: &str, team_id: &str) -> HeaderMap {
    let mut headers = identity_headers(user_id);
    headers.insert(
        HEADER_TEAM_ID,
        HeaderValue::from_str(team_id).expect("team header"),
    );
    headers
}
