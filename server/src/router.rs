// Router configuration

use axum::{
    Router,
    http::Method,
    routing::{get, patch, post, put},
};
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{
        health_handlers::*, member_handlers::*, prompt_handlers::*, tag_handlers::*,
        team_handlers::*,
    },
    observability,
    state::AppState,
};

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    Router::new()
        // Health & Info
        .route("/health", get(health_handler))
        .route("/info", get(info_handler))
        // Teams
        .route(
            "/api/teams",
            get(list_teams_handler).post(create_team_handler),
        )
        .route("/api/teams/personal", post(ensure_personal_team_handler))
        .route("/api/teams/invites", get(list_invites_handler))
        .route("/api/teams/current", put(select_team_handler))
        .route(
            "/api/teams/{team_id}",
            get(get_team_handler)
                .patch(update_team_handler)
                .delete(delete_team_handler),
        )
        // Members
        .route(
            "/api/teams/{team_id}/members",
            get(list_members_handler).post(invite_member_handler),
        )
        .route(
            "/api/teams/{team_id}/members/{user_id}",
            patch(update_member_handler).delete(remove_member_handler),
        )
        .route(
            "/api/teams/{team_id}/transfer",
            post(transfer_ownership_handler),
        )
        // Prompts
        .route(
            "/api/prompts",
            get(list_prompts_handler).post(create_prompt_handler),
        )
        .route(
            "/api/prompts/{prompt_id}",
            get(get_prompt_handler)
                .patch(update_prompt_handler)
                .delete(delete_prompt_handler),
        )
        // Tags
        .route("/api/tags", get(list_tags_handler).post(create_tag_handler))
        .route(
            "/api/tags/{tag_id}",
            patch(update_tag_handler).delete(delete_tag_handler),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(observability::http_make_span())
                .on_response(observability::response_logger()),
        )
        .layer(cors)
        .layer(observability::request_context_layer())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header::CONTENT_TYPE},
    };
    use tower::ServiceExt;

    use crate::{
        handlers::headers::{HEADER_TEAM_ID, HEADER_USER_ID},
        test_support::setup_state,
    };

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_route_responds() {
        let (_dir, _db, state) = setup_state().await;
        let response = build_router(state)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn team_and_prompt_routes_round_trip() {
        let (_dir, _db, state) = setup_state().await;
        let app = build_router(state);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/teams")
                    .header(HEADER_USER_ID, "alice")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name":"Writers"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let team_id = json_body(response).await["id"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/prompts")
                    .header(HEADER_USER_ID, "alice")
                    .header(HEADER_TEAM_ID, team_id.as_str())
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"title":"Greeting","content":"Say hi"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/prompts?teamId={team_id}"))
                    .header(HEADER_USER_ID, "bob")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let payload = json_body(response).await;
        assert_eq!(payload["name"], "TEAM_ACCESS_DENIED");
        assert_eq!(payload["status"], 403);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri(format!("/api/tags?teamId={team_id}"))
                    .header(HEADER_USER_ID, "alice")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name":"release"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(json_body(response).await["teamId"], team_id.as_str());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/teams")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
