use std::fmt;

use anyhow::Error as AnyError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use minder_core::permission::PermissionDenied;
use serde::Serialize;
use serde_json::{Value as JsonValue, json};
use tracing::error;

/// Coarse classification every handler failure falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthenticated,
    Authorization,
    NotFound,
    Validation,
    Conflict,
    Internal,
}

#[derive(Debug, Clone, Copy)]
struct ErrorDescriptor {
    kind: ErrorKind,
    status: StatusCode,
    name: &'static str,
    error_type: &'static str,
    default_message: &'static str,
}

const VALIDATION_DESCRIPTOR: ErrorDescriptor = ErrorDescriptor {
    kind: ErrorKind::Validation,
    status: StatusCode::BAD_REQUEST,
    name: "VALIDATION_ERROR",
    error_type: "BAD_REQUEST",
    default_message: "Bad request.",
};

const UNAUTHENTICATED_DESCRIPTOR: ErrorDescriptor = ErrorDescriptor {
    kind: ErrorKind::Unauthenticated,
    status: StatusCode::UNAUTHORIZED,
    name: "AUTHENTICATION_REQUIRED",
    error_type: "AUTHENTICATION_REQUIRED",
    default_message: "You must sign in first to access this resource.",
};

const CONFLICT_DESCRIPTOR: ErrorDescriptor = ErrorDescriptor {
    kind: ErrorKind::Conflict,
    status: StatusCode::CONFLICT,
    name: "CONFLICT",
    error_type: "RESOURCE_CONFLICT",
    default_message: "Resource is in a conflicting state.",
};

const NOT_FOUND_DESCRIPTOR: ErrorDescriptor = ErrorDescriptor {
    kind: ErrorKind::NotFound,
    status: StatusCode::NOT_FOUND,
    name: "NOT_FOUND",
    error_type: "RESOURCE_NOT_FOUND",
    default_message: "Resource not found.",
};

const FORBIDDEN_DESCRIPTOR: ErrorDescriptor = ErrorDescriptor {
    kind: ErrorKind::Authorization,
    status: StatusCode::FORBIDDEN,
    name: "ACTION_FORBIDDEN",
    error_type: "ACTION_FORBIDDEN",
    default_message: "Action forbidden.",
};

const INTERNAL_SERVER_ERROR_DESCRIPTOR: ErrorDescriptor = ErrorDescriptor {
    kind: ErrorKind::Internal,
    status: StatusCode::INTERNAL_SERVER_ERROR,
    name: "INTERNAL_SERVER_ERROR",
    error_type: "INTERNAL_SERVER_ERROR",
    default_message: "An internal error occurred.",
};

#[derive(Debug)]
pub struct AppError {
    descriptor: &'static ErrorDescriptor,
    name: String,
    error_type: String,
    message: String,
    data: Option<JsonValue>,
    source: Option<AnyError>,
}

impl AppError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::from_descriptor(&VALIDATION_DESCRIPTOR, Some(message.into()))
    }

    pub(crate) fn unauthenticated(message: impl Into<String>) -> Self {
        Self::from_descriptor(&UNAUTHENTICATED_DESCRIPTOR, Some(message.into()))
    }

    pub(crate) fn forbidden(message: impl Into<String>) -> Self {
        Self::from_descriptor(&FORBIDDEN_DESCRIPTOR, Some(message.into()))
    }

    pub(crate) fn conflict(message: impl Into<String>) -> Self {
        Self::from_descriptor(&CONFLICT_DESCRIPTOR, Some(message.into()))
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self::from_descriptor(&NOT_FOUND_DESCRIPTOR, Some(message.into()))
    }

    pub(crate) fn internal(error: AnyError) -> Self {
        error!(?error, "internal server error");
        Self::from_descriptor(&INTERNAL_SERVER_ERROR_DESCRIPTOR, None).with_source(error)
    }

    pub(crate) fn from_anyhow(error: AnyError) -> Self {
        Self::internal(error)
    }

    pub(crate) fn team_not_found(team_id: &str) -> Self {
        let team_id = team_id.to_owned();
        let message = format!("Team {team_id} not found.");

        Self::from_descriptor(&NOT_FOUND_DESCRIPTOR, Some(message))
            .with_name("TEAM_NOT_FOUND")
            .with_data(json!({ "teamId": team_id }))
    }

    pub(crate) fn team_access_denied(team_id: &str) -> Self {
        let team_id = team_id.to_owned();
        let message = format!("You do not have permission to access Team {team_id}.");

        Self::from_descriptor(&FORBIDDEN_DESCRIPTOR, Some(message))
            .with_name("TEAM_ACCESS_DENIED")
            .with_error_type("NO_PERMISSION")
            .with_data(json!({ "teamId": team_id }))
    }

    pub(crate) fn member_not_found(team_id: &str, user_id: &str) -> Self {
        let team_id = team_id.to_owned();
        let user_id = user_id.to_owned();
        let message = format!("Member {user_id} not found in Team {team_id}.");

        Self::from_descriptor(&NOT_FOUND_DESCRIPTOR, Some(message))
            .with_name("MEMBER_NOT_FOUND")
            .with_data(json!({ "teamId": team_id, "userId": user_id }))
    }

    pub(crate) fn membership_changed(team_id: &str, user_id: &str) -> Self {
        let team_id = team_id.to_owned();
        let user_id = user_id.to_owned();
        let message =
            format!("Membership of {user_id} in Team {team_id} changed concurrently; retry.");

        Self::from_descriptor(&CONFLICT_DESCRIPTOR, Some(message))
            .with_name("MEMBERSHIP_CHANGED")
            .with_data(json!({ "teamId": team_id, "userId": user_id }))
    }

    pub(crate) fn tag_not_found(tag_id: &str) -> Self {
        let tag_id = tag_id.to_owned();
        let message = format!("Tag {tag_id} not found.");

        Self::from_descriptor(&NOT_FOUND_DESCRIPTOR, Some(message))
            .with_name("TAG_NOT_FOUND")
            .with_data(json!({ "tagId": tag_id }))
    }

    pub(crate) fn prompt_not_found(prompt_id: &str) -> Self {
        let prompt_id = prompt_id.to_owned();
        let message = format!("Prompt {prompt_id} not found.");

        Self::from_descriptor(&NOT_FOUND_DESCRIPTOR, Some(message))
            .with_name("PROMPT_NOT_FOUND")
            .with_data(json!({ "promptId": prompt_id }))
    }

    pub fn kind(&self) -> ErrorKind {
        self.descriptor.kind
    }

    pub fn status(&self) -> StatusCode {
        self.descriptor.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn into_payload(self) -> (StatusCode, UserFriendlyPayload) {
        let AppError {
            descriptor,
            name,
            error_type,
            message,
            data,
            source: _,
        } = self;

        let status = descriptor.status;
        let (code, reason) = code_and_reason(status);
        let payload = UserFriendlyPayload {
            status: status.as_u16(),
            code,
            reason,
            error_type,
            name,
            message,
            data,
        };

        (status, payload)
    }

    fn from_descriptor(descriptor: &'static ErrorDescriptor, message: Option<String>) -> Self {
        Self {
            descriptor,
            name: descriptor.name.to_owned(),
            error_type: descriptor.error_type.to_owned(),
            message: message.unwrap_or_else(|| descriptor.default_message.to_owned()),
            data: None,
            source: None,
        }
    }

    fn with_source(mut self, error: AnyError) -> Self {
        self.source = Some(error);
        self
    }

    pub(crate) fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub(crate) fn with_error_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = error_type.into();
        self
    }

    pub(crate) fn with_data(mut self, data: JsonValue) -> Self {
        self.data = Some(data);
        self
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<PermissionDenied> for AppError {
    fn from(denied: PermissionDenied) -> Self {
        Self::forbidden("You do not have permission to modify this resource.")
            .with_error_type("NO_PERMISSION")
            .with_data(json!({ "userId": denied.actor_id }))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, payload) = self.into_payload();
        (status, Json(payload)).into_response()
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct UserFriendlyPayload {
    pub(crate) status: u16,
    pub(crate) code: String,
    pub(crate) reason: String,
    #[serde(rename = "type")]
    pub(crate) error_type: String,
    pub(crate) name: String,
    pub(crate) message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) data: Option<JsonValue>,
}

fn code_and_reason(status: StatusCode) -> (String, String) {
    let reason = status
        .canonical_reason()
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("Status {}", status.as_u16()));

    let code = reason
        .chars()
        .map(|ch| match ch {
            'a'..='z' => ch.to_ascii_uppercase(),
            'A'..='Z' | '0'..='9' => ch,
            _ => '_',
        })
        .collect::<String>();

    (code, reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn payload_json(error: AppError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body_bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_payload_matches_contract() {
        let (status, json) = payload_json(AppError::validation("team name must not be empty")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["status"], 400);
        assert_eq!(json["code"], "BAD_REQUEST");
        assert_eq!(json["reason"], "Bad Request");
        assert_eq!(json["type"], "BAD_REQUEST");
        assert_eq!(json["name"], "VALIDATION_ERROR");
        assert_eq!(json["message"], "team name must not be empty");
        assert!(json.get("data").is_none());
    }

    #[tokio::test]
    async fn team_not_found_includes_team_id() {
        let (status, json) = payload_json(AppError::team_not_found("team-123")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["type"], "RESOURCE_NOT_FOUND");
        assert_eq!(json["name"], "TEAM_NOT_FOUND");
        assert_eq!(json["message"], "Team team-123 not found.");
        assert_eq!(json["data"]["teamId"], "team-123");
    }

    #[tokio::test]
    async fn team_access_denied_uses_forbidden_contract() {
        let error = AppError::team_access_denied("team-abc");
        assert_eq!(error.kind(), ErrorKind::Authorization);

        let (status, json) = payload_json(error).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["code"], "FORBIDDEN");
        assert_eq!(json["reason"], "Forbidden");
        assert_eq!(json["type"], "NO_PERMISSION");
        assert_eq!(json["name"], "TEAM_ACCESS_DENIED");
        assert_eq!(json["data"]["teamId"], "team-abc");
    }

    #[tokio::test]
    async fn conflict_and_unauthenticated_map_to_their_statuses() {
        let conflict = AppError::conflict("already a member");
        assert_eq!(conflict.kind(), ErrorKind::Conflict);
        let (status, json) = payload_json(conflict).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["code"], "CONFLICT");

        let (status, json) = payload_json(AppError::unauthenticated("missing user")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["name"], "AUTHENTICATION_REQUIRED");
    }

    #[tokio::test]
    async fn internal_errors_hide_their_cause() {
        let error = AppError::from_anyhow(anyhow::anyhow!("disk on fire"));
        assert_eq!(error.kind(), ErrorKind::Internal);

        let (status, json) = payload_json(error).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["code"], "INTERNAL_SERVER_ERROR");
        assert_eq!(json["message"], "An internal error occurred.");
    }

    #[test]
    fn permission_denied_becomes_authorization_error() {
        let error = AppError::from(PermissionDenied {
            actor_id: "bob".into(),
        });
        assert_eq!(error.kind(), ErrorKind::Authorization);
        assert_eq!(error.status(), StatusCode::FORBIDDEN);
    }
}
