// Request identity as asserted by the upstream gateway

use axum::http::HeaderMap;
use minder_core::{ids::UserId, team::TeamStore};

use crate::{
    error::AppError,
    handlers::headers::{HEADER_USER_EMAIL, HEADER_USER_ID},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: UserId,
    /// Verified primary email, normalized to lowercase.
    pub email: Option<String>,
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

pub(crate) fn authenticate_request(headers: &HeaderMap) -> Result<AuthenticatedUser, AppError> {
    let user_id = header_value(headers, HEADER_USER_ID)
        .ok_or_else(|| AppError::unauthenticated("You must sign in first to access this resource."))?;

    Ok(AuthenticatedUser {
        id: UserId::from(user_id),
        email: header_value(headers, HEADER_USER_EMAIL).and_then(TeamStore::normalize_email),
    })
}
