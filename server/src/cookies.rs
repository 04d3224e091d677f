use std::env;
use std::sync::OnceLock;

use axum::http::{HeaderMap, header::COOKIE};
use cookie::{Cookie, SameSite};
use time::Duration;

/// Client-side hint naming the team the user last selected. Never trusted on
/// its own; membership is re-checked on every request.
pub const TEAM_HINT_COOKIE_NAME: &str = "minder_team";

const COOKIE_PATH: &str = "/";
const TEAM_HINT_TTL_DAYS: i64 = 365;

fn cookie_secure() -> bool {
    static SECURE: OnceLock<bool> = OnceLock::new();
    *SECURE.get_or_init(|| match env::var("MINDER_COOKIE_SECURE") {
        Ok(value) => {
            let normalized = value.to_ascii_lowercase();
            matches!(normalized.as_str(), "1" | "true" | "yes" | "on")
        }
        Err(_) => false,
    })
}

pub fn build_team_hint_cookie(team_id: &str) -> String {
    let mut builder = Cookie::build((TEAM_HINT_COOKIE_NAME, team_id.to_owned()))
        .path(COOKIE_PATH)
        .same_site(SameSite::Lax)
        .max_age(Duration::days(TEAM_HINT_TTL_DAYS));

    if cookie_secure() {
        builder = builder.secure(true);
    }

    builder.build().to_string()
}

pub fn clear_team_hint_cookie() -> String {
    let mut builder = Cookie::build(TEAM_HINT_COOKIE_NAME)
        .path(COOKIE_PATH)
        .same_site(SameSite::Lax)
        .removal();

    if cookie_secure() {
        builder = builder.secure(true);
    }

    builder.build().to_string()
}

pub(crate) fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for raw in headers.get_all(COOKIE) {
        let Ok(raw) = raw.to_str() else {
            continue;
        };
        for cookie in Cookie::split_parse(raw).flatten() {
            if cookie.name() == name {
                return Some(cookie.value().to_owned());
            }
        }
    }
    None
}

pub(crate) fn extract_team_hint(headers: &HeaderMap) -> Option<String> {
    extract_cookie(headers, TEAM_HINT_COOKIE_NAME)
}
