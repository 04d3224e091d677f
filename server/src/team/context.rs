use axum::{
    extract::Query,
    http::{HeaderMap, Uri},
};
use minder_core::{
    ids::{TeamId, UserId},
    membership::TeamRole,
    scope::ResourceScope,
    team_member::TeamMemberRecord,
};
use serde::Deserialize;
use tracing::debug;

use crate::{
    AppError, cookies::extract_team_hint, handlers::headers::HEADER_TEAM_ID,
    team::service::TeamService,
};

/// Team id value that always selects the caller's personal space.
pub const PERSONAL_SCOPE_SENTINEL: &str = "personal";

#[derive(Debug, Clone)]
pub struct TeamContextOptions {
    pub require_membership: bool,
    pub allow_missing_team: bool,
    pub allowed_roles: Vec<TeamRole>,
}

impl Default for TeamContextOptions {
    fn default() -> Self {
        Self {
            require_membership: true,
            allow_missing_team: false,
            allowed_roles: TeamRole::ALL.to_vec(),
        }
    }
}

impl TeamContextOptions {
    pub fn personal_fallback() -> Self {
        Self {
            allow_missing_team: true,
            ..Self::default()
        }
    }
}

/// Where the resolved scope came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeSource {
    Explicit,
    Hint,
    Sentinel,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct TeamContext {
    pub user_id: UserId,
    pub team_id: Option<TeamId>,
    /// Present exactly when `team_id` is; always an active row.
    pub membership: Option<TeamMemberRecord>,
    pub source: ScopeSource,
}

impl TeamContext {
    fn personal(user_id: &str, source: ScopeSource) -> Self {
        Self {
            user_id: UserId::from(user_id),
            team_id: None,
            membership: None,
            source,
        }
    }

    pub fn is_personal(&self) -> bool {
        self.team_id.is_none()
    }

    pub fn role(&self) -> Option<TeamRole> {
        self.membership.as_ref().map(|member| member.role)
    }

    pub fn resource_scope(&self) -> ResourceScope {
        match &self.team_id {
            Some(team_id) => ResourceScope::Team(team_id.clone()),
            None => ResourceScope::Personal(self.user_id.clone()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct TeamScopeQuery {
    #[serde(rename = "teamId")]
    team_id_camel: Option<String>,
    team_id: Option<String>,
}

pub(crate) fn normalize_team_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" || trimmed == "undefined" {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

/// Team id supplied by the request itself: the `x-team-id` header, then the
/// `teamId` / `team_id` query parameters.
pub(crate) fn explicit_team_id(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    let from_header = headers
        .get(HEADER_TEAM_ID)
        .and_then(|value| value.to_str().ok())
        .and_then(normalize_team_id);
    if from_header.is_some() {
        return from_header;
    }

    let Query(query) = Query::<TeamScopeQuery>::try_from_uri(uri).unwrap_or_default();
    query
        .team_id_camel
        .as_deref()
        .and_then(normalize_team_id)
        .or_else(|| query.team_id.as_deref().and_then(normalize_team_id))
}

/// Decides whether the request acts in the caller's personal space or in a
/// team, confirming membership for the latter. Never writes.
///
/// A hint cookie naming a team the caller is no longer an active member of
/// falls back to personal scope whenever `allow_missing_team` is set, even
/// with `require_membership`; only an explicit header or query id is denied.
pub async fn resolve_team_context(
    service: &TeamService,
    headers: &HeaderMap,
    uri: &Uri,
    user_id: &str,
    options: &TeamContextOptions,
) -> Result<TeamContext, AppError> {
    let candidate = explicit_team_id(headers, uri)
        .map(|id| (id, ScopeSource::Explicit))
        .or_else(|| {
            extract_team_hint(headers)
                .as_deref()
                .and_then(normalize_team_id)
                .map(|id| (id, ScopeSource::Hint))
        });

    let Some((team_id, source)) = candidate else {
        if options.allow_missing_team {
            return Ok(TeamContext::personal(user_id, ScopeSource::Fallback));
        }
        return Err(AppError::validation("Team identifier is required."));
    };

    if team_id == PERSONAL_SCOPE_SENTINEL {
        return Ok(TeamContext::personal(user_id, ScopeSource::Sentinel));
    }

    let membership = service
        .find_membership(&team_id, user_id)
        .await?
        .filter(TeamMemberRecord::is_active);

    let Some(membership) = membership else {
        // A stale hint cookie is not the caller's request; let it lapse.
        if source == ScopeSource::Hint && options.allow_missing_team {
            debug!(team_id = %team_id, user_id, "ignoring stale team hint");
            return Ok(TeamContext::personal(user_id, ScopeSource::Fallback));
        }
        if options.require_membership {
            return Err(AppError::team_access_denied(&team_id));
        }
        if options.allow_missing_team {
            return Ok(TeamContext::personal(user_id, ScopeSource::Fallback));
        }
        return Err(AppError::team_not_found(&team_id));
    };

    if !options.allowed_roles.contains(&membership.role) {
        return Err(AppError::forbidden("Insufficient permissions for this action."));
    }

    Ok(TeamContext {
        user_id: UserId::from(user_id),
        team_id: Some(membership.team_id.clone()),
        membership: Some(membership),
        source,
    })
}
