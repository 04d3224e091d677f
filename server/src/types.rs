// Request and response types for REST API handlers

use minder_core::{
    membership::{MemberStatus, TeamRole},
    prompt::PromptRecord,
    tag::TagRecord,
    team::{TeamRecord, UserTeamMembership},
    team_member::TeamMemberRecord,
};
use serde::{Deserialize, Deserializer, Serialize};

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`).
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

fn default_true() -> bool {
    true
}

// ========== Request Types ==========

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateTeamRequest {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) avatar_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateTeamRequest {
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub(crate) description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub(crate) avatar_url: Option<Option<String>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListTeamsQuery {
    #[serde(default = "default_true")]
    pub(crate) include_pending: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SelectTeamRequest {
    #[serde(default)]
    pub(crate) team_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InviteMemberRequest {
    #[serde(default)]
    pub(crate) user_id: Option<String>,
    #[serde(default)]
    pub(crate) email: Option<String>,
    #[serde(default)]
    pub(crate) role: Option<TeamRole>,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct UpdateMemberRequest {
    #[serde(default)]
    pub(crate) role: Option<TeamRole>,
    #[serde(default)]
    pub(crate) status: Option<MemberStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransferOwnershipRequest {
    #[serde(default)]
    pub(crate) target_user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatePromptRequest {
    pub(crate) title: String,
    pub(crate) content: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) version: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct UpdatePromptRequest {
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) content: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub(crate) description: Option<Option<String>>,
    #[serde(default)]
    pub(crate) version: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateTagRequest {
    pub(crate) name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateTagRequest {
    pub(crate) name: String,
}

// ========== Response Types ==========

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: &'static str,
    pub(crate) version: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SuccessResponse {
    pub(crate) success: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TeamResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) avatar_url: Option<String>,
    pub(crate) is_personal: bool,
    pub(crate) owner_id: String,
    pub(crate) created_by: String,
    pub(crate) created_at: i64,
    pub(crate) updated_at: i64,
}

impl From<TeamRecord> for TeamResponse {
    fn from(team: TeamRecord) -> Self {
        Self {
            id: team.id.into_inner(),
            name: team.name,
            description: team.description,
            avatar_url: team.avatar_url,
            is_personal: team.is_personal,
            owner_id: team.owner_id.into_inner(),
            created_by: team.created_by.into_inner(),
            created_at: team.created_at,
            updated_at: team.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MemberResponse {
    pub(crate) id: String,
    pub(crate) team_id: String,
    pub(crate) user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) email: Option<String>,
    pub(crate) role: TeamRole,
    pub(crate) status: MemberStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) invited_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) invited_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) joined_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) left_at: Option<i64>,
}

impl From<TeamMemberRecord> for MemberResponse {
    fn from(member: TeamMemberRecord) -> Self {
        Self {
            id: member.id.into_inner(),
            team_id: member.team_id.into_inner(),
            user_id: member.user_id.into_inner(),
            email: member.email,
            role: member.role,
            status: member.status,
            invited_by: member.invited_by,
            invited_at: member.invited_at,
            joined_at: member.joined_at,
            left_at: member.left_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserTeamResponse {
    pub(crate) team: TeamResponse,
    pub(crate) membership_id: String,
    pub(crate) role: TeamRole,
    pub(crate) status: MemberStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) invited_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) joined_at: Option<i64>,
}

impl From<UserTeamMembership> for UserTeamResponse {
    fn from(entry: UserTeamMembership) -> Self {
        Self {
            team: entry.team.into(),
            membership_id: entry.membership_id.into_inner(),
            role: entry.role,
            status: entry.status,
            invited_at: entry.invited_at,
            joined_at: entry.joined_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TeamsResponse {
    pub(crate) teams: Vec<UserTeamResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct InvitesResponse {
    pub(crate) invites: Vec<UserTeamResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TeamDetailResponse {
    pub(crate) team: TeamResponse,
    pub(crate) membership: MemberResponse,
    pub(crate) members: Vec<MemberResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct MembersResponse {
    pub(crate) members: Vec<MemberResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct MembershipResponse {
    pub(crate) membership: MemberResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CurrentTeamResponse {
    pub(crate) team_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) role: Option<TeamRole>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PromptResponse {
    pub(crate) id: String,
    pub(crate) team_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) created_by: Option<String>,
    pub(crate) title: String,
    pub(crate) content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) description: Option<String>,
    pub(crate) version: String,
    pub(crate) created_at: i64,
    pub(crate) updated_at: i64,
}

impl From<PromptRecord> for PromptResponse {
    fn from(prompt: PromptRecord) -> Self {
        Self {
            id: prompt.id.into_inner(),
            team_id: prompt.team_id.map(|id| id.into_inner()),
            created_by: prompt
                .created_by
                .or(prompt.user_id)
                .map(|id| id.into_inner()),
            title: prompt.title,
            content: prompt.content,
            description: prompt.description,
            version: prompt.version,
            created_at: prompt.created_at,
            updated_at: prompt.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PromptsResponse {
    pub(crate) team_id: Option<String>,
    pub(crate) prompts: Vec<PromptResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TagResponse {
    pub(crate) id: String,
    pub(crate) team_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) created_by: Option<String>,
    pub(crate) name: String,
    pub(crate) created_at: i64,
    pub(crate) updated_at: i64,
}

impl From<TagRecord> for TagResponse {
    fn from(tag: TagRecord) -> Self {
        Self {
            id: tag.id.into_inner(),
            team_id: tag.team_id.map(|id| id.into_inner()),
            created_by: tag.created_by.or(tag.user_id).map(|id| id.into_inner()),
            name: tag.name,
            created_at: tag.created_at,
            updated_at: tag.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TagsResponse {
    pub(crate) team_id: Option<String>,
    pub(crate) tags: Vec<TagResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_requests_distinguish_null_from_absent() {
        let cleared: UpdateTeamRequest =
            serde_json::from_str(r#"{"description": null}"#).expect("parse");
        assert_eq!(cleared.description, Some(None));
        assert_eq!(cleared.avatar_url, None);

        let set: UpdatePromptRequest =
            serde_json::from_str(r#"{"description": "notes"}"#).expect("parse");
        assert_eq!(set.description, Some(Some("notes".to_string())));
    }

    #[test]
    fn list_teams_query_includes_pending_by_default() {
        let query: ListTeamsQuery = serde_json::from_str("{}").expect("parse");
        assert!(query.include_pending);
    }
}
