pub(crate) const HEADER_USER_ID: &str = "x-minder-user-id";
pub(crate) const HEADER_USER_EMAIL: &str = "x-minder-user-email";
pub(crate) const HEADER_TEAM_ID: &str = "x-team-id";
pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";
