use std::{fmt, str::FromStr};

use anyhow::{Error, anyhow};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    Owner,
    Admin,
    Member,
}

impl TeamRole {
    pub const ALL: [TeamRole; 3] = [TeamRole::Owner, TeamRole::Admin, TeamRole::Member];

    pub fn as_str(self) -> &'static str {
        match self {
            TeamRole::Owner => "owner",
            TeamRole::Admin => "admin",
            TeamRole::Member => "member",
        }
    }

    /// Owners and admins may manage members and any team-owned resource.
    pub fn is_manager(self) -> bool {
        matches!(self, TeamRole::Owner | TeamRole::Admin)
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "owner" => Some(TeamRole::Owner),
            "admin" => Some(TeamRole::Admin),
            "member" => Some(TeamRole::Member),
            _ => None,
        }
    }
}

impl fmt::Display for TeamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TeamRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| anyhow!("unknown team role: {s}"))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Pending,
    Active,
    Removed,
}

impl MemberStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MemberStatus::Pending => "pending",
            MemberStatus::Active => "active",
            MemberStatus::Removed => "removed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(MemberStatus::Pending),
            "active" => Some(MemberStatus::Active),
            "removed" => Some(MemberStatus::Removed),
            _ => None,
        }
    }

    /// Transitions the membership lifecycle permits.
    ///
    /// `Removed -> Pending` is a re-invite: the (team, user) pair keeps a single
    /// row, so a fresh invitation revives the removed row instead of inserting.
    pub fn can_transition_to(self, next: MemberStatus) -> bool {
        matches!(
            (self, next),
            (MemberStatus::Pending, MemberStatus::Active)
                | (MemberStatus::Pending, MemberStatus::Removed)
                | (MemberStatus::Active, MemberStatus::Removed)
                | (MemberStatus::Removed, MemberStatus::Pending)
        )
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| anyhow!("unknown member status: {s}"))
    }
}

/// Which roles and statuses a membership must hold to pass a check.
#[derive(Debug, Clone)]
pub struct MembershipRequirement {
    pub roles: Vec<TeamRole>,
    pub statuses: Vec<MemberStatus>,
}

impl Default for MembershipRequirement {
    fn default() -> Self {
        Self {
            roles: TeamRole::ALL.to_vec(),
            statuses: vec![MemberStatus::Active],
        }
    }
}

impl MembershipRequirement {
    pub fn managers() -> Self {
        Self {
            roles: vec![TeamRole::Owner, TeamRole::Admin],
            ..Self::default()
        }
    }

    pub fn owner() -> Self {
        Self {
            roles: vec![TeamRole::Owner],
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manager_roles() {
        assert!(TeamRole::Owner.is_manager());
        assert!(TeamRole::Admin.is_manager());
        assert!(!TeamRole::Member.is_manager());
    }

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!(TeamRole::parse(" Admin "), Some(TeamRole::Admin));
        assert_eq!("OWNER".parse::<TeamRole>().unwrap(), TeamRole::Owner);
        assert!("viewer".parse::<TeamRole>().is_err());
    }

    #[test]
    fn status_lifecycle() {
        use MemberStatus::*;

        assert!(Pending.can_transition_to(Active));
        assert!(Pending.can_transition_to(Removed));
        assert!(Active.can_transition_to(Removed));
        assert!(Removed.can_transition_to(Pending));

        assert!(!Active.can_transition_to(Pending));
        assert!(!Removed.can_transition_to(Active));
        assert!(!Active.can_transition_to(Active));
    }

    #[test]
    fn default_requirement_accepts_any_active_role() {
        let requirement = MembershipRequirement::default();
        assert_eq!(requirement.roles.len(), 3);
        assert_eq!(requirement.statuses, vec![MemberStatus::Active]);

        let managers = MembershipRequirement::managers();
        assert!(!managers.roles.contains(&TeamRole::Member));
    }
}
