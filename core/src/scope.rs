//! Personal vs. team visibility shared by every team-owned record.

use crate::{
    ids::{TeamId, UserId},
    permission::{OwnedResource, is_owner},
};

/// A record that lives either in one team or in its author's personal space
/// (`team_id IS NULL`).
pub trait ScopedResource: OwnedResource {
    fn team_id(&self) -> Option<&TeamId>;
}

/// Which rows a request may see: a team's records, or the caller's personal
/// ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceScope {
    Personal(UserId),
    Team(TeamId),
}

impl ResourceScope {
    pub fn team_id(&self) -> Option<&TeamId> {
        match self {
            ResourceScope::Team(team_id) => Some(team_id),
            ResourceScope::Personal(_) => None,
        }
    }

    pub fn contains<R: ScopedResource + ?Sized>(&self, resource: &R) -> bool {
        match self {
            ResourceScope::Team(team_id) => resource.team_id() == Some(team_id),
            ResourceScope::Personal(user_id) => {
                resource.team_id().is_none() && is_owner(resource, user_id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        team_id: Option<TeamId>,
        created_by: Option<&'static str>,
    }

    impl OwnedResource for Row {
        fn creator_id(&self) -> Option<&str> {
            self.created_by
        }
    }

    impl ScopedResource for Row {
        fn team_id(&self) -> Option<&TeamId> {
            self.team_id.as_ref()
        }
    }

    #[test]
    fn personal_scope_requires_no_team_and_ownership() {
        let alice = ResourceScope::Personal(UserId::from("alice"));
        let mine = Row {
            team_id: None,
            created_by: Some("alice"),
        };
        let theirs = Row {
            team_id: None,
            created_by: Some("bob"),
        };
        let team_row = Row {
            team_id: Some(TeamId::from("t1")),
            created_by: Some("alice"),
        };

        assert!(alice.contains(&mine));
        assert!(!alice.contains(&theirs));
        assert!(!alice.contains(&team_row));
        assert!(alice.team_id().is_none());
    }

    #[test]
    fn team_scope_matches_team_id_only() {
        let scope = ResourceScope::Team(TeamId::from("t1"));
        let row = Row {
            team_id: Some(TeamId::from("t1")),
            created_by: Some("bob"),
        };
        let elsewhere = Row {
            team_id: Some(TeamId::from("t2")),
            created_by: Some("bob"),
        };
        assert!(scope.contains(&row));
        assert!(!scope.contains(&elsewhere));
        assert_eq!(scope.team_id().map(TeamId::as_str), Some("t1"));
    }
}
