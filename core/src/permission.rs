//! Mutation policy for team-owned resources.
//!
//! A resource may be modified by whoever created it, or by an active owner or
//! admin of the team it lives in. Handlers only pass a role after confirming
//! the actor's membership is active.

use thiserror::Error;

use crate::membership::TeamRole;

/// Anything whose authorship can be checked against an actor.
pub trait OwnedResource {
    fn creator_id(&self) -> Option<&str>;

    /// Owner column kept by rows written before `created_by` existed.
    fn legacy_owner_id(&self) -> Option<&str> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("user {actor_id} may not modify this resource")]
pub struct PermissionDenied {
    pub actor_id: String,
}

pub fn is_owner<R: OwnedResource + ?Sized>(resource: &R, actor_id: &str) -> bool {
    resource.creator_id() == Some(actor_id) || resource.legacy_owner_id() == Some(actor_id)
}

pub fn can_modify<R: OwnedResource + ?Sized>(
    resource: &R,
    actor_id: &str,
    membership_role: Option<TeamRole>,
) -> bool {
    is_owner(resource, actor_id) || membership_role.is_some_and(TeamRole::is_manager)
}

pub fn ensure_can_modify<R: OwnedResource + ?Sized>(
    resource: &R,
    actor_id: &str,
    membership_role: Option<TeamRole>,
) -> Result<(), PermissionDenied> {
    if can_modify(resource, actor_id, membership_role) {
        Ok(())
    } else {
        Err(PermissionDenied {
            actor_id: actor_id.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Note {
        created_by: Option<&'static str>,
        user_id: Option<&'static str>,
    }

    impl OwnedResource for Note {
        fn creator_id(&self) -> Option<&str> {
            self.created_by
        }

        fn legacy_owner_id(&self) -> Option<&str> {
            self.user_id
        }
    }

    #[test]
    fn creator_may_modify_without_role() {
        let note = Note {
            created_by: Some("alice"),
            user_id: None,
        };
        assert!(can_modify(&note, "alice", None));
        assert!(can_modify(&note, "alice", Some(TeamRole::Member)));
    }

    #[test]
    fn legacy_owner_field_counts_as_ownership() {
        let note = Note {
            created_by: None,
            user_id: Some("alice"),
        };
        assert!(is_owner(&note, "alice"));
        assert!(!is_owner(&note, "bob"));
    }

    #[test]
    fn managers_override_ownership() {
        let note = Note {
            created_by: Some("alice"),
            user_id: None,
        };
        assert!(can_modify(&note, "bob", Some(TeamRole::Admin)));
        assert!(can_modify(&note, "carol", Some(TeamRole::Owner)));
    }

    #[test]
    fn plain_member_cannot_touch_others_resources() {
        let note = Note {
            created_by: Some("alice"),
            user_id: Some("alice"),
        };
        assert!(!can_modify(&note, "bob", Some(TeamRole::Member)));
        assert!(!can_modify(&note, "bob", None));

        let denied = ensure_can_modify(&note, "bob", Some(TeamRole::Member)).unwrap_err();
        assert_eq!(denied.actor_id, "bob");
    }
}
