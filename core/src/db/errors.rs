use anyhow::Error as AnyError;
use sqlx::{Error as SqlxError, error::DatabaseError};
use std::error::Error as StdError;
use thiserror::Error;

// Extended result codes: SQLITE_CONSTRAINT_UNIQUE, SQLITE_CONSTRAINT_PRIMARYKEY.
const SQLITE_UNIQUE_VIOLATION: &str = "2067";
const SQLITE_PRIMARY_KEY_VIOLATION: &str = "1555";

/// The owner already holds `limit` collaborative teams; nothing was inserted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("user {owner_id} already owns {limit} teams")]
pub struct TeamLimitReached {
    pub owner_id: String,
    pub limit: i64,
}

/// Returns `true` if the provided error represents a uniqueness constraint
/// violation.
pub fn is_unique_violation(err: &AnyError) -> bool {
    err.chain().any(is_unique_violation_cause)
}

fn is_unique_violation_cause(cause: &(dyn StdError + 'static)) -> bool {
    if let Some(sqlx_error) = cause.downcast_ref::<SqlxError>() {
        if matches_sqlx_unique(sqlx_error) {
            return true;
        }
    }

    message_indicates_unique(cause)
}

fn matches_sqlx_unique(err: &SqlxError) -> bool {
    match err {
        SqlxError::Database(db_err) => {
            database_code_is_unique(db_err.as_ref())
                || db_err
                    .message()
                    .to_ascii_lowercase()
                    .contains("unique constraint")
        }
        _ => false,
    }
}

fn database_code_is_unique(err: &(dyn DatabaseError + 'static)) -> bool {
    err.code()
        .map(|code_ref| {
            matches!(
                code_ref.as_ref(),
                SQLITE_UNIQUE_VIOLATION | SQLITE_PRIMARY_KEY_VIOLATION
            )
        })
        .unwrap_or(false)
}

fn message_indicates_unique(err: &(dyn StdError + 'static)) -> bool {
    err.to_string()
        .to_ascii_lowercase()
        .contains("unique constraint failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn detects_unique_violation_from_message() {
        let err = anyhow!("UNIQUE constraint failed: teams.owner_id");
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn detects_wrapped_unique_violation() {
        let err = anyhow!("UNIQUE constraint failed: team_members.team_id, team_members.user_id")
            .context("failed to insert member");
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn ignores_unrelated_errors() {
        let err = anyhow!("database is locked");
        assert!(!is_unique_violation(&err));
    }
}
