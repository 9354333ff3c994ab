use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,                    // server-assigned, never reused
    pub email: String,              // unique
    pub name: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Validated input for an insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
}

/// Filter and window for one listing read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserQuery {
    /// Case-sensitive substring of email or name; `None` selects everything.
    pub search: Option<String>,
    pub offset: i64,
    pub limit: i64,
}

impl UserQuery {
    pub fn matches(&self, user: &User) -> bool {
        match self.search.as_deref() {
            None => true,
            Some(term) => {
                user.email.contains(term)
                    || user.name.as_deref().is_some_and(|n| n.contains(term))
            }
        }
    }
}

/// One page of rows plus the filtered total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPage {
    pub users: Vec<User>,
    pub total: i64,
}
