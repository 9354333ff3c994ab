use serde::{Deserialize, Serialize};

use crate::users::repo_types::User;

/// Raw query string for `GET /api/users`. Numbers stay as text so a
/// malformed value falls back to its default instead of rejecting the request.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
}

impl ListQuery {
    /// The first occurrence of a repeated key wins; unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "page" => &mut query.page,
                "limit" => &mut query.limit,
                "search" => &mut query.search,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        query
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListing {
    pub users: Vec<User>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: i64,
}

/// Request body for `POST /api/users`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}
