use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::users::repo::UserStore;
use crate::users::repo_types::{NewUser, User, UserPage, UserQuery};

#[derive(Default)]
struct Table {
    last_id: i64,
    rows: Vec<User>,
}

/// In-process `users` table. Check-and-insert runs under one write lock,
/// which gives the same uniqueness guarantee as the PostgreSQL constraint.
#[derive(Default)]
pub struct MemoryUserStore {
    table: RwLock<Table>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn list(&self, query: &UserQuery) -> Result<UserPage, StoreError> {
        let table = self.table.read().await;
        let mut matched: Vec<&User> = table.rows.iter().filter(|u| query.matches(u)).collect();
        matched.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = matched.len() as i64;
        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit).unwrap_or(0);
        let users = matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        Ok(UserPage { users, total })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let table = self.table.read().await;
        Ok(table.rows.iter().find(|u| u.email == email).cloned())
    }

    async fn insert(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut table = self.table.write().await;
        if table.rows.iter().any(|u| u.email == new_user.email) {
            return Err(StoreError::UniqueViolation);
        }
        table.last_id += 1;
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: table.last_id,
            email: new_user.email,
            name: new_user.name,
            created_at: now,
            updated_at: now,
        };
        table.rows.push(user.clone());
        Ok(user)
    }

    async fn delete(&self, id: i64) -> Result<Option<User>, StoreError> {
        let mut table = self.table.write().await;
        let removed = table
            .rows
            .iter()
            .position(|u| u.id == id)
            .map(|idx| table.rows.remove(idx));
        Ok(removed)
    }
}
