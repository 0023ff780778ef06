//! User accounts
//!
//! Accounts are created from the CLI; the HTTP API only ever sees the user
//! resolved from an API key.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use super::{is_unique_violation, DbError};
use crate::models::Username;

/// User record from database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub date_added: DateTime<Utc>,
}

impl User {
    /// Full name, or the username when no name was given.
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.username
        } else {
            &self.full_name
        }
    }
}

/// User repository
pub struct UserRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, username: &Username, full_name: &str) -> Result<User, DbError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, full_name)
            VALUES ($1, $2)
            RETURNING id, username, full_name, date_added
            "#,
        )
        .bind(username.as_str())
        .bind(full_name.trim())
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DbError::conflict(format!("user '{}' already exists", username.as_str()))
            } else {
                DbError::Sqlx(e)
            }
        })
    }

    pub async fn get_by_username(&self, username: &str) -> Result<User, DbError> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, full_name, date_added FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("user", username))
    }

    pub async fn list(&self) -> Result<Vec<User>, DbError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, username, full_name, date_added FROM users ORDER BY username",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(full_name: &str) -> User {
        User {
            id: 1,
            username: "alice".into(),
            full_name: full_name.into(),
            date_added: Utc::now(),
        }
    }

    #[test]
    fn display_name_falls_back_to_username() {
        assert_eq!(user("").display_name(), "alice");
        assert_eq!(user("  ").display_name(), "alice");
        assert_eq!(user("Alice Smith").display_name(), "Alice Smith");
    }
}
