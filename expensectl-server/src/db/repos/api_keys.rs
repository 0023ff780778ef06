//! API keys - bearer tokens for the HTTP API and sync clients

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use super::DbError;
use crate::models::ApiKeyName;

/// Length of generated keys
pub const KEY_LEN: usize = 40;

/// API key record from database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ApiKey {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub key: String,
    pub date_added: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
}

/// User resolved from a valid API key
#[derive(Debug, Clone, FromRow)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub full_name: String,
}

impl AuthUser {
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.username
        } else {
            &self.full_name
        }
    }
}

/// Generate a random alphanumeric key.
pub fn generate_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(KEY_LEN)
        .map(char::from)
        .collect()
}

/// API key repository
pub struct ApiKeyRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ApiKeyRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a key with a freshly generated secret.
    pub async fn create(&self, user_id: i64, name: &ApiKeyName) -> Result<ApiKey, DbError> {
        let key = sqlx::query_as::<_, ApiKey>(
            r#"
            INSERT INTO api_keys (user_id, name, key)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, name, key, date_added, date_modified
            "#,
        )
        .bind(user_id)
        .bind(name.as_str())
        .bind(generate_key())
        .fetch_one(self.pool)
        .await?;

        tracing::info!(user_id, key_id = key.id, "api key created");
        Ok(key)
    }

    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<ApiKey>, DbError> {
        let keys = sqlx::query_as::<_, ApiKey>(
            r#"
            SELECT id, user_id, name, key, date_added, date_modified
            FROM api_keys
            WHERE user_id = $1
            ORDER BY date_added
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(keys)
    }

    pub async fn revoke(&self, id: i64) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM api_keys WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("api key", id));
        }
        tracing::info!(key_id = id, "api key revoked");
        Ok(())
    }

    /// Resolve the owner of a key, if the key exists.
    pub async fn authenticate(&self, key: &str) -> Result<Option<AuthUser>, DbError> {
        let user = sqlx::query_as::<_, AuthUser>(
            r#"
            SELECT u.id, u.username, u.full_name
            FROM api_keys k
            JOIN users u ON u.id = k.user_id
            WHERE k.key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_alphanumeric() {
        let key = generate_key();
        assert_eq!(key.len(), KEY_LEN);
        assert!(key.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(key, generate_key());
    }
}
