//! Deletion tombstones
//!
//! Every delete of a synchronized record writes a row here so that sync
//! clients can learn about it on their next run.

use chrono::{DateTime, Utc};
use expensectl_core::sync::{DeletionRef, SyncModel};
use sqlx::{PgConnection, PgPool, Row};

pub(crate) async fn record(
    conn: &mut PgConnection,
    user_id: i64,
    model: SyncModel,
    object_id: i64,
) -> Result<(), sqlx::Error> {
    record_many(conn, user_id, model, &[object_id]).await
}

pub(crate) async fn record_many(
    conn: &mut PgConnection,
    user_id: i64,
    model: SyncModel,
    object_ids: &[i64],
) -> Result<(), sqlx::Error> {
    if object_ids.is_empty() {
        return Ok(());
    }
    sqlx::query(
        r#"
        INSERT INTO deletion_records (user_id, model, object_pk, date)
        SELECT $1, $2, id, NOW() FROM UNNEST($3::BIGINT[]) AS id
        "#,
    )
    .bind(user_id)
    .bind(model.as_str())
    .bind(object_ids)
    .execute(&mut *conn)
    .await?;

    tracing::debug!(user_id, model = %model, count = object_ids.len(), "tombstones recorded");
    Ok(())
}

/// True when the object was deleted at some point.
pub(crate) async fn exists(
    conn: &mut PgConnection,
    user_id: i64,
    model: SyncModel,
    object_id: i64,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM deletion_records
            WHERE user_id = $1 AND model = $2 AND object_pk = $3
        ) AS found
        "#,
    )
    .bind(user_id)
    .bind(model.as_str())
    .bind(object_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row.get("found"))
}

/// Deletions in `(after, until]`, or everything up to `until` without a lower bound.
pub(crate) async fn between(
    conn: &mut PgConnection,
    user_id: i64,
    after: Option<DateTime<Utc>>,
    until: DateTime<Utc>,
) -> Result<Vec<DeletionRef>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT model, object_pk
        FROM deletion_records
        WHERE user_id = $1
          AND ($2::TIMESTAMPTZ IS NULL OR date > $2)
          AND date <= $3
        ORDER BY date, id
        "#,
    )
    .bind(user_id)
    .bind(after)
    .bind(until)
    .fetch_all(&mut *conn)
    .await?;

    let mut refs = Vec::with_capacity(rows.len());
    for row in rows {
        let model: String = row.get("model");
        match model.parse::<SyncModel>() {
            Ok(model) => refs.push(DeletionRef {
                model,
                id: row.get("object_pk"),
            }),
            Err(_) => tracing::warn!(%model, "skipping tombstone for unknown model"),
        }
    }
    Ok(refs)
}

/// Deletion tombstone repository
pub struct DeletionRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> DeletionRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, user_id: i64, model: SyncModel, object_id: i64) -> Result<(), sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        record(&mut conn, user_id, model, object_id).await
    }

    pub async fn exists(&self, user_id: i64, model: SyncModel, object_id: i64) -> Result<bool, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        exists(&mut conn, user_id, model, object_id).await
    }

    pub async fn list_between(
        &self,
        user_id: i64,
        after: Option<DateTime<Utc>>,
        until: DateTime<Utc>,
    ) -> Result<Vec<DeletionRef>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        between(&mut conn, user_id, after, until).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repos::test_support::setup;

    #[tokio::test]
    #[ignore = "requires database"]
    async fn tombstones_are_listed_by_window() {
        let (pool, user_id) = setup().await;
        let repo = DeletionRepo::new(&pool);

        let before: DateTime<Utc> = sqlx::query_scalar("SELECT NOW()").fetch_one(&pool).await.unwrap();
        repo.record(user_id, SyncModel::Expense, 42).await.unwrap();
        let after: DateTime<Utc> = sqlx::query_scalar("SELECT NOW()").fetch_one(&pool).await.unwrap();

        assert!(repo.exists(user_id, SyncModel::Expense, 42).await.unwrap());
        assert!(!repo.exists(user_id, SyncModel::BillItem, 42).await.unwrap());

        let all = repo.list_between(user_id, None, after).await.unwrap();
        assert_eq!(all, vec![DeletionRef { model: SyncModel::Expense, id: 42 }]);
        let later = repo.list_between(user_id, Some(after), after).await.unwrap();
        assert!(later.is_empty());
        let window = repo.list_between(user_id, Some(before - chrono::Duration::seconds(1)), after).await.unwrap();
        assert_eq!(window.len(), 1);
    }
}
