//! Postgres pool for the server and the CLI commands

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Matches `[database] max_connections` in a fresh config file.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// How long a request waits for a free connection before failing.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Connect with the default connection limit.
///
/// ```ignore
/// let pool = create_pool("postgres://localhost/expenses").await?;
/// ```
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    create_pool_with_options(database_url, DEFAULT_MAX_CONNECTIONS).await
}

pub async fn create_pool_with_options(
    database_url: &str,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    tracing::debug!(max_connections, "connecting to database");
    PgPoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations;

    // DATABASE_URL=postgres://... cargo test -p expensectl-server -- --ignored

    fn database_url() -> String {
        std::env::var("DATABASE_URL").expect("DATABASE_URL required")
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn migrated_pool_sees_expense_tables() {
        let pool = create_pool(&database_url()).await.unwrap();
        migrations::run(&pool).await.unwrap();

        let tables: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = current_schema() AND table_name IN ('expenses', 'bill_items', 'deletion_records')",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(tables, 3);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn small_pool_serves_parallel_inserts() {
        let (seed_pool, user_id) = crate::db::repos::test_support::setup().await;
        let category_id: i64 = sqlx::query_scalar(
            "INSERT INTO categories (user_id, name, slug, slugbase) VALUES ($1, 'Food', 'food', 'food') RETURNING id",
        )
        .bind(user_id)
        .fetch_one(&seed_pool)
        .await
        .unwrap();

        let pool = create_pool_with_options(&database_url(), 2).await.unwrap();
        let tasks: Vec<_> = (1..=8)
            .map(|cents| {
                let pool = pool.clone();
                tokio::spawn(async move {
                    sqlx::query(
                        "INSERT INTO expenses (user_id, date, vendor, category_id, amount) VALUES ($1, CURRENT_DATE, 'Kiosk', $2, $3)",
                    )
                    .bind(user_id)
                    .bind(category_id)
                    .bind(rust_decimal::Decimal::new(cents, 2))
                    .execute(&pool)
                    .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let total: rust_decimal::Decimal =
            sqlx::query_scalar("SELECT SUM(amount) FROM expenses WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(total, rust_decimal::Decimal::new(36, 2));
    }
}
