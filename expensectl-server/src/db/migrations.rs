//! Schema setup
//!
//! Idempotent `CREATE ... IF NOT EXISTS` statements, run by `expensectl migrate`
//! and at server startup.

use sqlx::PgPool;

const TABLES: &[(&str, &str)] = &[
    (
        "users",
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            full_name TEXT NOT NULL DEFAULT '',
            date_added TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "api_keys",
        r#"
        CREATE TABLE IF NOT EXISTS api_keys (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            key VARCHAR(128) NOT NULL UNIQUE,
            date_added TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            date_modified TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "categories",
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            slug TEXT NOT NULL,
            slugbase TEXT NOT NULL,
            sort_order INTEGER NOT NULL DEFAULT 1,
            date_added TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            date_modified TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (user_id, slug)
        )
        "#,
    ),
    (
        "expenses",
        r#"
        CREATE TABLE IF NOT EXISTS expenses (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            date DATE NOT NULL,
            vendor TEXT NOT NULL,
            category_id BIGINT NOT NULL REFERENCES categories(id) ON DELETE RESTRICT,
            amount NUMERIC(10, 2) NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            description_cache TEXT NOT NULL DEFAULT '',
            is_bill BOOLEAN NOT NULL DEFAULT FALSE,
            date_added TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            date_modified TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "bill_items",
        r#"
        CREATE TABLE IF NOT EXISTS bill_items (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            bill_id BIGINT NOT NULL REFERENCES expenses(id) ON DELETE CASCADE,
            product TEXT NOT NULL,
            serving NUMERIC(10, 3),
            count NUMERIC(10, 3) NOT NULL,
            unit_price NUMERIC(10, 2) NOT NULL,
            date_added TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            date_modified TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "expense_templates",
        r#"
        CREATE TABLE IF NOT EXISTS expense_templates (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            vendor TEXT NOT NULL,
            category_id BIGINT NOT NULL REFERENCES categories(id) ON DELETE RESTRICT,
            type TEXT NOT NULL DEFAULT 'simple',
            amount NUMERIC(10, 2),
            description TEXT NOT NULL,
            comment TEXT NOT NULL DEFAULT '',
            date_added TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            date_modified TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "bill_item_templates",
        r#"
        CREATE TABLE IF NOT EXISTS bill_item_templates (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            product TEXT NOT NULL,
            serving NUMERIC(10, 3),
            unit_price NUMERIC(10, 2) NOT NULL,
            comment TEXT NOT NULL DEFAULT '',
            date_added TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            date_modified TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "deletion_records",
        r#"
        CREATE TABLE IF NOT EXISTS deletion_records (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            model TEXT NOT NULL,
            object_pk BIGINT NOT NULL,
            date TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_categories_slugbase ON categories(user_id, slugbase)",
    "CREATE INDEX IF NOT EXISTS idx_expenses_date ON expenses(user_id, date DESC, date_added DESC)",
    "CREATE INDEX IF NOT EXISTS idx_expenses_category ON expenses(category_id)",
    "CREATE INDEX IF NOT EXISTS idx_expenses_modified ON expenses(user_id, date_modified)",
    "CREATE INDEX IF NOT EXISTS idx_bill_items_bill ON bill_items(bill_id)",
    "CREATE INDEX IF NOT EXISTS idx_bill_items_modified ON bill_items(user_id, date_modified)",
    "CREATE INDEX IF NOT EXISTS idx_templates_category ON expense_templates(category_id)",
    "CREATE INDEX IF NOT EXISTS idx_deletions_date ON deletion_records(user_id, date)",
    "CREATE INDEX IF NOT EXISTS idx_deletions_object ON deletion_records(user_id, model, object_pk)",
];

/// Create all tables and indexes that don't exist yet.
pub async fn run(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("running migrations");

    for (table, ddl) in TABLES {
        sqlx::query(ddl).execute(pool).await?;
        tracing::debug!(table, "table ready");
    }

    for ddl in INDEXES {
        sqlx::query(ddl).execute(pool).await?;
    }

    tracing::info!(tables = TABLES.len(), indexes = INDEXES.len(), "migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_created_before_their_references() {
        let order: Vec<&str> = TABLES.iter().map(|(name, _)| *name).collect();
        for (position, (_, ddl)) in TABLES.iter().enumerate() {
            for (referenced_position, name) in order.iter().enumerate() {
                if ddl.contains(&format!("REFERENCES {name}(")) {
                    assert!(referenced_position < position, "{name} must come first");
                }
            }
        }
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn migrations_are_idempotent() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.expect("pool creation failed");

        run(&pool).await.expect("first run failed");
        run(&pool).await.expect("second run failed");
    }
}
