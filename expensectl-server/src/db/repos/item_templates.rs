//! Bill item template repository - saved products for quick bill entry

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool, Row};

use super::DbError;
use crate::models::{Comment, Paginated, Pagination, Product};

/// Bill item template record from database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ItemTemplate {
    pub id: i64,
    #[serde(skip)]
    pub user_id: i64,
    pub product: String,
    pub serving: Option<Decimal>,
    pub unit_price: Decimal,
    pub comment: String,
    pub date_added: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
}

/// Validated item template fields
#[derive(Debug, Clone)]
pub struct ItemTemplateFields {
    pub product: Product,
    pub serving: Option<Decimal>,
    pub unit_price: Decimal,
    pub comment: Comment,
}

const COLUMNS: &str = "id, user_id, product, serving, unit_price, comment, date_added, date_modified";

/// Item template repository
pub struct ItemTemplateRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ItemTemplateRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, user_id: i64, page: Pagination) -> Result<Paginated<ItemTemplate>, DbError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {COLUMNS}, COUNT(*) OVER() AS total
            FROM bill_item_templates
            WHERE user_id = $1
            ORDER BY product, id
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total = rows.first().map(|r| r.get::<i64, _>("total")).unwrap_or(0);
        let items = rows
            .iter()
            .map(ItemTemplate::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Paginated::from_page(items, total, page))
    }

    pub async fn get(&self, user_id: i64, id: i64) -> Result<ItemTemplate, DbError> {
        sqlx::query_as::<_, ItemTemplate>(&format!(
            "SELECT {COLUMNS} FROM bill_item_templates WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("item template", id))
    }

    pub async fn create(&self, user_id: i64, fields: &ItemTemplateFields) -> Result<ItemTemplate, DbError> {
        let template = sqlx::query_as::<_, ItemTemplate>(&format!(
            r#"
            INSERT INTO bill_item_templates (user_id, product, serving, unit_price, comment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(fields.product.as_str())
        .bind(fields.serving)
        .bind(fields.unit_price)
        .bind(fields.comment.as_str())
        .fetch_one(self.pool)
        .await?;
        Ok(template)
    }

    pub async fn update(
        &self,
        user_id: i64,
        id: i64,
        fields: &ItemTemplateFields,
    ) -> Result<ItemTemplate, DbError> {
        sqlx::query_as::<_, ItemTemplate>(&format!(
            r#"
            UPDATE bill_item_templates
            SET product = $3, serving = $4, unit_price = $5, comment = $6, date_modified = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(fields.product.as_str())
        .bind(fields.serving)
        .bind(fields.unit_price)
        .bind(fields.comment.as_str())
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("item template", id))
    }

    pub async fn delete(&self, user_id: i64, id: i64) -> Result<(), DbError> {
        let deleted = sqlx::query("DELETE FROM bill_item_templates WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(DbError::not_found("item template", id));
        }
        Ok(())
    }
}
