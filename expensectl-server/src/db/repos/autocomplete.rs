//! Autocomplete hints for the entry forms
//!
//! All lookups are case-insensitive prefix matches returning the 10 most
//! recently used distinct values.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use super::{like_prefix, DbError};

/// Maximum hints per lookup
pub const HINT_LIMIT: i64 = 10;

/// A product suggestion for a bill item
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct ItemHint {
    pub product: String,
    pub serving: Option<Decimal>,
    pub unit_price: Decimal,
    /// `item` for past bill items, `template` for item templates
    pub source: String,
}

/// Keep the first hint for each product, compared case-insensitively.
fn dedup_hints(hints: Vec<ItemHint>) -> Vec<ItemHint> {
    let mut seen = std::collections::HashSet::new();
    hints
        .into_iter()
        .filter(|hint| seen.insert(hint.product.to_lowercase()))
        .take(HINT_LIMIT as usize)
        .collect()
}

/// Autocomplete repository
pub struct AutocompleteRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> AutocompleteRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    async fn vendors(&self, user_id: i64, q: &str, bills_only: bool) -> Result<Vec<String>, DbError> {
        let vendors = sqlx::query_scalar(
            r#"
            SELECT vendor
            FROM expenses
            WHERE user_id = $1 AND vendor ILIKE $2 AND (NOT $3 OR is_bill)
            GROUP BY vendor
            ORDER BY MAX(date) DESC, MAX(date_added) DESC
            LIMIT $4
            "#,
        )
        .bind(user_id)
        .bind(like_prefix(q))
        .bind(bills_only)
        .bind(HINT_LIMIT)
        .fetch_all(self.pool)
        .await?;
        Ok(vendors)
    }

    /// Vendors of any expense.
    pub async fn expense_vendor(&self, user_id: i64, q: &str) -> Result<Vec<String>, DbError> {
        self.vendors(user_id, q, false).await
    }

    /// Vendors of bills.
    pub async fn bill_vendor(&self, user_id: i64, q: &str) -> Result<Vec<String>, DbError> {
        self.vendors(user_id, q, true).await
    }

    /// Descriptions, preferring those used with `vendor`; falls back to all
    /// expenses when the vendor has no match.
    pub async fn expense_description(
        &self,
        user_id: i64,
        q: &str,
        vendor: Option<&str>,
    ) -> Result<Vec<String>, DbError> {
        if let Some(vendor) = vendor.filter(|v| !v.trim().is_empty()) {
            let scoped = self.descriptions(user_id, q, Some(vendor.trim())).await?;
            if !scoped.is_empty() {
                return Ok(scoped);
            }
        }
        self.descriptions(user_id, q, None).await
    }

    async fn descriptions(
        &self,
        user_id: i64,
        q: &str,
        vendor: Option<&str>,
    ) -> Result<Vec<String>, DbError> {
        let descriptions = sqlx::query_scalar(
            r#"
            SELECT description
            FROM expenses
            WHERE user_id = $1
              AND description <> ''
              AND description ILIKE $2
              AND ($3::TEXT IS NULL OR LOWER(vendor) = LOWER($3))
            GROUP BY description
            ORDER BY MAX(date) DESC, MAX(date_added) DESC
            LIMIT $4
            "#,
        )
        .bind(user_id)
        .bind(like_prefix(q))
        .bind(vendor)
        .bind(HINT_LIMIT)
        .fetch_all(self.pool)
        .await?;
        Ok(descriptions)
    }

    /// Product hints from item templates first, then recently bought items.
    pub async fn bill_item(&self, user_id: i64, q: &str) -> Result<Vec<ItemHint>, DbError> {
        let pattern = like_prefix(q);

        let mut hints = sqlx::query_as::<_, ItemHint>(
            r#"
            SELECT product, serving, unit_price, 'template' AS source
            FROM bill_item_templates
            WHERE user_id = $1 AND product ILIKE $2
            ORDER BY product
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(&pattern)
        .bind(HINT_LIMIT)
        .fetch_all(self.pool)
        .await?;

        let items = sqlx::query_as::<_, ItemHint>(
            r#"
            SELECT product, serving, unit_price, 'item' AS source
            FROM (
                SELECT DISTINCT ON (LOWER(i.product))
                       i.product, i.serving, i.unit_price, e.date, i.date_added
                FROM bill_items i
                JOIN expenses e ON e.id = i.bill_id
                WHERE i.user_id = $1 AND i.product ILIKE $2
                ORDER BY LOWER(i.product), e.date DESC, i.date_added DESC
            ) latest
            ORDER BY date DESC, date_added DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(&pattern)
        .bind(HINT_LIMIT)
        .fetch_all(self.pool)
        .await?;

        hints.extend(items);
        Ok(dedup_hints(hints))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hint(product: &str, source: &str) -> ItemHint {
        ItemHint {
            product: product.into(),
            serving: None,
            unit_price: Decimal::ONE,
            source: source.into(),
        }
    }

    #[test]
    fn templates_win_over_items() {
        let hints = dedup_hints(vec![
            hint("Milk", "template"),
            hint("milk", "item"),
            hint("Mints", "item"),
        ]);
        assert_eq!(hints, vec![hint("Milk", "template"), hint("Mints", "item")]);
    }

    #[test]
    fn hints_are_capped() {
        let many = (0..25).map(|i| hint(&format!("p{i}"), "item")).collect();
        assert_eq!(dedup_hints(many).len(), HINT_LIMIT as usize);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn lookups_stay_within_user() {
        use crate::db::repos::test_support::{seed_shopping, setup};

        let (pool, user_id) = setup().await;
        let (_, other_user) = setup().await;
        seed_shopping(&pool, user_id, "Aldi").await;
        seed_shopping(&pool, other_user, "Auchan").await;
        let repo = AutocompleteRepo::new(&pool);

        // most recent first
        assert_eq!(repo.expense_vendor(user_id, "a").await.unwrap(), ["Aldi Express", "Aldi"]);
        assert_eq!(repo.bill_vendor(user_id, "A").await.unwrap(), ["Aldi Express"]);
        assert!(repo.bill_vendor(user_id, "auch").await.unwrap().is_empty());

        assert_eq!(repo.expense_description(user_id, "mi", Some("aldi")).await.unwrap(), ["Milk"]);
        // unknown vendor falls back to every description
        assert_eq!(repo.expense_description(user_id, "m", Some("Nowhere")).await.unwrap(), ["Milk"]);

        let hints = repo.bill_item(user_id, "a").await.unwrap();
        let products: Vec<&str> = hints.iter().map(|h| h.product.as_str()).collect();
        assert_eq!(products, ["Aldi water", "Aldi bread"]);
        assert_eq!(hints[0].source, "template");
        assert_eq!(hints[1].source, "item");
        assert_eq!(hints[1].serving, Some(Decimal::new(500, 3)));
    }
}
