use async_trait::async_trait;
use chrono::NaiveDate;
use expensectl_core::reports::price_history::{price_table, Purchase};
use expensectl_core::reports::{
    OptionGroup, OptionKind, ReportMeta, ReportOption, ReportOutput, ReportSettings, TextOption,
};
use expensectl_core::MoneyFormat;
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::{Report, ReportRunError};

use crate::db::repos::like_contains;

const PRODUCT: &str = "product";
const FILTER_PRODUCT: &str = "filter_product";

/// Unit price changes of products bought more than once
pub struct PriceHistory;

fn options() -> Vec<OptionGroup> {
    vec![
        OptionGroup::new(
            "Filter",
            "filter",
            OptionKind::Check,
            vec![ReportOption::check("Only products matching", FILTER_PRODUCT)],
        ),
        OptionGroup::new(
            "Product",
            "product_group",
            OptionKind::Text,
            vec![ReportOption::text(
                "Product name contains",
                PRODUCT,
                TextOption {
                    required: false,
                    enabler: Some(FILTER_PRODUCT.into()),
                    enabled_by_default: false,
                },
            )],
        ),
    ]
}

#[async_trait]
impl Report for PriceHistory {
    fn meta(&self) -> ReportMeta {
        ReportMeta {
            name: "Price history".into(),
            slug: "price_history".into(),
            description: "Compare unit prices of products bought at least twice.".into(),
            options: options(),
        }
    }

    async fn run(
        &self,
        pool: &PgPool,
        user_id: i64,
        settings: &ReportSettings,
        money: &MoneyFormat,
    ) -> Result<ReportOutput, ReportRunError> {
        let filter = settings.text(PRODUCT).map(like_contains);

        let rows: Vec<(String, NaiveDate, Decimal)> = sqlx::query_as(
            r#"
            SELECT product, date, unit_price
            FROM (
                SELECT description AS product, date, amount AS unit_price, date_added
                FROM expenses
                WHERE user_id = $1 AND NOT is_bill AND description <> ''
                UNION ALL
                SELECT i.product, e.date, i.unit_price, i.date_added
                FROM bill_items i
                JOIN expenses e ON e.id = i.bill_id
                WHERE i.user_id = $1
            ) AS p
            WHERE $2::TEXT IS NULL OR product ILIKE $2
            ORDER BY date, date_added
            "#,
        )
        .bind(user_id)
        .bind(filter)
        .fetch_all(pool)
        .await?;

        let purchases: Vec<Purchase> = rows
            .into_iter()
            .map(|(product, date, unit_price)| Purchase { product, date, unit_price })
            .collect();
        Ok(price_table(&purchases, money)?)
    }
}
