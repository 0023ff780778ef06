use async_trait::async_trait;
use expensectl_core::reports::vendor_stats::{vendor_table, VendorRow};
use expensectl_core::reports::{ReportMeta, ReportOutput, ReportSettings};
use expensectl_core::MoneyFormat;
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::{Report, ReportRunError};

/// Count, sum and average per vendor with at least two expenses
pub struct VendorStats;

#[async_trait]
impl Report for VendorStats {
    fn meta(&self) -> ReportMeta {
        ReportMeta {
            name: "Vendor statistics".into(),
            slug: "vendor_stats".into(),
            description: "Get basic statistics about money spent at each vendor. \
                          Includes vendors with at least 2 separate purchases."
                .into(),
            options: Vec::new(),
        }
    }

    async fn run(
        &self,
        pool: &PgPool,
        user_id: i64,
        _settings: &ReportSettings,
        money: &MoneyFormat,
    ) -> Result<ReportOutput, ReportRunError> {
        let rows: Vec<(String, i64, Decimal, Decimal)> = sqlx::query_as(
            r#"
            SELECT vendor, COUNT(*) AS count, SUM(amount) AS sum, AVG(amount) AS avg
            FROM expenses
            WHERE user_id = $1
            GROUP BY vendor
            HAVING COUNT(*) > 1
            ORDER BY sum DESC, vendor
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        let rows: Vec<VendorRow> = rows
            .into_iter()
            .map(|(vendor, count, sum, avg)| VendorRow { vendor, count, sum, avg })
            .collect();
        Ok(vendor_table(&rows, money)?)
    }
}
