use async_trait::async_trait;
use expensectl_core::reports::daily_spending::{daily_spending, CategoryActivity, DayCounts};
use expensectl_core::reports::{ReportMeta, ReportOutput, ReportSettings};
use expensectl_core::MoneyFormat;
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::{category_refs, Report, ReportRunError};

/// Average spending per day, week, month and year
pub struct DailySpending;

#[async_trait]
impl Report for DailySpending {
    fn meta(&self) -> ReportMeta {
        ReportMeta {
            name: "Daily spending".into(),
            slug: "daily_spending".into(),
            description: "Get daily, weekly, monthly average spending.".into(),
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
        let (expense_days, all_days): (i64, Option<i32>) = sqlx::query_as(
            "SELECT COUNT(DISTINCT date), MAX(date) - MIN(date) FROM expenses WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        let activity: Vec<(i64, i64, Decimal)> = sqlx::query_as(
            r#"
            SELECT e.category_id, COUNT(e.amount), SUM(e.amount)
            FROM expenses e
            JOIN categories c ON c.id = e.category_id
            WHERE e.user_id = $1
            GROUP BY e.category_id, c.sort_order
            ORDER BY c.sort_order, e.category_id
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        let activity: Vec<CategoryActivity> = activity
            .into_iter()
            .map(|(category_id, count, sum)| CategoryActivity { category_id, count, sum })
            .collect();

        let days = DayCounts {
            expense_days,
            all_days: i64::from(all_days.unwrap_or(0)),
        };
        tracing::debug!(user_id, ?days, "daily spending divisors");

        let categories = category_refs(pool, user_id).await?;
        Ok(daily_spending(days, &categories, &activity, money)?)
    }
}
