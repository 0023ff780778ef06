use async_trait::async_trait;
use expensectl_core::reports::breakdown::{category_table, month_category_table, month_table, MonthCategorySum};
use expensectl_core::reports::{
    OptionGroup, OptionKind, ReportError, ReportMeta, ReportOption, ReportOutput, ReportSettings,
};
use expensectl_core::MoneyFormat;
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::{category_refs, Report, ReportRunError};

const GROUP: &str = "breakdown";

/// Sums by month and category
pub struct MonthCategoryBreakdown;

fn options() -> Vec<OptionGroup> {
    vec![OptionGroup::new(
        "Break down expenses by:",
        GROUP,
        OptionKind::Radio,
        vec![
            ReportOption::check("Month and category", "month_category"),
            ReportOption::check("Month", "month"),
            ReportOption::check("Category", "category"),
        ],
    )]
}

#[async_trait]
impl Report for MonthCategoryBreakdown {
    fn meta(&self) -> ReportMeta {
        ReportMeta {
            name: "Month/Category breakdown".into(),
            slug: "month_category_breakdown".into(),
            description: "Show expenses broken down by month and category.".into(),
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
        let groups = options();
        let breakdown = settings
            .selected(&groups[0])
            .ok_or_else(|| ReportError::MissingField(GROUP.into()))?;

        let output = match breakdown {
            "month_category" => {
                let rows: Vec<(String, i64, Decimal)> = sqlx::query_as(
                    r#"
                    SELECT to_char(e.date, 'YYYY-MM') AS yearmonth, e.category_id, SUM(e.amount)
                    FROM expenses e
                    JOIN categories c ON c.id = e.category_id
                    WHERE e.user_id = $1
                    GROUP BY yearmonth, e.category_id, c.sort_order
                    ORDER BY yearmonth, c.sort_order, e.category_id
                    "#,
                )
                .bind(user_id)
                .fetch_all(pool)
                .await?;
                let rows: Vec<MonthCategorySum> = rows
                    .into_iter()
                    .map(|(yearmonth, category_id, sum)| MonthCategorySum {
                        yearmonth,
                        category_id,
                        sum,
                    })
                    .collect();
                let categories = category_refs(pool, user_id).await?;
                month_category_table(&categories, &rows, money)?
            }
            "month" => {
                let rows: Vec<(String, Decimal)> = sqlx::query_as(
                    r#"
                    SELECT to_char(date, 'YYYY-MM') AS yearmonth, SUM(amount)
                    FROM expenses
                    WHERE user_id = $1
                    GROUP BY yearmonth
                    ORDER BY yearmonth
                    "#,
                )
                .bind(user_id)
                .fetch_all(pool)
                .await?;
                month_table(&rows, money)?
            }
            _ => {
                let rows: Vec<(i64, Decimal)> = sqlx::query_as(
                    r#"
                    SELECT e.category_id, SUM(e.amount)
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
                let categories = category_refs(pool, user_id).await?;
                category_table(&categories, &rows, money)?
            }
        };
        Ok(output)
    }
}
