//! Report engine
//!
//! Each report declares its options through [`ReportMeta`] and runs SQL
//! aggregations whose rows are shaped into tables by `expensectl_core::reports`.

mod breakdown;
mod daily_spending;
mod price_history;
mod vendor_stats;

use std::str::FromStr;

use async_trait::async_trait;
use expensectl_core::reports::{CategoryRef, ReportError, ReportMeta, ReportOutput, ReportSettings};
use expensectl_core::MoneyFormat;
use sqlx::PgPool;

pub use breakdown::MonthCategoryBreakdown;
pub use daily_spending::DailySpending;
pub use price_history::PriceHistory;
pub use vendor_stats::VendorStats;

/// Errors raised while running a report
#[derive(Debug, thiserror::Error)]
pub enum ReportRunError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Report(#[from] ReportError),
}

/// A report that can be listed, configured and run
#[async_trait]
pub trait Report: Send + Sync {
    fn meta(&self) -> ReportMeta;

    async fn run(
        &self,
        pool: &PgPool,
        user_id: i64,
        settings: &ReportSettings,
        money: &MoneyFormat,
    ) -> Result<ReportOutput, ReportRunError>;
}

static REPORTS: [&dyn Report; 4] = [&MonthCategoryBreakdown, &VendorStats, &DailySpending, &PriceHistory];

/// All reports, in menu order.
pub fn available_reports() -> &'static [&'static dyn Report] {
    &REPORTS
}

pub fn find_report(slug: &str) -> Option<&'static dyn Report> {
    REPORTS.iter().copied().find(|report| report.meta().slug == slug)
}

/// How a report run is returned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    #[default]
    Html,
    Print,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "html" => Ok(Self::Html),
            "print" => Ok(Self::Print),
            "csv" => Ok(Self::Csv),
            other => Err(format!("unknown output format '{other}'")),
        }
    }
}

/// The user's categories in display order, as report links.
pub(crate) async fn category_refs(pool: &PgPool, user_id: i64) -> Result<Vec<CategoryRef>, sqlx::Error> {
    let rows: Vec<(i64, String, String)> = sqlx::query_as(
        "SELECT id, name, slug FROM categories WHERE user_id = $1 ORDER BY sort_order, id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, name, slug)| CategoryRef { id, name, slug })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn report_slugs_are_unique() {
        let slugs: HashSet<String> = available_reports().iter().map(|r| r.meta().slug).collect();
        assert_eq!(slugs.len(), available_reports().len());
    }

    #[test]
    fn find_by_slug() {
        assert_eq!(find_report("vendor_stats").unwrap().meta().name, "Vendor statistics");
        assert!(find_report("nope").is_none());
    }

    #[test]
    fn output_formats() {
        assert_eq!("csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert!("pdf".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::default(), OutputFormat::Html);
    }

    mod db {
        use std::collections::BTreeMap;

        use super::*;
        use crate::db::repos::test_support::{seed_shopping, setup};
        use expensectl_core::reports::{render_csv, render_html, settings_from_input};

        async fn run(pool: &PgPool, user_id: i64, slug: &str, input: &[(&str, &str)]) -> ReportOutput {
            let report = find_report(slug).unwrap();
            let input: BTreeMap<String, String> =
                input.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
            let settings = settings_from_input(&report.meta().options, &input).unwrap();
            report.run(pool, user_id, &settings, &MoneyFormat::dollars()).await.unwrap()
        }

        #[tokio::test]
        #[ignore = "requires database"]
        async fn reports_cover_only_own_expenses() {
            let (pool, user_id) = setup().await;
            let (_, other_user) = setup().await;
            seed_shopping(&pool, user_id, "Aldi").await;
            seed_shopping(&pool, other_user, "Auchan").await;

            let cases: [(&str, &[(&str, &str)]); 6] = [
                ("month_category_breakdown", &[("breakdown", "month_category")]),
                ("month_category_breakdown", &[("breakdown", "month")]),
                ("month_category_breakdown", &[("breakdown", "category")]),
                ("vendor_stats", &[]),
                ("daily_spending", &[]),
                ("price_history", &[("filter_product", "on"), ("product", "milk")]),
            ];
            for (slug, input) in cases {
                let output = run(&pool, user_id, slug, input).await;
                assert!(!output.is_empty(), "{slug} {input:?} returned nothing");

                let html = render_html(&output);
                let csv = render_csv(&output).unwrap();
                for rendered in [&html, &csv] {
                    assert!(!rendered.contains("Auchan"), "{slug} leaked another user's rows");
                    // both users spent 15.28; a merged query would show 30.56
                    assert!(!rendered.contains("$30.56"), "{slug} summed another user's rows");
                }
            }
        }

        #[tokio::test]
        #[ignore = "requires database"]
        async fn totals_match_seeded_purchases() {
            let (pool, user_id) = setup().await;
            let (_, other_user) = setup().await;
            seed_shopping(&pool, user_id, "Aldi").await;
            seed_shopping(&pool, other_user, "Auchan").await;

            let months = render_csv(&run(&pool, user_id, "month_category_breakdown", &[("breakdown", "month")]).await)
                .unwrap();
            assert!(months.contains("January 2024,$3.50"));
            assert!(months.contains("February 2024,$11.78"));
            assert!(months.contains("Grand Total,$15.28"));

            let vendors = render_html(&run(&pool, user_id, "vendor_stats", &[]).await);
            assert!(vendors.contains("Aldi"));
            assert!(vendors.contains("$7.30"));
            assert!(!vendors.contains("Aldi Express"));

            let daily = render_csv(&run(&pool, user_id, "daily_spending", &[]).await).unwrap();
            assert!(daily.contains("All time,3,$15.28,3,$15.28"));

            let prices = render_csv(
                &run(&pool, user_id, "price_history", &[("filter_product", "on"), ("product", "milk")]).await,
            )
            .unwrap();
            assert!(prices.contains("$1.99"));
            assert!(prices.contains("$3.80"));
            assert!(!prices.contains("bread"));
        }

        #[tokio::test]
        #[ignore = "requires database"]
        async fn user_without_expenses_gets_no_results() {
            let (pool, user_id) = setup().await;
            for report in available_reports() {
                let meta = report.meta();
                let input: &[(&str, &str)] = if meta.slug == "month_category_breakdown" {
                    &[("breakdown", "month")]
                } else {
                    &[]
                };
                let output = run(&pool, user_id, &meta.slug, input).await;
                assert!(output.is_empty(), "{} should be empty", meta.slug);
                assert!(render_html(&output).contains("No results to show."));
            }
        }
    }
}
