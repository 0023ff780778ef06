//! Report endpoints
//!
//! `GET /api/reports/{slug}` describes a report's options; `/run` takes the
//! chosen options as query parameters plus `format` (`json`, `html`,
//! `print` or `csv`).

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use expensectl_core::reports::{
    render_csv, render_html, render_print, settings_from_input, ReportMeta, ReportOutput, ReportSettings,
};
use serde::Serialize;

use crate::db::repos::AuthUser;
use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::reports::{available_reports, find_report, OutputFormat, Report};

/// Report listing entry
#[derive(Serialize)]
pub struct ReportSummary {
    pub name: String,
    pub slug: String,
    pub description: String,
}

impl From<ReportMeta> for ReportSummary {
    fn from(meta: ReportMeta) -> Self {
        Self {
            name: meta.name,
            slug: meta.slug,
            description: meta.description,
        }
    }
}

#[derive(Serialize)]
pub struct ReportRun {
    pub report: ReportSummary,
    pub settings: ReportSettings,
    pub output: ReportOutput,
}

fn lookup(slug: &str) -> Result<&'static dyn Report, ApiError> {
    find_report(slug).ok_or_else(|| ApiError::NotFound {
        resource: "report",
        id: slug.to_string(),
    })
}

/// GET /api/reports
async fn list_reports(_user: AuthUser) -> Json<Vec<ReportSummary>> {
    Json(
        available_reports()
            .iter()
            .map(|report| ReportSummary::from(report.meta()))
            .collect(),
    )
}

/// GET /api/reports/{slug}
async fn report_setup(_user: AuthUser, Path(slug): Path<String>) -> Result<Json<ReportMeta>, ApiError> {
    Ok(Json(lookup(&slug)?.meta()))
}

/// GET /api/reports/{slug}/run
async fn run_report(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(slug): Path<String>,
    Query(mut input): Query<BTreeMap<String, String>>,
) -> Result<Response, ApiError> {
    let report = lookup(&slug)?;
    let format = match input.remove("format") {
        Some(format) => format.parse::<OutputFormat>().map_err(ApiError::bad_request)?,
        None => OutputFormat::default(),
    };

    let meta = report.meta();
    let settings = settings_from_input(&meta.options, &input).map_err(|e| ApiError::bad_request(e.to_string()))?;
    let output = report
        .run(&state.pool, user.id, &settings, &state.settings.money)
        .await?;
    tracing::info!(user_id = user.id, report = %meta.slug, ?format, tables = output.tables.len(), "report run");

    let response = match format {
        OutputFormat::Json => Json(ReportRun {
            report: meta.into(),
            settings,
            output,
        })
        .into_response(),
        OutputFormat::Html => Html(render_html(&output)).into_response(),
        OutputFormat::Print => Html(render_print(&meta.name, &output)).into_response(),
        OutputFormat::Csv => {
            let csv = render_csv(&output).map_err(|e| ApiError::Internal {
                message: e.to_string(),
            })?;
            (
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}.csv\"", meta.slug),
                    ),
                ],
                csv,
            )
                .into_response()
        }
    };
    Ok(response)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/reports", get(list_reports))
        .route("/reports/{slug}", get(report_setup))
        .route("/reports/{slug}/run", get(run_report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_report_is_404() {
        let err = lookup("nope").err().unwrap();
        assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);
    }

    #[test]
    fn every_report_is_listed() {
        let summaries: Vec<ReportSummary> = available_reports()
            .iter()
            .map(|r| ReportSummary::from(r.meta()))
            .collect();
        assert!(summaries.iter().any(|s| s.slug == "month_category_breakdown"));
        assert!(summaries.iter().any(|s| s.slug == "price_history"));
    }
}
