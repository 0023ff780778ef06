//! Search endpoint
//!
//! `include` and `categories` are comma-separated lists. Empty values are
//! treated as absent so form submissions work unchanged.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::{routing::get, Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::db::repos::{AuthUser, SearchFor, SearchQuery, SearchRepo, SearchResults};
use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::models::PaginationParams;

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(rename = "for", default)]
    pub search_for: SearchFor,
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub vendor: String,
    /// `expenses`, `bills`, or both
    pub include: Option<String>,
    pub categories: Option<String>,
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

fn parse_date(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| ApiError::bad_request(format!("{field}: expected YYYY-MM-DD, got '{v}'"))),
    }
}

fn parse_categories(value: Option<&str>) -> Result<Option<Vec<i64>>, ApiError> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    value
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse()
                .map_err(|_| ApiError::bad_request(format!("categories: invalid id '{id}'")))
        })
        .collect::<Result<Vec<i64>, _>>()
        .map(Some)
}

impl SearchParams {
    pub fn to_query(&self) -> Result<SearchQuery, ApiError> {
        let (include_expenses, include_bills) = match self.include.as_deref().map(str::trim) {
            None | Some("") => (true, true),
            Some(include) => {
                let parts: Vec<&str> = include.split(',').map(str::trim).collect();
                (parts.contains(&"expenses"), parts.contains(&"bills"))
            }
        };

        Ok(SearchQuery {
            search_for: self.search_for,
            q: self.q.trim().to_string(),
            vendor: self.vendor.trim().to_string(),
            include_expenses,
            include_bills,
            categories: parse_categories(self.categories.as_deref())?,
            date_start: parse_date("date_start", self.date_start.as_deref())?,
            date_end: parse_date("date_end", self.date_end.as_deref())?,
        })
    }

    fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// GET /api/search
async fn search(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResults>, ApiError> {
    let query = params.to_query()?;
    let page = params.pagination().with_default(state.settings.page_size);
    let results = SearchRepo::new(&state.pool).search(user.id, &query, page).await?;
    Ok(Json(results))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/search", get(search))
}
