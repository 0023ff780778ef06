//! Autocomplete endpoints: prefix matches, most recent first

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::{routing::get, Json, Router};
use serde::Deserialize;

use crate::db::repos::{AutocompleteRepo, AuthUser, ItemHint};
use crate::http::error::ApiError;
use crate::http::server::AppState;

#[derive(Debug, Deserialize)]
pub struct HintParams {
    pub q: String,
    /// Narrows description hints to one vendor
    pub vendor: Option<String>,
}

/// GET /api/autocomplete/expense/vendor?q=
async fn expense_vendor(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<HintParams>,
) -> Result<Json<Vec<String>>, ApiError> {
    let hints = AutocompleteRepo::new(&state.pool).expense_vendor(user.id, &params.q).await?;
    Ok(Json(hints))
}

/// GET /api/autocomplete/expense/description?q=&vendor=
async fn expense_description(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<HintParams>,
) -> Result<Json<Vec<String>>, ApiError> {
    let hints = AutocompleteRepo::new(&state.pool)
        .expense_description(user.id, &params.q, params.vendor.as_deref())
        .await?;
    Ok(Json(hints))
}

/// GET /api/autocomplete/bill/vendor?q=
async fn bill_vendor(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<HintParams>,
) -> Result<Json<Vec<String>>, ApiError> {
    let hints = AutocompleteRepo::new(&state.pool).bill_vendor(user.id, &params.q).await?;
    Ok(Json(hints))
}

/// GET /api/autocomplete/bill/item?q=
async fn bill_item(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<HintParams>,
) -> Result<Json<Vec<ItemHint>>, ApiError> {
    let hints = AutocompleteRepo::new(&state.pool).bill_item(user.id, &params.q).await?;
    Ok(Json(hints))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/autocomplete/expense/vendor", get(expense_vendor))
        .route("/autocomplete/expense/description", get(expense_description))
        .route("/autocomplete/bill/vendor", get(bill_vendor))
        .route("/autocomplete/bill/item", get(bill_item))
}
