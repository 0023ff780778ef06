//! Dashboard: recent expenses and spending totals

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::{routing::get, Json, Router};
use chrono::{Local, NaiveDate};
use serde::Deserialize;

use crate::db::repos::{AuthUser, Dashboard, ExpenseRepo};
use crate::http::error::ApiError;
use crate::http::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DashboardParams {
    /// Reference day for the totals; defaults to today
    pub today: Option<NaiveDate>,
}

/// GET /api/dashboard
async fn dashboard(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<DashboardParams>,
) -> Result<Json<Dashboard>, ApiError> {
    let today = params.today.unwrap_or_else(|| Local::now().date_naive());
    let dashboard = ExpenseRepo::new(&state.pool)
        .dashboard(user.id, today, state.settings.index_count)
        .await?;
    Ok(Json(dashboard))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/dashboard", get(dashboard))
}

#[cfg(test)]
mod tests {
    use crate::http::server::tests::lazy_router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn requires_api_key() {
        let response = lazy_router()
            .oneshot(Request::get("/api/dashboard").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
