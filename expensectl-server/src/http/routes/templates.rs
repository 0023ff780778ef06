//! Expense template endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use expensectl_core::{TemplateInput, TemplateKind};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::db::repos::{AuthUser, Expense, ExpenseTemplate, TemplateFields, TemplateRepo};
use crate::http::error::ApiError;
use crate::http::extractors::ValidJson;
use crate::http::server::AppState;
use crate::models::{
    validate_money, Comment, PageResponse, PaginationParams, TemplateDescription, TemplateName, ValidationError,
    Vendor,
};

/// Create or edit request
#[derive(Debug, Deserialize)]
pub struct TemplateRequest {
    pub name: String,
    pub vendor: String,
    pub category_id: i64,
    #[serde(rename = "type", default)]
    pub kind: TemplateKind,
    #[serde(default)]
    pub amount: Option<Decimal>,
    pub description: String,
    #[serde(default)]
    pub comment: String,
}

impl TemplateRequest {
    fn into_fields(self) -> Result<TemplateFields, ValidationError> {
        Ok(TemplateFields {
            name: TemplateName::new(&self.name)?,
            vendor: Vendor::new(&self.vendor)?,
            category_id: self.category_id,
            kind: self.kind,
            amount: self.amount.map(|a| validate_money("amount", a)).transpose()?,
            description: TemplateDescription::new(&self.description)?,
            comment: Comment::new(&self.comment)?,
        })
    }
}

/// Values for a template run
#[derive(Debug, Default, Deserialize)]
pub struct RunRequest {
    /// Expense date; defaults to today
    pub date: Option<NaiveDate>,
    #[serde(flatten)]
    pub input: TemplateInput,
}

/// GET /api/templates - ordered by name
async fn list_templates(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PageResponse<ExpenseTemplate>>, ApiError> {
    let page = params.with_default(state.settings.page_size);
    let result = TemplateRepo::new(&state.pool).list(user.id, page).await?;
    Ok(Json(result.into_response()))
}

/// POST /api/templates
async fn create_template(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidJson(req): ValidJson<TemplateRequest>,
) -> Result<(StatusCode, Json<ExpenseTemplate>), ApiError> {
    let fields = req.into_fields()?;
    let template = TemplateRepo::new(&state.pool).create(user.id, &fields).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

/// GET /api/templates/{id}
async fn show_template(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ExpenseTemplate>, ApiError> {
    let template = TemplateRepo::new(&state.pool).get(user.id, id).await?;
    Ok(Json(template))
}

/// PUT /api/templates/{id}
async fn update_template(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
    ValidJson(req): ValidJson<TemplateRequest>,
) -> Result<Json<ExpenseTemplate>, ApiError> {
    let fields = req.into_fields()?;
    let template = TemplateRepo::new(&state.pool).update(user.id, id, &fields).await?;
    Ok(Json(template))
}

/// DELETE /api/templates/{id}
async fn delete_template(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    TemplateRepo::new(&state.pool).delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/templates/{id}/run - record an expense from the template
async fn run_template(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
    ValidJson(req): ValidJson<RunRequest>,
) -> Result<(StatusCode, Json<Expense>), ApiError> {
    let date = req.date.unwrap_or_else(|| Local::now().date_naive());
    let expense = TemplateRepo::new(&state.pool).run(user.id, id, date, &req.input).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/templates", get(list_templates).post(create_template))
        .route(
            "/templates/{id}",
            get(show_template).put(update_template).delete(delete_template),
        )
        .route("/templates/{id}/run", post(run_template))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_defaults_to_simple() {
        let req: TemplateRequest = serde_json::from_value(json!({
            "name": "Coffee", "vendor": "Cafe", "category_id": 1,
            "amount": "3.50", "description": "Flat white"
        }))
        .unwrap();
        let fields = req.into_fields().unwrap();
        assert_eq!(fields.kind, TemplateKind::default());
        assert_eq!(fields.comment.as_str(), "");
    }

    #[test]
    fn run_request_flattens_input() {
        let req: RunRequest = serde_json::from_value(json!({"date": "2024-02-29", "count": "3"})).unwrap();
        assert_eq!(req.date, NaiveDate::from_ymd_opt(2024, 2, 29));
        assert_eq!(req.input.count.as_deref(), Some("3"));
        assert_eq!(req.input.desc_id, None);
    }
}
