//! Expense endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::db::repos::{AuthUser, Expense, ExpenseFields, ExpenseListItem, ExpenseRepo};
use crate::http::error::ApiError;
use crate::http::extractors::ValidJson;
use crate::http::server::AppState;
use crate::models::{validate_money, Description, PageResponse, PaginationParams, ValidationError, Vendor};

/// Create or edit request for a simple expense
#[derive(Debug, Deserialize)]
pub struct ExpenseRequest {
    pub date: NaiveDate,
    pub vendor: String,
    pub category_id: i64,
    pub amount: Decimal,
    #[serde(default)]
    pub description: String,
}

impl ExpenseRequest {
    pub fn into_fields(self) -> Result<ExpenseFields, ValidationError> {
        Ok(ExpenseFields {
            date: self.date,
            vendor: Vendor::new(&self.vendor)?,
            category_id: self.category_id,
            amount: validate_money("amount", self.amount)?,
            description: Description::required(&self.description)?,
        })
    }
}

/// GET /api/expenses - bills included, newest first
async fn list_expenses(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PageResponse<ExpenseListItem>>, ApiError> {
    let page = params.with_default(state.settings.page_size);
    let result = ExpenseRepo::new(&state.pool).list(user.id, page).await?;
    Ok(Json(result.into_response()))
}

/// POST /api/expenses
async fn create_expense(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidJson(req): ValidJson<ExpenseRequest>,
) -> Result<(StatusCode, Json<Expense>), ApiError> {
    let fields = req.into_fields()?;
    let expense = ExpenseRepo::new(&state.pool).create(user.id, &fields).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

/// GET /api/expenses/{id}
async fn show_expense(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ExpenseListItem>, ApiError> {
    let expense = ExpenseRepo::new(&state.pool).get(user.id, id).await?;
    Ok(Json(expense))
}

/// PUT /api/expenses/{id}
async fn update_expense(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
    ValidJson(req): ValidJson<ExpenseRequest>,
) -> Result<Json<Expense>, ApiError> {
    let fields = req.into_fields()?;
    let repo = ExpenseRepo::new(&state.pool);
    if repo.get(user.id, id).await?.expense.is_bill {
        return Err(ApiError::bad_request("bills are edited through /api/bills"));
    }
    let expense = repo.update(user.id, id, &fields).await?;
    Ok(Json(expense))
}

/// DELETE /api/expenses/{id}
async fn delete_expense(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    ExpenseRepo::new(&state.pool).delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/expenses/{id}/convert - turn an expense into a bill or back
async fn convert_expense(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Expense>, ApiError> {
    let expense = ExpenseRepo::new(&state.pool).convert(user.id, id).await?;
    Ok(Json(expense))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/expenses", get(list_expenses).post(create_expense))
        .route(
            "/expenses/{id}",
            get(show_expense).put(update_expense).delete(delete_expense),
        )
        .route("/expenses/{id}/convert", post(convert_expense))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: serde_json::Value) -> ExpenseRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn simple_expense_needs_description() {
        let req = request(json!({
            "date": "2024-03-01", "vendor": "Cafe", "category_id": 1, "amount": "4.50"
        }));
        assert!(matches!(req.into_fields(), Err(ValidationError::Empty { field: "description" })));
    }

    #[test]
    fn amount_accepts_numbers_and_strings() {
        let fields = request(json!({
            "date": "2024-03-01", "vendor": "Cafe", "category_id": 1, "amount": 4.5,
            "description": "Coffee"
        }))
        .into_fields()
        .unwrap();
        assert_eq!(fields.amount, "4.5".parse::<Decimal>().unwrap());

        let fields = request(json!({
            "date": "2024-03-01", "vendor": "Cafe", "category_id": 1, "amount": "4.50",
            "description": "Coffee"
        }))
        .into_fields()
        .unwrap();
        assert_eq!(fields.vendor.as_str(), "Cafe");
    }

    #[test]
    fn rejects_sub_cent_amounts() {
        let req = request(json!({
            "date": "2024-03-01", "vendor": "Cafe", "category_id": 1, "amount": "4.505",
            "description": "Coffee"
        }));
        assert!(matches!(req.into_fields(), Err(ValidationError::OutOfRange { .. })));
    }
}
