//! Bill endpoints
//!
//! A bill is an expense whose amount is the sum of its items. Item changes
//! return the recalculated bill alongside the item.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::repos::{
    AuthUser, BillItem, BillItemFields, BillItemRepo, BulkItemEdit, BulkItemResult, Expense, ExpenseFields,
    ExpenseListItem, ExpenseRepo,
};
use crate::http::error::ApiError;
use crate::http::extractors::ValidJson;
use crate::http::server::AppState;
use crate::models::{Description, PageResponse, PaginationParams, ValidationError, Vendor};

/// Bill metadata; the amount always comes from the items
#[derive(Debug, Deserialize)]
pub struct BillRequest {
    pub date: NaiveDate,
    pub vendor: String,
    pub category_id: i64,
    #[serde(default)]
    pub description: String,
}

impl BillRequest {
    fn into_fields(self, amount: Decimal) -> Result<ExpenseFields, ValidationError> {
        Ok(ExpenseFields {
            date: self.date,
            vendor: Vendor::new(&self.vendor)?,
            category_id: self.category_id,
            amount,
            description: Description::new(&self.description)?,
        })
    }
}

fn default_count() -> Decimal {
    Decimal::ONE
}

/// Bill item create/edit request
#[derive(Debug, Deserialize)]
pub struct ItemRequest {
    pub product: String,
    #[serde(default)]
    pub serving: Option<Decimal>,
    #[serde(default = "default_count")]
    pub count: Decimal,
    pub unit_price: Decimal,
}

impl ItemRequest {
    fn into_fields(self) -> Result<BillItemFields, ValidationError> {
        BillItemFields::new(&self.product, self.serving, self.count, self.unit_price)
    }
}

/// Bill item with its line amount
#[derive(Serialize)]
pub struct ItemView {
    #[serde(flatten)]
    pub item: BillItem,
    pub amount: Decimal,
}

impl From<BillItem> for ItemView {
    fn from(item: BillItem) -> Self {
        Self {
            amount: item.amount(),
            item,
        }
    }
}

#[derive(Serialize)]
pub struct BillDetail {
    pub bill: ExpenseListItem,
    pub items: Vec<ItemView>,
}

#[derive(Serialize)]
pub struct ItemChange {
    pub item: ItemView,
    pub bill: Expense,
}

/// Fetch an expense and make sure it is a bill.
async fn find_bill(state: &AppState, user_id: i64, id: i64) -> Result<ExpenseListItem, ApiError> {
    let bill = ExpenseRepo::new(&state.pool).get(user_id, id).await?;
    if !bill.expense.is_bill {
        return Err(ApiError::NotFound {
            resource: "bill",
            id: id.to_string(),
        });
    }
    Ok(bill)
}

/// GET /api/bills
async fn list_bills(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PageResponse<ExpenseListItem>>, ApiError> {
    let page = params.with_default(state.settings.page_size);
    let result = ExpenseRepo::new(&state.pool).list_bills(user.id, page).await?;
    Ok(Json(result.into_response()))
}

/// POST /api/bills - create an empty bill
async fn create_bill(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidJson(req): ValidJson<BillRequest>,
) -> Result<(StatusCode, Json<Expense>), ApiError> {
    let fields = req.into_fields(Decimal::ZERO)?;
    let bill = ExpenseRepo::new(&state.pool).create_bill(user.id, &fields).await?;
    Ok((StatusCode::CREATED, Json(bill)))
}

/// GET /api/bills/{id}
async fn show_bill(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<BillDetail>, ApiError> {
    let bill = find_bill(&state, user.id, id).await?;
    let items = BillItemRepo::new(&state.pool).list_for_bill(user.id, id).await?;
    Ok(Json(BillDetail {
        bill,
        items: items.into_iter().map(ItemView::from).collect(),
    }))
}

/// PUT /api/bills/{id} - edit date, vendor, category and description
async fn update_bill(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
    ValidJson(req): ValidJson<BillRequest>,
) -> Result<Json<Expense>, ApiError> {
    let current = find_bill(&state, user.id, id).await?;
    let fields = req.into_fields(current.expense.amount)?;
    let bill = ExpenseRepo::new(&state.pool).update(user.id, id, &fields).await?;
    Ok(Json(bill))
}

/// DELETE /api/bills/{id}
async fn delete_bill(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    find_bill(&state, user.id, id).await?;
    ExpenseRepo::new(&state.pool).delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/bills/{id}/convert - collapse into a simple expense
async fn convert_bill(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Expense>, ApiError> {
    find_bill(&state, user.id, id).await?;
    let expense = ExpenseRepo::new(&state.pool).convert(user.id, id).await?;
    Ok(Json(expense))
}

/// POST /api/bills/{id}/items
async fn add_item(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(bill_id): Path<i64>,
    ValidJson(req): ValidJson<ItemRequest>,
) -> Result<(StatusCode, Json<ItemChange>), ApiError> {
    let fields = req.into_fields()?;
    let (item, bill) = BillItemRepo::new(&state.pool).create(user.id, bill_id, &fields).await?;
    Ok((
        StatusCode::CREATED,
        Json(ItemChange {
            item: item.into(),
            bill,
        }),
    ))
}

/// PUT /api/bills/{id}/items/{item_id}
async fn update_item(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path((bill_id, item_id)): Path<(i64, i64)>,
    ValidJson(req): ValidJson<ItemRequest>,
) -> Result<Json<ItemChange>, ApiError> {
    let fields = req.into_fields()?;
    let (item, bill) = BillItemRepo::new(&state.pool)
        .update(user.id, bill_id, item_id, &fields)
        .await?;
    Ok(Json(ItemChange {
        item: item.into(),
        bill,
    }))
}

/// DELETE /api/bills/{id}/items/{item_id} - returns the recalculated bill
async fn delete_item(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path((bill_id, item_id)): Path<(i64, i64)>,
) -> Result<Json<Expense>, ApiError> {
    let bill = BillItemRepo::new(&state.pool).delete(user.id, bill_id, item_id).await?;
    Ok(Json(bill))
}

/// POST /api/bills/{id}/items/bulk
async fn bulk_items(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(bill_id): Path<i64>,
    ValidJson(edit): ValidJson<BulkItemEdit>,
) -> Result<Json<BulkItemResult>, ApiError> {
    let result = BillItemRepo::new(&state.pool).bulk_edit(user.id, bill_id, &edit).await?;
    Ok(Json(result))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bills", get(list_bills).post(create_bill))
        .route("/bills/{id}", get(show_bill).put(update_bill).delete(delete_bill))
        .route("/bills/{id}/convert", post(convert_bill))
        .route("/bills/{id}/items", post(add_item))
        .route("/bills/{id}/items/bulk", post(bulk_items))
        .route("/bills/{id}/items/{item_id}", put(update_item).delete(delete_item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn item_count_defaults_to_one() {
        let req: ItemRequest = serde_json::from_value(json!({"product": "Milk", "unit_price": "0.99"})).unwrap();
        let fields = req.into_fields().unwrap();
        assert_eq!(fields.count, Decimal::ONE);
        assert_eq!(fields.serving, None);
    }

    #[test]
    fn bill_description_is_optional() {
        let req: BillRequest =
            serde_json::from_value(json!({"date": "2024-03-01", "vendor": "Market", "category_id": 3})).unwrap();
        let fields = req.into_fields(Decimal::ZERO).unwrap();
        assert_eq!(fields.description.as_str(), "");
    }

    #[test]
    fn zero_count_is_rejected() {
        let req: ItemRequest =
            serde_json::from_value(json!({"product": "Milk", "count": 0, "unit_price": "0.99"})).unwrap();
        assert!(req.into_fields().is_err());
    }
}
