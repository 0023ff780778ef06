//! Bill item template endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::db::repos::{AuthUser, ItemTemplate, ItemTemplateFields, ItemTemplateRepo};
use crate::http::error::ApiError;
use crate::http::extractors::ValidJson;
use crate::http::server::AppState;
use crate::models::{
    validate_money, validate_serving, Comment, PageResponse, PaginationParams, Product, ValidationError,
};

#[derive(Debug, Deserialize)]
pub struct ItemTemplateRequest {
    pub product: String,
    #[serde(default)]
    pub serving: Option<Decimal>,
    pub unit_price: Decimal,
    #[serde(default)]
    pub comment: String,
}

impl ItemTemplateRequest {
    fn into_fields(self) -> Result<ItemTemplateFields, ValidationError> {
        Ok(ItemTemplateFields {
            product: Product::new(&self.product)?,
            serving: self.serving.map(validate_serving).transpose()?,
            unit_price: validate_money("unit price", self.unit_price)?,
            comment: Comment::new(&self.comment)?,
        })
    }
}

async fn list_item_templates(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PageResponse<ItemTemplate>>, ApiError> {
    let page = params.with_default(state.settings.page_size);
    let result = ItemTemplateRepo::new(&state.pool).list(user.id, page).await?;
    Ok(Json(result.into_response()))
}

async fn create_item_template(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidJson(req): ValidJson<ItemTemplateRequest>,
) -> Result<(StatusCode, Json<ItemTemplate>), ApiError> {
    let fields = req.into_fields()?;
    let template = ItemTemplateRepo::new(&state.pool).create(user.id, &fields).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

async fn show_item_template(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ItemTemplate>, ApiError> {
    let template = ItemTemplateRepo::new(&state.pool).get(user.id, id).await?;
    Ok(Json(template))
}

async fn update_item_template(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
    ValidJson(req): ValidJson<ItemTemplateRequest>,
) -> Result<Json<ItemTemplate>, ApiError> {
    let fields = req.into_fields()?;
    let template = ItemTemplateRepo::new(&state.pool).update(user.id, id, &fields).await?;
    Ok(Json(template))
}

async fn delete_item_template(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    ItemTemplateRepo::new(&state.pool).delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Item template routes under /api/item-templates
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/item-templates", get(list_item_templates).post(create_item_template))
        .route(
            "/item-templates/{id}",
            get(show_item_template)
                .put(update_item_template)
                .delete(delete_item_template),
        )
}
