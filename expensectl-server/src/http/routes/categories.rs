//! Category endpoints
//!
//! Categories are addressed by slug in URLs.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::repos::categories::default_order;
use crate::db::repos::{
    AuthUser, BulkEditSummary, Category, CategoryChange, CategoryRepo, CategoryWithCount, ExpenseListItem,
    ExpenseRepo, ExpenseTemplate, NewCategory, TemplateRepo,
};
use crate::http::error::ApiError;
use crate::http::extractors::ValidJson;
use crate::http::server::AppState;
use crate::models::{CategoryName, PageResponse, PaginationParams};

/// Create or edit request
#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    #[serde(default = "default_order")]
    pub order: i32,
}

/// Bulk editor payload
#[derive(Debug, Default, Deserialize)]
pub struct BulkEditRequest {
    #[serde(default)]
    pub changes: Vec<CategoryChange>,
    #[serde(default)]
    pub add: Vec<NewCategory>,
}

/// Category page: the category with a page of its expenses
#[derive(Serialize)]
pub struct CategoryDetail {
    pub category: CategoryWithCount,
    pub expenses: PageResponse<ExpenseListItem>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    /// Destination for the category's expenses and templates
    pub move_to: Option<i64>,
}

/// GET /api/categories
async fn list_categories(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PageResponse<CategoryWithCount>>, ApiError> {
    let page = params.with_default(state.settings.page_size);
    let result = CategoryRepo::new(&state.pool).list_paginated(user.id, page).await?;
    Ok(Json(result.into_response()))
}

/// POST /api/categories
async fn create_category(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidJson(req): ValidJson<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let name = CategoryName::new(&req.name)?;
    let category = CategoryRepo::new(&state.pool).create(user.id, &name, req.order).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// POST /api/categories/bulk - rename/reorder existing and add new ones
async fn bulk_edit(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidJson(req): ValidJson<BulkEditRequest>,
) -> Result<Json<BulkEditSummary>, ApiError> {
    let summary = CategoryRepo::new(&state.pool)
        .bulk_edit(user.id, &req.changes, &req.add)
        .await?;
    Ok(Json(summary))
}

/// GET /api/categories/{slug}
async fn show_category(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(slug): Path<String>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<CategoryDetail>, ApiError> {
    let category = CategoryRepo::new(&state.pool).get_by_slug(user.id, &slug).await?;
    let page = params.with_default(state.settings.page_size);
    let expenses = ExpenseRepo::new(&state.pool)
        .list_for_category(user.id, category.category.id, page)
        .await?;
    Ok(Json(CategoryDetail {
        category,
        expenses: expenses.into_response(),
    }))
}

/// GET /api/categories/{slug}/templates
async fn category_templates(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(slug): Path<String>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PageResponse<ExpenseTemplate>>, ApiError> {
    let category = CategoryRepo::new(&state.pool).get_by_slug(user.id, &slug).await?;
    let page = params.with_default(state.settings.page_size);
    let templates = TemplateRepo::new(&state.pool)
        .list_for_category(user.id, category.category.id, page)
        .await?;
    Ok(Json(templates.into_response()))
}

/// PUT /api/categories/{slug}
async fn update_category(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(slug): Path<String>,
    ValidJson(req): ValidJson<CategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    let name = CategoryName::new(&req.name)?;
    let repo = CategoryRepo::new(&state.pool);
    let current = repo.get_by_slug(user.id, &slug).await?;
    let category = repo.update(user.id, current.category.id, &name, req.order).await?;
    Ok(Json(category))
}

/// DELETE /api/categories/{slug}?move_to={id}
async fn delete_category(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(slug): Path<String>,
    Query(params): Query<DeleteParams>,
) -> Result<StatusCode, ApiError> {
    let repo = CategoryRepo::new(&state.pool);
    let current = repo.get_by_slug(user.id, &slug).await?;
    repo.delete(user.id, current.category.id, params.move_to).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route("/categories/bulk", post(bulk_edit))
        .route(
            "/categories/{slug}",
            get(show_category).put(update_category).delete(delete_category),
        )
        .route("/categories/{slug}/templates", get(category_templates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::server::tests::lazy_router;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[test]
    fn order_defaults_to_one() {
        let req: CategoryRequest = serde_json::from_str(r#"{"name": "Food"}"#).unwrap();
        assert_eq!(req.order, 1);
    }

    #[test]
    fn bulk_request_sections_are_optional() {
        let req: BulkEditRequest = serde_json::from_str(r#"{"add": [{"name": "Fuel"}]}"#).unwrap();
        assert!(req.changes.is_empty());
        assert_eq!(req.add.len(), 1);
    }

    #[tokio::test]
    async fn list_requires_api_key() {
        let response = lazy_router()
            .oneshot(Request::get("/api/categories").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unsupported_method_is_405() {
        let response = lazy_router()
            .oneshot(Request::patch("/api/categories").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
