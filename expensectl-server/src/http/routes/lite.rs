//! Lite API for quick-add clients
//!
//! Answers with bare status codes: 401 without a valid key, 400 for bad
//! input, 405 for the wrong method, 200 with an empty body on success.
//! The key is checked before the method.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::{
    routing::{any, post},
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::repos::{CategoryRepo, DbError, ExpenseFields, ExpenseRepo};
use crate::http::extractors::LiteUser;
use crate::http::server::AppState;
use crate::models::{validate_money, Description, ValidationError, Vendor};

#[derive(Serialize)]
pub struct LiteCategory {
    pub id: i64,
    pub name: String,
}

#[derive(Serialize)]
pub struct LiteCategories {
    pub results: Vec<LiteCategory>,
}

/// Quick-add payload
#[derive(Debug, Deserialize)]
pub struct QuickExpense {
    pub category: i64,
    pub date: NaiveDate,
    pub vendor: String,
    pub amount: Decimal,
    pub description: String,
}

impl QuickExpense {
    fn into_fields(self) -> Result<ExpenseFields, ValidationError> {
        Ok(ExpenseFields {
            date: self.date,
            vendor: Vendor::new(&self.vendor)?,
            category_id: self.category,
            amount: validate_money("amount", self.amount)?,
            description: Description::new(&self.description)?,
        })
    }
}

fn internal(e: DbError) -> StatusCode {
    tracing::error!("Database error: {}", e);
    StatusCode::INTERNAL_SERVER_ERROR
}

/// GET /api/lite/categories
async fn categories(
    State(state): State<Arc<AppState>>,
    LiteUser(user): LiteUser,
) -> Result<Json<LiteCategories>, StatusCode> {
    let categories = CategoryRepo::new(&state.pool).list(user.id).await.map_err(internal)?;
    Ok(Json(LiteCategories {
        results: categories
            .into_iter()
            .map(|c| LiteCategory {
                id: c.category.id,
                name: c.category.name,
            })
            .collect(),
    }))
}

/// POST /api/lite/expenses
async fn quick_add(State(state): State<Arc<AppState>>, LiteUser(user): LiteUser, body: Bytes) -> StatusCode {
    let Ok(expense) = serde_json::from_slice::<QuickExpense>(&body) else {
        return StatusCode::BAD_REQUEST;
    };
    let fields = match expense.into_fields() {
        Ok(fields) => fields,
        Err(e) => {
            tracing::debug!(user_id = user.id, "lite expense rejected: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };

    match ExpenseRepo::new(&state.pool).create(user.id, &fields).await {
        Ok(_) => StatusCode::OK,
        // someone else's or a missing category
        Err(DbError::NotFound { .. }) => StatusCode::BAD_REQUEST,
        Err(e) => internal(e),
    }
}

/// Any method other than POST on /api/lite/expenses
async fn wrong_method(LiteUser(_): LiteUser) -> StatusCode {
    StatusCode::METHOD_NOT_ALLOWED
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/lite/categories", any(categories))
        .route("/lite/expenses", post(quick_add).fallback(wrong_method))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repos::test_support::setup;
    use crate::db::repos::ApiKeyRepo;
    use crate::http::server::tests::lazy_router;
    use crate::http::server::{build_router, AppSettings};
    use crate::models::ApiKeyName;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn wrong_method_without_key_is_401() {
        let response = lazy_router()
            .oneshot(Request::get("/api/lite/expenses").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn wrong_method_with_key_is_405() {
        let (pool, user_id) = setup().await;
        let key = ApiKeyRepo::new(&pool)
            .create(user_id, &ApiKeyName::new("phone").unwrap())
            .await
            .unwrap();

        let response = build_router(AppState {
            pool,
            settings: AppSettings::default(),
        })
        .oneshot(
            Request::get("/api/lite/expenses")
                .header("authorization", format!("Bearer {}", key.key))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn missing_key_is_401() {
        let response = lazy_router()
            .oneshot(
                Request::post("/api/lite/expenses")
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn missing_fields_do_not_parse() {
        assert!(serde_json::from_str::<QuickExpense>(r#"{"category": 1, "date": "2024-01-01"}"#).is_err());
    }
}
