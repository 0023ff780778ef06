//! Sync API for offline clients
//!
//! Everything except `hello` needs an API key. The POST endpoints answer a
//! GET with 400, and a body that is not JSON with 400.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Json, Router};
use expensectl_core::sync::{SyncRequest, SyncResponse};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::db::repos::categories::default_order;
use crate::db::repos::{AuthUser, CategoryRepo, DbError};
use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::models::CategoryName;
use crate::sync::SyncEngine;

const BAD_DATA: &str = "Bad request data.";

#[derive(Serialize)]
pub struct Hello {
    /// How clients authenticate
    pub auth: &'static str,
    pub profile_url: &'static str,
    pub run_url: &'static str,
}

#[derive(Serialize)]
pub struct Profile {
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
pub struct CategoryAdd {
    pub name: String,
    #[serde(default = "default_order")]
    pub order: i32,
}

#[derive(Debug, Deserialize)]
pub struct CategoryEdit {
    pub id: i64,
    pub name: String,
    #[serde(default = "default_order")]
    pub order: i32,
}

#[derive(Debug, Deserialize)]
pub struct CategoryDelete {
    pub id: i64,
    #[serde(default)]
    pub move_destination: Option<i64>,
}

fn post_only() -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({"error": "Only POST requests allowed"}))).into_response()
}

fn not_json() -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({"error": "POST data must be JSON"}))).into_response()
}

fn failure(status: StatusCode, error: &str) -> Response {
    (status, Json(json!({"success": false, "error": error}))).into_response()
}

fn success() -> Response {
    Json(json!({"success": true})).into_response()
}

/// Parse a POST body: not JSON at all, or JSON of the wrong shape.
enum Parsed<T> {
    Ok(T),
    NotJson,
    WrongShape(serde_json::Error),
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Parsed<T> {
    let Ok(value) = serde_json::from_slice::<Value>(body) else {
        return Parsed::NotJson;
    };
    match serde_json::from_value(value) {
        Ok(parsed) => Parsed::Ok(parsed),
        Err(e) => Parsed::WrongShape(e),
    }
}

/// GET /api/sync/hello
async fn hello() -> Json<Hello> {
    Json(Hello {
        auth: "bearer",
        profile_url: "/api/sync/profile",
        run_url: "/api/sync/run",
    })
}

/// GET /api/sync/profile
async fn profile(user: AuthUser) -> Json<Profile> {
    Json(Profile {
        full_name: user.display_name().to_string(),
    })
}

async fn reject_get(_user: AuthUser) -> Response {
    post_only()
}

/// POST /api/sync/run
async fn run(State(state): State<Arc<AppState>>, user: AuthUser, body: Bytes) -> Result<Response, ApiError> {
    let request: SyncRequest = match parse_body(&body) {
        Parsed::Ok(request) => request,
        Parsed::NotJson => return Ok(not_json()),
        Parsed::WrongShape(e) => return Err(ApiError::bad_request(e.to_string())),
    };
    let response: SyncResponse = SyncEngine::new(&state.pool).run(user.id, &request).await?;
    Ok(Json(response).into_response())
}

/// POST /api/sync/category/add
async fn category_add(State(state): State<Arc<AppState>>, user: AuthUser, body: Bytes) -> Result<Response, ApiError> {
    let req: CategoryAdd = match parse_body(&body) {
        Parsed::Ok(req) => req,
        Parsed::NotJson => return Ok(not_json()),
        Parsed::WrongShape(_) => return Ok(failure(StatusCode::BAD_REQUEST, BAD_DATA)),
    };
    let Ok(name) = CategoryName::new(&req.name) else {
        return Ok(failure(StatusCode::BAD_REQUEST, BAD_DATA));
    };
    CategoryRepo::new(&state.pool).create(user.id, &name, req.order).await?;
    Ok(success())
}

/// POST /api/sync/category/edit
async fn category_edit(State(state): State<Arc<AppState>>, user: AuthUser, body: Bytes) -> Result<Response, ApiError> {
    let req: CategoryEdit = match parse_body(&body) {
        Parsed::Ok(req) => req,
        Parsed::NotJson => return Ok(not_json()),
        Parsed::WrongShape(_) => return Ok(failure(StatusCode::BAD_REQUEST, BAD_DATA)),
    };
    let Ok(name) = CategoryName::new(&req.name) else {
        return Ok(failure(StatusCode::BAD_REQUEST, BAD_DATA));
    };
    match CategoryRepo::new(&state.pool).update(user.id, req.id, &name, req.order).await {
        Ok(_) => Ok(success()),
        Err(DbError::NotFound { .. }) => Ok(failure(StatusCode::BAD_REQUEST, BAD_DATA)),
        Err(e) => Err(e.into()),
    }
}

/// POST /api/sync/category/delete
async fn category_delete(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    body: Bytes,
) -> Result<Response, ApiError> {
    let req: CategoryDelete = match parse_body(&body) {
        Parsed::Ok(req) => req,
        Parsed::NotJson => return Ok(not_json()),
        Parsed::WrongShape(_) => return Ok(failure(StatusCode::BAD_REQUEST, BAD_DATA)),
    };
    match CategoryRepo::new(&state.pool)
        .delete(user.id, req.id, req.move_destination)
        .await
    {
        Ok(()) => Ok(success()),
        Err(DbError::NotFound { .. } | DbError::Invalid { .. }) => Ok(failure(StatusCode::BAD_REQUEST, BAD_DATA)),
        Err(DbError::Conflict { reason }) => Ok(failure(StatusCode::CONFLICT, &reason)),
        Err(e) => Err(e.into()),
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sync/hello", get(hello))
        .route("/sync/profile", get(profile))
        .route("/sync/run", get(reject_get).post(run))
        .route("/sync/category/add", get(reject_get).post(category_add))
        .route("/sync/category/edit", get(reject_get).post(category_edit))
        .route("/sync/category/delete", get(reject_get).post(category_delete))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::server::tests::lazy_router;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn hello_is_public() {
        let response = lazy_router()
            .oneshot(Request::get("/api/sync/hello").body(axum::body::Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["run_url"], "/api/sync/run");
    }

    #[tokio::test]
    async fn run_requires_api_key() {
        let response = lazy_router()
            .oneshot(
                Request::post("/api/sync/run")
                    .body(axum::body::Body::from(r#"{"last_sync": null}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn body_parsing_distinguishes_bad_json() {
        assert!(matches!(parse_body::<CategoryAdd>(b"{not json"), Parsed::NotJson));
        assert!(matches!(parse_body::<CategoryAdd>(br#"{"order": 2}"#), Parsed::WrongShape(_)));
        match parse_body::<CategoryAdd>(br#"{"name": "Food"}"#) {
            Parsed::Ok(req) => assert_eq!(req.order, 1),
            _ => panic!("expected a parsed body"),
        }
    }

    #[tokio::test]
    async fn post_only_body() {
        let response = post_only();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "Only POST requests allowed");
    }
}
