//! Custom Axum extractors

use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::de::DeserializeOwned;

use super::error::ApiError;
use super::server::AppState;
use crate::db::repos::{ApiKeyRepo, AuthUser, DbError};

const BEARER: &str = "bearer ";

/// API key from an `Authorization: Bearer <key>` header. The scheme is
/// matched case-insensitively.
pub fn bearer_key(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let scheme = value.get(..BEARER.len())?;
    if !scheme.eq_ignore_ascii_case(BEARER) {
        return None;
    }
    Some(&value[BEARER.len()..]).filter(|key| !key.is_empty())
}

async fn authenticate(parts: &Parts, state: &AppState) -> Result<Option<AuthUser>, DbError> {
    match bearer_key(&parts.headers) {
        Some(key) => ApiKeyRepo::new(&state.pool).authenticate(key).await,
        None => Ok(None),
    }
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).await?.ok_or(ApiError::Unauthorized)
    }
}

/// Authenticated user for the lite API, which answers with bare status codes.
pub struct LiteUser(pub AuthUser);

impl FromRequestParts<Arc<AppState>> for LiteUser {
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        match authenticate(parts, state).await {
            Ok(Some(user)) => Ok(Self(user)),
            Ok(None) => Err(StatusCode::UNAUTHORIZED),
            Err(e) => {
                tracing::error!("Database error: {}", e);
                Err(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

/// JSON body whose rejections render as [`ApiError`]
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        Ok(Self(value))
    }
}
