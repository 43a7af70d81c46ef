//! Catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::ProductId;
use domain::{NewProduct, Product, ProductPatch};

use super::{AppState, parse_id};
use crate::Storefront;
use crate::auth::{AdminCaller, Caller};
use crate::error::ApiError;

/// GET /api/user/products
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.user_id))]
pub async fn list<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.catalog.list().await?))
}

/// GET /api/admin/products
#[tracing::instrument(skip(state, _admin))]
pub async fn list_admin<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminCaller,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.catalog.list().await?))
}

/// POST /api/admin/products
#[tracing::instrument(skip(state, _admin, payload))]
pub async fn create<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminCaller,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let Json(req) = payload?;
    let product = state.catalog.create(req).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /api/admin/products/{id}: only the fields present in the body change.
#[tracing::instrument(skip(state, _admin, payload))]
pub async fn update<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminCaller,
    Path(id): Path<String>,
    payload: Result<Json<ProductPatch>, JsonRejection>,
) -> Result<Json<Product>, ApiError> {
    let Json(patch) = payload?;
    let id: ProductId = parse_id(&id, "product id")?;
    Ok(Json(state.catalog.update(id, patch).await?))
}

/// DELETE /api/admin/products/{id}
#[tracing::instrument(skip(state, _admin))]
pub async fn delete<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminCaller,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: ProductId = parse_id(&id, "product id")?;
    state.catalog.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
