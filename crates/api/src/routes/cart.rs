//! Cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CartEntry;
use common::ProductId;
use serde::{Deserialize, Serialize};

use super::{AppState, parse_id};
use crate::Storefront;
use crate::auth::Caller;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct AddToCartRequest {
    #[serde(alias = "productId")]
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct UpdateCartRequest {
    pub quantity: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct CartItemResponse {
    pub product_id: String,
    pub product_name: String,
    pub price_cents: i64,
    pub quantity: u32,
    pub stock: u32,
    pub total_cents: Option<i64>,
}

impl From<CartEntry> for CartItemResponse {
    fn from(entry: CartEntry) -> Self {
        let total_cents = entry.subtotal().map(|m| m.cents());
        Self {
            product_id: entry.product.id.to_string(),
            product_name: entry.product.name,
            price_cents: entry.product.price.cents(),
            quantity: entry.line.quantity,
            stock: entry.product.stock,
            total_cents,
        }
    }
}

// -- Handlers --

/// GET /api/user/cart
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.user_id))]
pub async fn list<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
) -> Result<Json<Vec<CartItemResponse>>, ApiError> {
    let entries = state.cart.list(&caller.user_id).await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

/// POST /api/user/cart
#[tracing::instrument(skip(state, caller, payload), fields(user_id = %caller.user_id))]
pub async fn add<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    payload: Result<Json<AddToCartRequest>, JsonRejection>,
) -> Result<Json<CartItemResponse>, ApiError> {
    let Json(req) = payload?;
    let product_id: ProductId = parse_id(&req.product_id, "product id")?;
    let entry = state
        .cart
        .add_item(&caller.user_id, product_id, req.quantity)
        .await?;
    Ok(Json(entry.into()))
}

/// PUT /api/user/cart/{product_id}: a quantity of zero removes the line.
#[tracing::instrument(skip(state, caller, payload), fields(user_id = %caller.user_id))]
pub async fn update<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(product_id): Path<String>,
    payload: Result<Json<UpdateCartRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload?;
    let product_id: ProductId = parse_id(&product_id, "product id")?;
    let updated = state
        .cart
        .update_quantity(&caller.user_id, product_id, req.quantity)
        .await?;

    Ok(match updated {
        Some(entry) => Json(CartItemResponse::from(entry)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

/// DELETE /api/user/cart/{product_id}
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.user_id))]
pub async fn remove<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(product_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let product_id: ProductId = parse_id(&product_id, "product id")?;
    state.cart.remove(&caller.user_id, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
