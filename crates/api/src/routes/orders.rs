//! Checkout and order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{Order, OrderStatus};
use serde::{Deserialize, Serialize};

use super::{AppState, parse_id};
use crate::Storefront;
use crate::auth::{AdminCaller, Caller};
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CheckoutRequest {
    #[serde(alias = "productIds")]
    pub product_ids: Vec<String>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub status: String,
    pub total_cents: i64,
    pub lines: Vec<OrderLineResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub product_id: String,
    pub product_name: String,
    pub unit_price_cents: i64,
    pub quantity: u32,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id.to_string(),
            user_id: order.user_id.to_string(),
            status: order.status.to_string(),
            total_cents: order.total.cents(),
            lines: order
                .lines
                .into_iter()
                .map(|line| OrderLineResponse {
                    product_id: line.product_id.to_string(),
                    product_name: line.product_name,
                    unit_price_cents: line.unit_price.cents(),
                    quantity: line.quantity,
                })
                .collect(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

fn to_responses(orders: Vec<Order>) -> Vec<OrderResponse> {
    orders.into_iter().map(Into::into).collect()
}

// -- Customer handlers --

/// POST /api/user/checkout
#[tracing::instrument(skip(state, caller, payload), fields(user_id = %caller.user_id))]
pub async fn checkout<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let Json(req) = payload?;
    let order = state
        .checkout
        .checkout(&caller.user_id, &req.product_ids)
        .await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /api/user/orders
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.user_id))]
pub async fn list_mine<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.orders.list_for_user(&caller.user_id).await?;
    Ok(Json(to_responses(orders)))
}

/// PUT /api/user/orders/{id}/cancel
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.user_id))]
pub async fn cancel_mine<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let id: OrderId = parse_id(&id, "order id")?;
    let order = state.orders.cancel_for_user(id, &caller.user_id).await?;
    Ok(Json(order.into()))
}

// -- Admin handlers --

/// GET /api/admin/orders
#[tracing::instrument(skip(state, _admin))]
pub async fn list_all<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminCaller,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    Ok(Json(to_responses(state.orders.list_all().await?)))
}

/// GET /api/admin/orders/{id}
#[tracing::instrument(skip(state, _admin))]
pub async fn get<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminCaller,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let id: OrderId = parse_id(&id, "order id")?;
    Ok(Json(state.orders.get_order(id).await?.into()))
}

/// PUT /api/admin/orders/{id}/status
#[tracing::instrument(skip(state, _admin, payload))]
pub async fn update_status<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminCaller,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    let Json(req) = payload?;
    let id: OrderId = parse_id(&id, "order id")?;
    let status: OrderStatus = req
        .status
        .trim()
        .parse()
        .map_err(|e: domain::DomainError| ApiError::BadRequest(e.to_string()))?;

    let order = state.orders.update_status(id, status).await?;
    Ok(Json(order.into()))
}

/// PUT /api/admin/orders/{id}/cancel
#[tracing::instrument(skip(state, _admin))]
pub async fn cancel<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminCaller,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let id: OrderId = parse_id(&id, "order id")?;
    Ok(Json(state.orders.cancel_as_admin(id).await?.into()))
}
