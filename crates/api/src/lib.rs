//! HTTP API server with observability for the storefront checkout service.
//!
//! Provides REST endpoints for the catalog, carts, checkout and order
//! administration, with structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use checkout::CheckoutConfig;
use metrics_exporter_prometheus::PrometheusHandle;
use store::{CartStore, OrderStore, ProductStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::AppState;

/// A single store backing the catalog, carts and orders.
pub trait Storefront: ProductStore + CartStore + OrderStore + Clone + 'static {}

impl<T> Storefront for T where T: ProductStore + CartStore + OrderStore + Clone + 'static {}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Storefront>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::system::metrics))
        .with_state(metrics_handle);

    let user = Router::new()
        .route("/products", get(routes::products::list::<S>))
        .route(
            "/cart",
            get(routes::cart::list::<S>).post(routes::cart::add::<S>),
        )
        .route(
            "/cart/{product_id}",
            put(routes::cart::update::<S>).delete(routes::cart::remove::<S>),
        )
        .route("/checkout", post(routes::orders::checkout::<S>))
        .route("/orders", get(routes::orders::list_mine::<S>))
        .route("/orders/{id}/cancel", put(routes::orders::cancel_mine::<S>));

    let admin = Router::new()
        .route(
            "/products",
            get(routes::products::list_admin::<S>).post(routes::products::create::<S>),
        )
        .route(
            "/products/{id}",
            put(routes::products::update::<S>).delete(routes::products::delete::<S>),
        )
        .route("/orders", get(routes::orders::list_all::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/status", put(routes::orders::update_status::<S>))
        .route("/orders/{id}/cancel", put(routes::orders::cancel::<S>));

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api/user", user)
        .nest("/api/admin", admin)
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state with every service wired to `store`.
pub fn create_default_state<S: Storefront>(store: S, config: CheckoutConfig) -> Arc<AppState<S>> {
    Arc::new(AppState::new(store, config))
}
