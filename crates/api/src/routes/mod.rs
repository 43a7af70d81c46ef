//! HTTP handlers and the state they share.

pub mod cart;
pub mod orders;
pub mod products;
pub mod system;

use std::fmt::Display;
use std::str::FromStr;

use checkout::{CartService, CatalogService, CheckoutConfig, CheckoutWorkflow, OrderService};

use crate::Storefront;
use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Storefront> {
    pub catalog: CatalogService<S>,
    pub cart: CartService<S, S>,
    pub checkout: CheckoutWorkflow<S, S, S>,
    pub orders: OrderService<S>,
}

impl<S: Storefront> AppState<S> {
    /// Wires every service to the same store.
    pub fn new(store: S, config: CheckoutConfig) -> Self {
        Self {
            catalog: CatalogService::new(store.clone(), config),
            cart: CartService::new(store.clone(), store.clone(), config),
            checkout: CheckoutWorkflow::new(store.clone(), store.clone(), store.clone(), config),
            orders: OrderService::new(store, config),
        }
    }
}

fn parse_id<T>(raw: &str, what: &str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid {what}: {e}")))
}
