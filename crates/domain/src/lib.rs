//! Domain layer for the storefront checkout service.
//!
//! This crate provides the entities the checkout workflow operates on:
//! - Product catalog entries with their stock counts
//! - Cart lines reserved by a user prior to checkout
//! - Orders with price snapshots and a data-driven status machine

pub mod cart;
pub mod error;
pub mod order;
pub mod product;
pub mod value_objects;

pub use cart::CartLine;
pub use error::DomainError;
pub use order::{ADMIN_CANCELABLE, CUSTOMER_CANCELABLE, Order, OrderLine, OrderStatus};
pub use product::{MAX_PRICE_CENTS, NewProduct, Product, ProductPatch};
pub use value_objects::Money;
