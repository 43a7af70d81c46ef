//! Checkout and storefront error types.

use common::{OrderId, ProductId};
use domain::{DomainError, OrderStatus};
use store::StoreError;
use thiserror::Error;

/// The stage of checkout at which a compensated failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    StockUpdate,
    OrderCreation,
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureStage::StockUpdate => f.write_str("stock update"),
            FailureStage::OrderCreation => f.write_str("order creation"),
        }
    }
}

/// Errors produced by the checkout workflow and order status service.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Empty or malformed product id list.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The cart does not hold every requested product.
    #[error("One or more products are not in your cart ({found} of {requested} found)")]
    ItemNotInCart { requested: usize, found: usize },

    /// The read-only pre-check found a line larger than current stock.
    #[error("Not enough stock for {product_name}, available: {available}")]
    InsufficientStock {
        product_id: ProductId,
        product_name: String,
        available: u32,
    },

    /// A cart line references a product that no longer exists.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// A conditional decrement did not apply; earlier decrements were restored.
    #[error("Failed to update stock for product {product_id}: {reason}")]
    StockUpdateFailed {
        product_id: ProductId,
        reason: String,
    },

    /// The order could not be persisted; decrements were restored.
    #[error("Failed to create order: {0}")]
    OrderCreationFailed(String),

    /// A failure after stock was touched, where restoring stock also failed.
    #[error("Checkout failed during {stage} ({cause}); stock not restored for {unrestored:?}")]
    PartialFailure {
        stage: FailureStage,
        cause: String,
        unrestored: Vec<ProductId>,
    },

    /// Status change not listed in the transition table.
    #[error("Cannot change status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Cancel matched no order in a cancelable status.
    #[error("Order {0} not found or cannot be canceled")]
    NotCancelable(OrderId),

    /// Domain rule violation.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Store error outside the compensated stages.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl CheckoutError {
    /// Stable name of the error kind, used for metrics labels and API bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            CheckoutError::InvalidRequest(_) => "InvalidRequest",
            CheckoutError::ItemNotInCart { .. } => "ItemNotInCart",
            CheckoutError::InsufficientStock { .. } => "InsufficientStock",
            CheckoutError::ProductNotFound(_) => "ProductNotFound",
            CheckoutError::StockUpdateFailed { .. } => "StockUpdateFailed",
            CheckoutError::OrderCreationFailed(_) => "OrderCreationFailed",
            CheckoutError::PartialFailure { .. } => "PartialFailure",
            CheckoutError::InvalidTransition { .. } => "InvalidTransition",
            CheckoutError::OrderNotFound(_) => "OrderNotFound",
            CheckoutError::NotCancelable(_) => "NotCancelable",
            CheckoutError::Domain(_) => "Domain",
            CheckoutError::Store(_) => "Store",
        }
    }
}

/// Errors produced by the cart and catalog services.
#[derive(Debug, Error)]
pub enum StorefrontError {
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("Product {0} not found in cart")]
    NotInCart(ProductId),

    #[error("Quantity exceeds available stock ({requested} requested, {available} available)")]
    QuantityExceedsStock { requested: u32, available: u32 },

    #[error("Invalid input: {0}")]
    Invalid(#[from] DomainError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl StorefrontError {
    pub fn kind(&self) -> &'static str {
        match self {
            StorefrontError::ProductNotFound(_) => "ProductNotFound",
            StorefrontError::NotInCart(_) => "NotInCart",
            StorefrontError::QuantityExceedsStock { .. } => "QuantityExceedsStock",
            StorefrontError::Invalid(_) => "InvalidRequest",
            StorefrontError::Store(_) => "Store",
        }
    }
}
