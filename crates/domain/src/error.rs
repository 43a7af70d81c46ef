//! Domain error types.

use thiserror::Error;

/// Validation errors raised while constructing or changing domain entities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Product name is empty or whitespace.
    #[error("Product name is required")]
    EmptyName,

    /// Price below zero.
    #[error("Invalid price: {cents} (must not be negative)")]
    NegativePrice { cents: i64 },

    /// Price above [`MAX_PRICE_CENTS`](crate::MAX_PRICE_CENTS).
    #[error("Invalid price: {cents} (must not exceed {max})")]
    PriceTooHigh { cents: i64, max: i64 },

    /// A line subtotal or order total does not fit in cents.
    #[error("Order amount overflows")]
    AmountOverflow,

    /// Quantity of zero on a cart or order line.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// An order must contain at least one line.
    #[error("Order has no lines")]
    NoLines,

    /// A patch with no fields set.
    #[error("Patch contains no changes")]
    EmptyPatch,

    /// Unrecognised order status name.
    #[error("Unknown order status: {0}")]
    UnknownStatus(String),
}
