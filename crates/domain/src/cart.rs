//! Cart lines.

use chrono::{DateTime, Utc};
use common::{CartLineId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// One product reserved in a user's cart prior to checkout.
///
/// Stores keep at most one line per `(user_id, product_id)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
}

impl CartLine {
    /// Creates a new cart line. Quantity must be positive.
    pub fn new(
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity { quantity });
        }
        Ok(Self {
            id: CartLineId::new(),
            user_id,
            product_id,
            quantity,
            created_at: now,
        })
    }
}
