//! Orders and order lines.

mod status;

pub use status::{ADMIN_CANCELABLE, CUSTOMER_CANCELABLE, OrderStatus};

use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::Money;

/// A purchased product with its price captured at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl OrderLine {
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        unit_price: Money,
        quantity: u32,
    ) -> Self {
        Self {
            product_id,
            product_name: product_name.into(),
            unit_price,
            quantity,
        }
    }

    /// Returns `unit_price * quantity`.
    pub fn subtotal(&self) -> Result<Money, DomainError> {
        self.unit_price
            .checked_multiply(self.quantity)
            .ok_or(DomainError::AmountOverflow)
    }
}

/// A committed order.
///
/// Lines and total never change after creation; only `status` and
/// `updated_at` move, and only along [`OrderStatus`] transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub lines: Vec<OrderLine>,
    pub total: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Builds a new pending order, computing the total from its lines.
    pub fn place(
        user_id: UserId,
        lines: Vec<OrderLine>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if lines.is_empty() {
            return Err(DomainError::NoLines);
        }
        if let Some(line) = lines.iter().find(|l| l.quantity == 0) {
            return Err(DomainError::InvalidQuantity {
                quantity: line.quantity,
            });
        }

        let total = lines.iter().try_fold(Money::zero(), |total, line| {
            total
                .checked_add(line.subtotal()?)
                .ok_or(DomainError::AmountOverflow)
        })?;
        Ok(Self {
            id: OrderId::new(),
            user_id,
            lines,
            total,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: None,
        })
    }

    /// Total number of units across all lines.
    pub fn unit_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_computes_total() {
        let lines = vec![
            OrderLine::new(ProductId::new(), "Widget", Money::from_cents(1000), 2),
            OrderLine::new(ProductId::new(), "Gadget", Money::from_cents(2500), 1),
        ];
        let order = Order::place(UserId::new("u1"), lines, Utc::now()).unwrap();

        assert_eq!(order.total.cents(), 4500);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.unit_count(), 3);
        assert!(order.updated_at.is_none());
    }

    #[test]
    fn test_place_rejects_empty_order() {
        let result = Order::place(UserId::new("u1"), vec![], Utc::now());
        assert_eq!(result.unwrap_err(), DomainError::NoLines);
    }

    #[test]
    fn test_place_rejects_zero_quantity_line() {
        let lines = vec![OrderLine::new(
            ProductId::new(),
            "Widget",
            Money::from_cents(1000),
            0,
        )];
        let result = Order::place(UserId::new("u1"), lines, Utc::now());
        assert_eq!(
            result.unwrap_err(),
            DomainError::InvalidQuantity { quantity: 0 }
        );
    }

    #[test]
    fn test_line_subtotal() {
        let line = OrderLine::new(ProductId::new(), "Widget", Money::from_cents(333), 3);
        assert_eq!(line.subtotal().unwrap().cents(), 999);
    }

    #[test]
    fn test_place_rejects_overflowing_line() {
        let lines = vec![OrderLine::new(
            ProductId::new(),
            "Widget",
            Money::from_cents(i64::MAX / 2 + 1),
            2,
        )];
        let result = Order::place(UserId::new("u1"), lines, Utc::now());
        assert_eq!(result.unwrap_err(), DomainError::AmountOverflow);
    }

    #[test]
    fn test_place_rejects_overflowing_total() {
        let price = Money::from_cents(i64::MAX / 2 + 1);
        let lines = vec![
            OrderLine::new(ProductId::new(), "Widget", price, 1),
            OrderLine::new(ProductId::new(), "Gadget", price, 1),
        ];
        let result = Order::place(UserId::new("u1"), lines, Utc::now());
        assert_eq!(result.unwrap_err(), DomainError::AmountOverflow);
    }
}
