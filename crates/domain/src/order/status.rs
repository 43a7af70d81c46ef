//! Order status machine.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The status of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──┬──► Paid ──┬──► Delivered ──► Completed
///           │           └──► Refunded
///           └──► Canceled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Stock reserved, awaiting payment.
    #[default]
    Pending,

    /// Payment confirmed.
    Paid,

    /// Handed over to the customer.
    Delivered,

    /// Canceled before fulfillment (terminal).
    Canceled,

    /// Payment returned (terminal).
    Refunded,

    /// Fulfillment closed (terminal).
    Completed,
}

/// Allowed next statuses, keyed by current status.
const TRANSITIONS: &[(OrderStatus, &[OrderStatus])] = &[
    (
        OrderStatus::Pending,
        &[OrderStatus::Paid, OrderStatus::Canceled],
    ),
    (
        OrderStatus::Paid,
        &[OrderStatus::Delivered, OrderStatus::Refunded],
    ),
    (OrderStatus::Delivered, &[OrderStatus::Completed]),
    (OrderStatus::Canceled, &[]),
    (OrderStatus::Refunded, &[]),
    (OrderStatus::Completed, &[]),
];

/// Statuses a customer may cancel from.
pub const CUSTOMER_CANCELABLE: &[OrderStatus] = &[OrderStatus::Pending];

/// Statuses an administrator may cancel from.
pub const ADMIN_CANCELABLE: &[OrderStatus] = &[OrderStatus::Pending, OrderStatus::Paid];

impl OrderStatus {
    /// Every status, in table order.
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Paid,
        OrderStatus::Delivered,
        OrderStatus::Canceled,
        OrderStatus::Refunded,
        OrderStatus::Completed,
    ];

    /// Returns the statuses reachable from this one in a single step.
    pub fn allowed_next(&self) -> &'static [OrderStatus] {
        TRANSITIONS
            .iter()
            .find(|(from, _)| from == self)
            .map(|(_, next)| *next)
            .unwrap_or(&[])
    }

    /// Returns true if moving to `next` is listed in the transition table.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.allowed_next().contains(&next)
    }

    /// Returns true if this is a terminal status (no further transitions).
    pub fn is_terminal(&self) -> bool {
        self.allowed_next().is_empty()
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Canceled => "canceled",
            OrderStatus::Refunded => "refunded",
            OrderStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::UnknownStatus(s.to_string()))
    }
}
