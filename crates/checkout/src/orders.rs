//! Order status transitions and order queries.

use chrono::Utc;
use common::{OrderId, UserId};
use domain::{ADMIN_CANCELABLE, CUSTOMER_CANCELABLE, Order, OrderStatus};
use store::OrderStore;

use crate::config::CheckoutConfig;
use crate::error::CheckoutError;

/// Moves orders along the status table and serves order reads.
///
/// Every write is a conditional update keyed on the current status, so two
/// concurrent changes to the same order cannot both apply.
#[derive(Debug, Clone)]
pub struct OrderService<O> {
    orders: O,
    config: CheckoutConfig,
}

impl<O: OrderStore> OrderService<O> {
    pub fn new(orders: O, config: CheckoutConfig) -> Self {
        Self { orders, config }
    }

    /// Admin status change, validated against the transition table.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: OrderId,
        new_status: OrderStatus,
    ) -> Result<Order, CheckoutError> {
        let current = self.get_order(id).await?;
        if !current.status.can_transition_to(new_status) {
            return Err(CheckoutError::InvalidTransition {
                from: current.status,
                to: new_status,
            });
        }

        let updated = self
            .config
            .bounded(self.orders.update_order_status(
                id,
                new_status,
                &[current.status],
                None,
                Utc::now(),
            ))
            .await?;

        match updated {
            Some(order) => {
                record_transition(current.status, new_status);
                Ok(order)
            }
            None => {
                // Someone else moved the order between the read and the write.
                let fresh = self.get_order(id).await?;
                Err(CheckoutError::InvalidTransition {
                    from: fresh.status,
                    to: new_status,
                })
            }
        }
    }

    /// Customer cancel: only the owner, only while pending.
    #[tracing::instrument(skip(self, user_id), fields(order_id = %id, user_id = %user_id))]
    pub async fn cancel_for_user(
        &self,
        id: OrderId,
        user_id: &UserId,
    ) -> Result<Order, CheckoutError> {
        self.cancel(id, CUSTOMER_CANCELABLE, Some(user_id)).await
    }

    /// Admin cancel: any owner, while pending or paid.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_as_admin(&self, id: OrderId) -> Result<Order, CheckoutError> {
        self.cancel(id, ADMIN_CANCELABLE, None).await
    }

    async fn cancel(
        &self,
        id: OrderId,
        allowed: &[OrderStatus],
        owner: Option<&UserId>,
    ) -> Result<Order, CheckoutError> {
        let canceled = self
            .config
            .bounded(self.orders.update_order_status(
                id,
                OrderStatus::Canceled,
                allowed,
                owner,
                Utc::now(),
            ))
            .await?
            .ok_or(CheckoutError::NotCancelable(id))?;

        metrics::counter!("order_cancellations_total").increment(1);
        tracing::info!(order_id = %id, "order canceled");
        Ok(canceled)
    }

    pub async fn get_order(&self, id: OrderId) -> Result<Order, CheckoutError> {
        self.config
            .bounded(self.orders.find_order(id))
            .await?
            .ok_or(CheckoutError::OrderNotFound(id))
    }

    /// Orders placed by `user_id`, newest first.
    pub async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, CheckoutError> {
        let mut orders = self
            .config
            .bounded(self.orders.list_orders_for_user(user_id))
            .await?;
        newest_first(&mut orders);
        Ok(orders)
    }

    /// Every order, newest first.
    pub async fn list_all(&self) -> Result<Vec<Order>, CheckoutError> {
        let mut orders = self.config.bounded(self.orders.list_orders()).await?;
        newest_first(&mut orders);
        Ok(orders)
    }
}

fn newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

fn record_transition(from: OrderStatus, to: OrderStatus) {
    metrics::counter!(
        "order_status_transitions_total",
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
    tracing::info!(%from, %to, "order status changed");
}
