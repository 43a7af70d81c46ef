//! Undo log of stock decrements applied during one checkout.

use common::ProductId;
use store::ProductStore;

use crate::config::CheckoutConfig;

/// A decrement that has been applied to a product's stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockReservation {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Outcome of replaying the ledger.
#[derive(Debug, Default)]
pub struct RollbackReport {
    /// Reservations whose stock was given back.
    pub restored: Vec<StockReservation>,
    /// Reservations that could not be given back, with the reason.
    pub failed: Vec<(StockReservation, String)>,
}

impl RollbackReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Products whose stock is still reduced after the rollback.
    pub fn unrestored(&self) -> Vec<ProductId> {
        self.failed.iter().map(|(r, _)| r.product_id).collect()
    }
}

/// Ordered list of stock decrements applied within a single checkout.
///
/// Rolling back drains the ledger, so a second rollback is a no-op and stock
/// is never given back twice. Each entry is compensated at most once; a
/// failed compensation is reported, not retried.
#[derive(Debug, Default)]
pub struct StockLedger {
    applied: Vec<StockReservation>,
}

impl StockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a decrement that has just been applied.
    pub fn record(&mut self, product_id: ProductId, quantity: u32) {
        self.applied.push(StockReservation {
            product_id,
            quantity,
        });
    }

    pub fn entries(&self) -> &[StockReservation] {
        &self.applied
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }

    /// Gives back every recorded decrement, most recent first.
    #[tracing::instrument(skip(self, products, config), fields(entries = self.applied.len()))]
    pub async fn rollback<P>(&mut self, products: &P, config: &CheckoutConfig) -> RollbackReport
    where
        P: ProductStore + ?Sized,
    {
        let mut report = RollbackReport::default();
        if self.applied.is_empty() {
            return report;
        }

        for reservation in std::mem::take(&mut self.applied).into_iter().rev() {
            let outcome = config
                .bounded(products.increment_stock(reservation.product_id, reservation.quantity))
                .await;

            match outcome {
                Ok(true) => {
                    tracing::debug!(
                        product_id = %reservation.product_id,
                        quantity = reservation.quantity,
                        "stock restored"
                    );
                    report.restored.push(reservation);
                }
                Ok(false) => {
                    tracing::error!(
                        product_id = %reservation.product_id,
                        quantity = reservation.quantity,
                        "stock not restored: product no longer exists"
                    );
                    report
                        .failed
                        .push((reservation, "product no longer exists".to_string()));
                }
                Err(e) => {
                    tracing::error!(
                        product_id = %reservation.product_id,
                        quantity = reservation.quantity,
                        error = %e,
                        "stock not restored"
                    );
                    report.failed.push((reservation, e.to_string()));
                }
            }
        }

        metrics::counter!("checkout_rollbacks_total").increment(1);
        if !report.is_clean() {
            metrics::counter!("checkout_compensation_failures_total")
                .increment(report.failed.len() as u64);
        }
        report
    }
}
