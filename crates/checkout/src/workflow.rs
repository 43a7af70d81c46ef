//! Checkout workflow: cart lines in, one committed order out.

use std::collections::HashSet;
use std::time::Instant;

use chrono::Utc;
use common::{ProductId, UserId};
use domain::{CartLine, Order, OrderLine};
use store::{CartStore, OrderStore, ProductStore};

use crate::config::CheckoutConfig;
use crate::error::{CheckoutError, FailureStage};
use crate::ledger::StockLedger;

/// Drives a checkout against the product, cart and order stores.
///
/// Stock is reserved with conditional decrements, one product at a time.
/// Every applied decrement is written to a [`StockLedger`]; if a later
/// decrement or the order insert fails, the ledger is replayed in reverse
/// so no stock leaks. The cart is only cleared once the order exists.
#[derive(Debug, Clone)]
pub struct CheckoutWorkflow<P, C, O> {
    products: P,
    carts: C,
    orders: O,
    config: CheckoutConfig,
}

impl<P, C, O> CheckoutWorkflow<P, C, O>
where
    P: ProductStore,
    C: CartStore,
    O: OrderStore,
{
    pub fn new(products: P, carts: C, orders: O, config: CheckoutConfig) -> Self {
        Self {
            products,
            carts,
            orders,
            config,
        }
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    /// Checks out the given products from the user's cart.
    ///
    /// Returns the persisted order on success. On any error after stock was
    /// touched, stock has been restored unless the error is
    /// [`CheckoutError::PartialFailure`].
    #[tracing::instrument(skip(self, user_id, product_ids), fields(user_id = %user_id, requested = product_ids.len()))]
    pub async fn checkout(
        &self,
        user_id: &UserId,
        product_ids: &[String],
    ) -> Result<Order, CheckoutError> {
        metrics::counter!("checkout_attempts_total").increment(1);
        let started = Instant::now();

        let result = self.run(user_id, product_ids).await;

        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        match &result {
            Ok(order) => {
                metrics::counter!("checkout_completed_total").increment(1);
                tracing::info!(
                    order_id = %order.id,
                    total_cents = order.total.cents(),
                    lines = order.lines.len(),
                    "checkout completed"
                );
            }
            Err(e) => {
                metrics::counter!("checkout_failed_total", "reason" => e.kind()).increment(1);
                tracing::warn!(reason = e.kind(), error = %e, "checkout failed");
            }
        }
        result
    }

    async fn run(&self, user_id: &UserId, raw_ids: &[String]) -> Result<Order, CheckoutError> {
        let product_ids = parse_product_ids(raw_ids)?;

        let lines = self.load_cart_lines(user_id, &product_ids).await?;
        self.precheck(&lines).await?;

        let mut ledger = StockLedger::new();
        let order_lines = match self.reserve(&lines, &mut ledger).await {
            Ok(order_lines) => order_lines,
            Err(failure) => {
                let (product_id, reason) = failure;
                return Err(self
                    .compensate(
                        &mut ledger,
                        FailureStage::StockUpdate,
                        CheckoutError::StockUpdateFailed { product_id, reason },
                    )
                    .await);
            }
        };

        let order = match Order::place(user_id.clone(), order_lines, Utc::now()) {
            Ok(order) => order,
            Err(e) => {
                return Err(self
                    .compensate(
                        &mut ledger,
                        FailureStage::OrderCreation,
                        CheckoutError::OrderCreationFailed(e.to_string()),
                    )
                    .await);
            }
        };

        if let Err(e) = self.config.bounded(self.orders.insert_order(&order)).await {
            return Err(self
                .compensate(
                    &mut ledger,
                    FailureStage::OrderCreation,
                    CheckoutError::OrderCreationFailed(e.to_string()),
                )
                .await);
        }

        // Order is committed from here on; cleanup failures are only logged.
        match self
            .config
            .bounded(self.carts.delete_cart_lines(user_id, &product_ids))
            .await
        {
            Ok(removed) => tracing::debug!(removed, "cart lines cleared"),
            Err(e) => tracing::warn!(
                order_id = %order.id,
                error = %e,
                "order created but cart lines were not cleared"
            ),
        }

        Ok(order)
    }

    /// Loads the user's lines for the requested products, in request order.
    async fn load_cart_lines(
        &self,
        user_id: &UserId,
        product_ids: &[ProductId],
    ) -> Result<Vec<CartLine>, CheckoutError> {
        let mut lines = self
            .config
            .bounded(self.carts.find_cart_lines(user_id, product_ids))
            .await?;

        if lines.len() != product_ids.len() {
            return Err(CheckoutError::ItemNotInCart {
                requested: product_ids.len(),
                found: lines.len(),
            });
        }

        lines.sort_by_key(|line| {
            product_ids
                .iter()
                .position(|id| *id == line.product_id)
                .unwrap_or(usize::MAX)
        });
        Ok(lines)
    }

    /// Read-only check of every line against current stock.
    ///
    /// Rejects early without touching stock. Passing it does not guarantee
    /// the decrements succeed; concurrent checkouts are caught by the
    /// conditional write.
    async fn precheck(&self, lines: &[CartLine]) -> Result<(), CheckoutError> {
        for line in lines {
            let product = self
                .config
                .bounded(self.products.find_product(line.product_id))
                .await?
                .ok_or(CheckoutError::ProductNotFound(line.product_id))?;

            if !product.has_stock_for(line.quantity) {
                return Err(CheckoutError::InsufficientStock {
                    product_id: product.id,
                    product_name: product.name,
                    available: product.stock,
                });
            }
        }
        Ok(())
    }

    /// Applies one conditional decrement per line.
    ///
    /// Stops at the first decrement that does not apply and returns the
    /// product id with the reason. Every applied decrement is in `ledger`.
    async fn reserve(
        &self,
        lines: &[CartLine],
        ledger: &mut StockLedger,
    ) -> Result<Vec<OrderLine>, (ProductId, String)> {
        let mut order_lines = Vec::with_capacity(lines.len());

        for line in lines {
            let outcome = self
                .config
                .bounded(
                    self.products
                        .conditional_decrement_stock(line.product_id, line.quantity),
                )
                .await;

            match outcome {
                Ok(Some(product)) => {
                    ledger.record(product.id, line.quantity);
                    order_lines.push(OrderLine::new(
                        product.id,
                        product.name,
                        product.price,
                        line.quantity,
                    ));
                }
                Ok(None) => {
                    return Err((
                        line.product_id,
                        "stock changed during checkout".to_string(),
                    ));
                }
                Err(e) => return Err((line.product_id, e.to_string())),
            }
        }

        Ok(order_lines)
    }

    /// Restores every recorded decrement and picks the error to surface.
    async fn compensate(
        &self,
        ledger: &mut StockLedger,
        stage: FailureStage,
        cause: CheckoutError,
    ) -> CheckoutError {
        tracing::warn!(%stage, error = %cause, entries = ledger.entries().len(), "rolling back stock");

        let report = ledger.rollback(&self.products, &self.config).await;
        if report.is_clean() {
            return cause;
        }

        tracing::error!(
            %stage,
            unrestored = report.failed.len(),
            "stock rollback incomplete"
        );
        CheckoutError::PartialFailure {
            stage,
            cause: cause.to_string(),
            unrestored: report.unrestored(),
        }
    }
}

/// Parses and de-duplicates the requested product ids, keeping first-seen order.
fn parse_product_ids(raw: &[String]) -> Result<Vec<ProductId>, CheckoutError> {
    if raw.is_empty() {
        return Err(CheckoutError::InvalidRequest(
            "product_ids must not be empty".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(raw.len());
    let mut ids = Vec::with_capacity(raw.len());
    for value in raw {
        let id = ProductId::parse_hex(value.trim())
            .map_err(|e| CheckoutError::InvalidRequest(e.to_string()))?;
        if seen.insert(id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use domain::{Money, NewProduct, OrderStatus, Product};
    use store::InMemoryStore;

    type Workflow = CheckoutWorkflow<InMemoryStore, InMemoryStore, InMemoryStore>;

    fn workflow(store: &InMemoryStore) -> Workflow {
        CheckoutWorkflow::new(
            store.clone(),
            store.clone(),
            store.clone(),
            CheckoutConfig::default(),
        )
    }

    async fn product(store: &InMemoryStore, name: &str, cents: i64, stock: u32) -> Product {
        let product = NewProduct::new(name, "", Money::from_cents(cents), stock)
            .into_product(Utc::now())
            .unwrap();
        store.insert_product(&product).await.unwrap();
        product
    }

    async fn add_to_cart(store: &InMemoryStore, user: &UserId, product: &Product, quantity: u32) {
        let line = CartLine::new(user.clone(), product.id, quantity, Utc::now()).unwrap();
        store.upsert_cart_line(&line).await.unwrap();
    }

    fn ids(products: &[&Product]) -> Vec<String> {
        products.iter().map(|p| p.id.to_string()).collect()
    }

    #[tokio::test]
    async fn test_checkout_creates_order_and_clears_cart() {
        let store = InMemoryStore::new();
        let user = UserId::new("u1");
        let a = product(&store, "Widget", 1000, 5).await;
        let b = product(&store, "Gadget", 2500, 3).await;
        add_to_cart(&store, &user, &a, 2).await;
        add_to_cart(&store, &user, &b, 1).await;

        let order = workflow(&store).checkout(&user, &ids(&[&a, &b])).await.unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total.cents(), 4500);
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.lines[0].product_id, a.id);
        assert_eq!(order.lines[0].product_name, "Widget");
        assert_eq!(store.stock_of(a.id).await, Some(3));
        assert_eq!(store.stock_of(b.id).await, Some(2));
        assert!(store.list_cart(&user).await.unwrap().is_empty());
        assert_eq!(store.find_order(order.id).await.unwrap(), Some(order));
    }

    #[tokio::test]
    async fn test_checkout_leaves_other_cart_lines() {
        let store = InMemoryStore::new();
        let user = UserId::new("u1");
        let a = product(&store, "Widget", 1000, 5).await;
        let b = product(&store, "Gadget", 2500, 3).await;
        add_to_cart(&store, &user, &a, 1).await;
        add_to_cart(&store, &user, &b, 1).await;

        workflow(&store).checkout(&user, &ids(&[&a])).await.unwrap();

        let remaining = store.list_cart(&user).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].product_id, b.id);
    }

    #[tokio::test]
    async fn test_exact_stock_reaches_zero() {
        let store = InMemoryStore::new();
        let user = UserId::new("u1");
        let a = product(&store, "Widget", 100, 4).await;
        add_to_cart(&store, &user, &a, 4).await;

        workflow(&store).checkout(&user, &ids(&[&a])).await.unwrap();

        assert_eq!(store.stock_of(a.id).await, Some(0));
    }

    #[tokio::test]
    async fn test_empty_request_is_invalid() {
        let store = InMemoryStore::new();
        let result = workflow(&store).checkout(&UserId::new("u1"), &[]).await;
        assert!(matches!(result, Err(CheckoutError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_malformed_id_is_invalid() {
        let store = InMemoryStore::new();
        let result = workflow(&store)
            .checkout(&UserId::new("u1"), &["not-an-id".to_string()])
            .await;
        assert!(matches!(result, Err(CheckoutError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_missing_cart_line_is_rejected_without_writes() {
        let store = InMemoryStore::new();
        let user = UserId::new("u1");
        let a = product(&store, "Widget", 1000, 5).await;
        let b = product(&store, "Gadget", 2500, 3).await;
        add_to_cart(&store, &user, &a, 1).await;

        let result = workflow(&store).checkout(&user, &ids(&[&a, &b])).await;

        assert!(matches!(
            result,
            Err(CheckoutError::ItemNotInCart {
                requested: 2,
                found: 1
            })
        ));
        assert_eq!(store.stock_of(a.id).await, Some(5));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_other_users_cart_is_not_visible() {
        let store = InMemoryStore::new();
        let a = product(&store, "Widget", 1000, 5).await;
        add_to_cart(&store, &UserId::new("alice"), &a, 1).await;

        let result = workflow(&store).checkout(&UserId::new("bob"), &ids(&[&a])).await;

        assert!(matches!(result, Err(CheckoutError::ItemNotInCart { .. })));
    }

    #[tokio::test]
    async fn test_duplicate_ids_count_once() {
        let store = InMemoryStore::new();
        let user = UserId::new("u1");
        let a = product(&store, "Widget", 1000, 5).await;
        add_to_cart(&store, &user, &a, 2).await;

        let order = workflow(&store)
            .checkout(&user, &ids(&[&a, &a]))
            .await
            .unwrap();

        assert_eq!(order.lines.len(), 1);
        assert_eq!(store.stock_of(a.id).await, Some(3));
    }

    #[tokio::test]
    async fn test_insufficient_stock_rejected_by_precheck() {
        let store = InMemoryStore::new();
        let user = UserId::new("u1");
        let a = product(&store, "Widget", 1000, 5).await;
        let b = product(&store, "Gadget", 2500, 1).await;
        add_to_cart(&store, &user, &a, 1).await;
        add_to_cart(&store, &user, &b, 2).await;

        let err = workflow(&store)
            .checkout(&user, &ids(&[&a, &b]))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Not enough stock for Gadget, available: 1");
        assert_eq!(store.stock_of(a.id).await, Some(5));
        assert_eq!(store.stock_of(b.id).await, Some(1));
        assert_eq!(store.list_cart(&user).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_deleted_product_is_reported() {
        let store = InMemoryStore::new();
        let user = UserId::new("u1");
        let a = product(&store, "Widget", 1000, 5).await;
        add_to_cart(&store, &user, &a, 1).await;
        store.delete_product(a.id).await.unwrap();

        let result = workflow(&store).checkout(&user, &ids(&[&a])).await;

        assert!(matches!(result, Err(CheckoutError::ProductNotFound(id)) if id == a.id));
    }

    #[tokio::test]
    async fn test_lost_race_rolls_back_earlier_decrements() {
        let store = InMemoryStore::new();
        let user = UserId::new("u1");
        let a = product(&store, "Widget", 1000, 5).await;
        let b = product(&store, "Gadget", 2500, 3).await;
        add_to_cart(&store, &user, &a, 2).await;
        add_to_cart(&store, &user, &b, 1).await;
        store.lose_race_on(b.id).await;

        let result = workflow(&store).checkout(&user, &ids(&[&a, &b])).await;

        assert!(matches!(
            result,
            Err(CheckoutError::StockUpdateFailed { product_id, .. }) if product_id == b.id
        ));
        assert_eq!(store.stock_of(a.id).await, Some(5));
        assert_eq!(store.stock_of(b.id).await, Some(3));
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.list_cart(&user).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_decrement_error_rolls_back() {
        let store = InMemoryStore::new();
        let user = UserId::new("u1");
        let a = product(&store, "Widget", 1000, 5).await;
        add_to_cart(&store, &user, &a, 2).await;
        store.set_fail_on_stock_decrement(true).await;

        let result = workflow(&store).checkout(&user, &ids(&[&a])).await;

        assert!(matches!(result, Err(CheckoutError::StockUpdateFailed { .. })));
        assert_eq!(store.stock_of(a.id).await, Some(5));
    }

    #[tokio::test]
    async fn test_order_insert_failure_restores_stock() {
        let store = InMemoryStore::new();
        let user = UserId::new("u1");
        let a = product(&store, "Widget", 1000, 5).await;
        let b = product(&store, "Gadget", 2500, 3).await;
        add_to_cart(&store, &user, &a, 2).await;
        add_to_cart(&store, &user, &b, 3).await;
        store.set_fail_on_order_insert(true).await;

        let result = workflow(&store).checkout(&user, &ids(&[&a, &b])).await;

        assert!(matches!(result, Err(CheckoutError::OrderCreationFailed(_))));
        assert_eq!(store.stock_of(a.id).await, Some(5));
        assert_eq!(store.stock_of(b.id).await, Some(3));
        assert_eq!(store.list_cart(&user).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_overflowing_line_total_restores_stock() {
        let store = InMemoryStore::new();
        let user = UserId::new("u1");
        let a = product(&store, "Widget", 1000, 5).await;
        let mut pricey = NewProduct::new("Yacht", "", Money::from_cents(1), 5)
            .into_product(Utc::now())
            .unwrap();
        // Written straight to the store, past catalog validation.
        pricey.price = Money::from_cents(i64::MAX / 2 + 1);
        store.insert_product(&pricey).await.unwrap();
        add_to_cart(&store, &user, &a, 2).await;
        add_to_cart(&store, &user, &pricey, 2).await;

        let result = workflow(&store).checkout(&user, &ids(&[&a, &pricey])).await;

        assert!(matches!(result, Err(CheckoutError::OrderCreationFailed(_))));
        assert_eq!(store.stock_of(a.id).await, Some(5));
        assert_eq!(store.stock_of(pricey.id).await, Some(5));
        assert!(store.list_orders_for_user(&user).await.unwrap().is_empty());
        assert_eq!(store.list_cart(&user).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_overflowing_order_total_at_price_cap_restores_stock() {
        let store = InMemoryStore::new();
        let user = UserId::new("u1");
        let units = 50_000_000;
        let a = product(&store, "Widget", domain::MAX_PRICE_CENTS, units).await;
        let b = product(&store, "Gadget", domain::MAX_PRICE_CENTS, units).await;
        add_to_cart(&store, &user, &a, units).await;
        add_to_cart(&store, &user, &b, units).await;

        let result = workflow(&store).checkout(&user, &ids(&[&a, &b])).await;

        assert!(matches!(result, Err(CheckoutError::OrderCreationFailed(_))));
        assert_eq!(store.stock_of(a.id).await, Some(units));
        assert_eq!(store.stock_of(b.id).await, Some(units));
        assert!(store.list_orders_for_user(&user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_order_insert_timeout_restores_stock() {
        let store = InMemoryStore::new();
        let user = UserId::new("u1");
        let a = product(&store, "Widget", 1000, 5).await;
        add_to_cart(&store, &user, &a, 1).await;
        store
            .set_order_insert_delay(Some(Duration::from_millis(500)))
            .await;

        let workflow = CheckoutWorkflow::new(
            store.clone(),
            store.clone(),
            store.clone(),
            CheckoutConfig::with_store_timeout(Duration::from_millis(20)),
        );
        let result = workflow.checkout(&user, &ids(&[&a])).await;

        assert!(matches!(result, Err(CheckoutError::OrderCreationFailed(_))));
        assert_eq!(store.stock_of(a.id).await, Some(5));
    }

    #[tokio::test]
    async fn test_failed_rollback_is_partial_failure() {
        let store = InMemoryStore::new();
        let user = UserId::new("u1");
        let a = product(&store, "Widget", 1000, 5).await;
        add_to_cart(&store, &user, &a, 2).await;
        store.set_fail_on_order_insert(true).await;
        store.set_fail_on_stock_increment(true).await;

        let err = workflow(&store)
            .checkout(&user, &ids(&[&a]))
            .await
            .unwrap_err();

        match err {
            CheckoutError::PartialFailure {
                stage, unrestored, ..
            } => {
                assert_eq!(stage, FailureStage::OrderCreation);
                assert_eq!(unrestored, vec![a.id]);
            }
            other => panic!("expected PartialFailure, got {other:?}"),
        }
        assert_eq!(store.stock_of(a.id).await, Some(3));
    }

    #[tokio::test]
    async fn test_cart_cleanup_failure_keeps_order() {
        let store = InMemoryStore::new();
        let user = UserId::new("u1");
        let a = product(&store, "Widget", 1000, 5).await;
        add_to_cart(&store, &user, &a, 1).await;
        store.set_fail_on_cart_delete(true).await;

        let order = workflow(&store).checkout(&user, &ids(&[&a])).await.unwrap();

        assert_eq!(store.find_order(order.id).await.unwrap(), Some(order));
        assert_eq!(store.stock_of(a.id).await, Some(4));
        assert_eq!(store.list_cart(&user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_price_is_captured_at_checkout() {
        let store = InMemoryStore::new();
        let user = UserId::new("u1");
        let a = product(&store, "Widget", 1000, 5).await;
        add_to_cart(&store, &user, &a, 1).await;

        let order = workflow(&store).checkout(&user, &ids(&[&a])).await.unwrap();
        let patch = domain::ProductPatch {
            price: Some(Money::from_cents(9999)),
            ..Default::default()
        };
        store.update_product(a.id, &patch, Utc::now()).await.unwrap();

        let stored = store.find_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.lines[0].unit_price.cents(), 1000);
        assert_eq!(stored.total.cents(), 1000);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_checkouts_never_oversell() {
        let store = InMemoryStore::new();
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");
        let a = product(&store, "Widget", 1000, 1).await;
        add_to_cart(&store, &alice, &a, 1).await;
        add_to_cart(&store, &bob, &a, 1).await;
        store
            .set_decrement_barrier(Some(Arc::new(tokio::sync::Barrier::new(2))))
            .await;

        let workflow = workflow(&store);
        let requested = ids(&[&a]);
        let (first, second) = tokio::join!(
            workflow.checkout(&alice, &requested),
            workflow.checkout(&bob, &requested)
        );

        let results = [first, second];
        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(succeeded, 1);
        assert!(
            results
                .iter()
                .any(|r| matches!(r, Err(CheckoutError::StockUpdateFailed { .. })))
        );
        assert_eq!(store.stock_of(a.id).await, Some(0));
        assert_eq!(store.order_count().await, 1);
    }

    #[test]
    fn test_parse_product_ids_dedupes_in_order() {
        let a = ProductId::new();
        let b = ProductId::new();
        let raw = vec![b.to_string(), a.to_string(), b.to_string()];
        assert_eq!(parse_product_ids(&raw).unwrap(), vec![b, a]);
    }
}
