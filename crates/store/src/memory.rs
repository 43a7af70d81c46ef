use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, UserId};
use domain::{CartLine, Order, OrderStatus, Product, ProductPatch};
use tokio::sync::{Barrier, RwLock};

use crate::{
    Result, StoreError,
    store::{CartStore, OrderStore, ProductStore},
};

/// Failure switches used by tests to drive the checkout's error paths.
#[derive(Debug, Default)]
struct Faults {
    fail_order_insert: bool,
    fail_stock_increment: bool,
    fail_cart_delete: bool,
    fail_stock_decrement: bool,
    lost_races: HashSet<ProductId>,
    order_insert_delay: Option<Duration>,
    decrement_barrier: Option<Arc<Barrier>>,
}

#[derive(Debug, Default)]
struct InMemoryState {
    products: Vec<Product>,
    cart: Vec<CartLine>,
    orders: Vec<Order>,
    faults: Faults,
}

/// In-memory store implementation.
///
/// Implements every store trait over a single lock, giving the same
/// conditional-write semantics as the PostgreSQL implementation. Clones
/// share state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current stock of a product.
    pub async fn stock_of(&self, id: ProductId) -> Option<u32> {
        self.state
            .read()
            .await
            .products
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.stock)
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Makes `insert_order` fail.
    pub async fn set_fail_on_order_insert(&self, fail: bool) {
        self.state.write().await.faults.fail_order_insert = fail;
    }

    /// Makes `increment_stock` fail.
    pub async fn set_fail_on_stock_increment(&self, fail: bool) {
        self.state.write().await.faults.fail_stock_increment = fail;
    }

    /// Makes `delete_cart_lines` fail.
    pub async fn set_fail_on_cart_delete(&self, fail: bool) {
        self.state.write().await.faults.fail_cart_delete = fail;
    }

    /// Makes `conditional_decrement_stock` return an error.
    pub async fn set_fail_on_stock_decrement(&self, fail: bool) {
        self.state.write().await.faults.fail_stock_decrement = fail;
    }

    /// Makes the conditional decrement of `id` miss its guard, as if a
    /// concurrent checkout had consumed the stock first.
    pub async fn lose_race_on(&self, id: ProductId) {
        self.state.write().await.faults.lost_races.insert(id);
    }

    /// Delays every `insert_order` call.
    pub async fn set_order_insert_delay(&self, delay: Option<Duration>) {
        self.state.write().await.faults.order_insert_delay = delay;
    }

    /// Makes every conditional decrement wait on `barrier` before writing.
    pub async fn set_decrement_barrier(&self, barrier: Option<Arc<Barrier>>) {
        self.state.write().await.faults.decrement_barrier = barrier;
    }
}

#[async_trait]
impl ProductStore for InMemoryStore {
    async fn insert_product(&self, product: &Product) -> Result<()> {
        self.state.write().await.products.push(product.clone());
        Ok(())
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>> {
        let state = self.state.read().await;
        Ok(state.products.iter().find(|p| p.id == id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.state.read().await.products.clone())
    }

    async fn update_product(
        &self,
        id: ProductId,
        patch: &ProductPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Product>> {
        let mut state = self.state.write().await;
        let Some(product) = state.products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };

        let mut updated = product.clone();
        patch.apply_to(&mut updated, now)?;
        *product = updated.clone();
        Ok(Some(updated))
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.products.len();
        state.products.retain(|p| p.id != id);
        Ok(state.products.len() != before)
    }

    async fn conditional_decrement_stock(
        &self,
        id: ProductId,
        amount: u32,
    ) -> Result<Option<Product>> {
        let barrier = self.state.read().await.faults.decrement_barrier.clone();
        if let Some(barrier) = barrier {
            barrier.wait().await;
        }

        let mut state = self.state.write().await;
        if state.faults.fail_stock_decrement {
            return Err(StoreError::Unavailable("stock decrement refused".to_string()));
        }
        if state.faults.lost_races.contains(&id) {
            return Ok(None);
        }

        let Some(product) = state.products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if product.stock < amount {
            return Ok(None);
        }

        product.stock -= amount;
        product.updated_at = Utc::now();
        Ok(Some(product.clone()))
    }

    async fn increment_stock(&self, id: ProductId, amount: u32) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.faults.fail_stock_increment {
            return Err(StoreError::Unavailable("stock increment refused".to_string()));
        }

        let Some(product) = state.products.iter_mut().find(|p| p.id == id) else {
            return Ok(false);
        };
        product.stock = product
            .stock
            .checked_add(amount)
            .ok_or_else(|| StoreError::OutOfRange(format!("stock of {id} overflows")))?;
        product.updated_at = Utc::now();
        Ok(true)
    }
}

#[async_trait]
impl CartStore for InMemoryStore {
    async fn find_cart_lines(
        &self,
        user_id: &UserId,
        product_ids: &[ProductId],
    ) -> Result<Vec<CartLine>> {
        let state = self.state.read().await;
        Ok(state
            .cart
            .iter()
            .filter(|l| &l.user_id == user_id && product_ids.contains(&l.product_id))
            .cloned()
            .collect())
    }

    async fn delete_cart_lines(
        &self,
        user_id: &UserId,
        product_ids: &[ProductId],
    ) -> Result<u64> {
        let mut state = self.state.write().await;
        if state.faults.fail_cart_delete {
            return Err(StoreError::Unavailable("cart delete refused".to_string()));
        }

        let before = state.cart.len();
        state
            .cart
            .retain(|l| !(&l.user_id == user_id && product_ids.contains(&l.product_id)));
        Ok((before - state.cart.len()) as u64)
    }

    async fn list_cart(&self, user_id: &UserId) -> Result<Vec<CartLine>> {
        let state = self.state.read().await;
        Ok(state
            .cart
            .iter()
            .filter(|l| &l.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn upsert_cart_line(&self, line: &CartLine) -> Result<CartLine> {
        let mut state = self.state.write().await;
        if let Some(existing) = state
            .cart
            .iter_mut()
            .find(|l| l.user_id == line.user_id && l.product_id == line.product_id)
        {
            existing.quantity = line.quantity;
            return Ok(existing.clone());
        }

        state.cart.push(line.clone());
        Ok(line.clone())
    }

    async fn set_cart_quantity(
        &self,
        user_id: &UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Option<CartLine>> {
        let mut state = self.state.write().await;
        Ok(state
            .cart
            .iter_mut()
            .find(|l| &l.user_id == user_id && l.product_id == product_id)
            .map(|line| {
                line.quantity = quantity;
                line.clone()
            }))
    }

    async fn remove_cart_line(&self, user_id: &UserId, product_id: ProductId) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.cart.len();
        state
            .cart
            .retain(|l| !(&l.user_id == user_id && l.product_id == product_id));
        Ok(state.cart.len() != before)
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        let delay = self.state.read().await.faults.order_insert_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.write().await;
        if state.faults.fail_order_insert {
            return Err(StoreError::Unavailable("order insert refused".to_string()));
        }
        state.orders.push(order.clone());
        Ok(())
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn list_orders_for_user(&self, user_id: &UserId) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .iter()
            .filter(|o| &o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        Ok(self.state.read().await.orders.clone())
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        allowed_current: &[OrderStatus],
        owner: Option<&UserId>,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>> {
        let mut state = self.state.write().await;
        Ok(state
            .orders
            .iter_mut()
            .find(|o| {
                o.id == id
                    && allowed_current.contains(&o.status)
                    && owner.is_none_or(|user| &o.user_id == user)
            })
            .map(|order| {
                order.status = status;
                order.updated_at = Some(now);
                order.clone()
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Money, NewProduct, OrderLine};

    async fn seed(store: &InMemoryStore, stock: u32) -> Product {
        let product = NewProduct::new("Widget", "", Money::from_cents(1000), stock)
            .into_product(Utc::now())
            .unwrap();
        store.insert_product(&product).await.unwrap();
        product
    }

    #[tokio::test]
    async fn test_conditional_decrement_respects_guard() {
        let store = InMemoryStore::new();
        let product = seed(&store, 3).await;

        let after = store
            .conditional_decrement_stock(product.id, 2)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.stock, 1);

        let missed = store
            .conditional_decrement_stock(product.id, 2)
            .await
            .unwrap();
        assert!(missed.is_none());
        assert_eq!(store.stock_of(product.id).await, Some(1));
    }

    #[tokio::test]
    async fn test_decrement_of_missing_product_misses() {
        let store = InMemoryStore::new();
        let result = store
            .conditional_decrement_stock(ProductId::new(), 1)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_increment_stock() {
        let store = InMemoryStore::new();
        let product = seed(&store, 0).await;

        assert!(store.increment_stock(product.id, 4).await.unwrap());
        assert_eq!(store.stock_of(product.id).await, Some(4));
        assert!(!store.increment_stock(ProductId::new(), 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_lost_race_leaves_stock_untouched() {
        let store = InMemoryStore::new();
        let product = seed(&store, 5).await;
        store.lose_race_on(product.id).await;

        let result = store
            .conditional_decrement_stock(product.id, 1)
            .await
            .unwrap();
        assert!(result.is_none());
        assert_eq!(store.stock_of(product.id).await, Some(5));
    }

    #[tokio::test]
    async fn test_upsert_keeps_one_line_per_pair() {
        let store = InMemoryStore::new();
        let user = UserId::new("u1");
        let product_id = ProductId::new();

        let first = CartLine::new(user.clone(), product_id, 1, Utc::now()).unwrap();
        store.upsert_cart_line(&first).await.unwrap();
        let second = CartLine::new(user.clone(), product_id, 4, Utc::now()).unwrap();
        let stored = store.upsert_cart_line(&second).await.unwrap();

        assert_eq!(stored.id, first.id);
        assert_eq!(stored.quantity, 4);
        assert_eq!(store.list_cart(&user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cart_lines_are_scoped_to_user() {
        let store = InMemoryStore::new();
        let product_id = ProductId::new();
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        store
            .upsert_cart_line(&CartLine::new(alice.clone(), product_id, 1, Utc::now()).unwrap())
            .await
            .unwrap();
        store
            .upsert_cart_line(&CartLine::new(bob.clone(), product_id, 2, Utc::now()).unwrap())
            .await
            .unwrap();

        let lines = store.find_cart_lines(&alice, &[product_id]).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 1);

        let deleted = store.delete_cart_lines(&alice, &[product_id]).await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.list_cart(&bob).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_conditional_status_update() {
        let store = InMemoryStore::new();
        let owner = UserId::new("owner");
        let order = Order::place(
            owner.clone(),
            vec![OrderLine::new(
                ProductId::new(),
                "Widget",
                Money::from_cents(100),
                1,
            )],
            Utc::now(),
        )
        .unwrap();
        store.insert_order(&order).await.unwrap();

        let stranger = UserId::new("stranger");
        let denied = store
            .update_order_status(
                order.id,
                OrderStatus::Canceled,
                &[OrderStatus::Pending],
                Some(&stranger),
                Utc::now(),
            )
            .await
            .unwrap();
        assert!(denied.is_none());

        let updated = store
            .update_order_status(
                order.id,
                OrderStatus::Canceled,
                &[OrderStatus::Pending],
                Some(&owner),
                Utc::now(),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Canceled);
        assert!(updated.updated_at.is_some());

        let again = store
            .update_order_status(
                order.id,
                OrderStatus::Canceled,
                &[OrderStatus::Pending],
                None,
                Utc::now(),
            )
            .await
            .unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn test_update_product_applies_patch() {
        let store = InMemoryStore::new();
        let product = seed(&store, 1).await;

        let patch = ProductPatch {
            price: Some(Money::from_cents(1)),
            ..Default::default()
        };
        let updated = store
            .update_product(product.id, &patch, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.price.cents(), 1);
        assert_eq!(updated.name, "Widget");

        assert!(
            store
                .update_product(ProductId::new(), &patch, Utc::now())
                .await
                .unwrap()
                .is_none()
        );
    }
}
