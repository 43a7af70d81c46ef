use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, UserId};
use domain::{CartLine, Order, OrderStatus, Product, ProductPatch};

use crate::Result;

/// Catalog persistence.
///
/// All implementations must be thread-safe (Send + Sync); a single handle is
/// shared by every in-flight request.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Persists a new product.
    async fn insert_product(&self, product: &Product) -> Result<()>;

    /// Loads a product by id.
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Lists every product, oldest first.
    async fn list_products(&self) -> Result<Vec<Product>>;

    /// Applies the present fields of `patch` and returns the updated record.
    ///
    /// Returns None if the product doesn't exist. Callers validate the patch.
    async fn update_product(
        &self,
        id: ProductId,
        patch: &ProductPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Product>>;

    /// Deletes a product. Returns false if it did not exist.
    async fn delete_product(&self, id: ProductId) -> Result<bool>;

    /// Subtracts `amount` from stock if and only if `stock >= amount` at
    /// write time.
    ///
    /// Returns the product as it reads immediately after the write, or None
    /// when the guard did not hold (or the product is gone). This is the
    /// single arbitration point between concurrent checkouts.
    async fn conditional_decrement_stock(
        &self,
        id: ProductId,
        amount: u32,
    ) -> Result<Option<Product>>;

    /// Adds `amount` back to stock. Returns false if the product is gone.
    async fn increment_stock(&self, id: ProductId, amount: u32) -> Result<bool>;
}

/// Cart persistence. At most one line exists per `(user, product)`.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Returns the caller's lines whose product is one of `product_ids`.
    async fn find_cart_lines(
        &self,
        user_id: &UserId,
        product_ids: &[ProductId],
    ) -> Result<Vec<CartLine>>;

    /// Deletes the caller's lines for `product_ids`, returning how many went.
    async fn delete_cart_lines(&self, user_id: &UserId, product_ids: &[ProductId])
    -> Result<u64>;

    /// Lists every line in the caller's cart, oldest first.
    async fn list_cart(&self, user_id: &UserId) -> Result<Vec<CartLine>>;

    /// Inserts the line, or replaces the quantity of the existing line for
    /// the same `(user, product)` pair. Returns the stored line.
    async fn upsert_cart_line(&self, line: &CartLine) -> Result<CartLine>;

    /// Sets the quantity of an existing line. Returns None if there is none.
    async fn set_cart_quantity(
        &self,
        user_id: &UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Option<CartLine>>;

    /// Removes one line. Returns false if there was none.
    async fn remove_cart_line(&self, user_id: &UserId, product_id: ProductId) -> Result<bool>;
}

/// Order persistence.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order.
    async fn insert_order(&self, order: &Order) -> Result<()>;

    /// Loads an order by id.
    async fn find_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists the caller's orders, oldest first.
    async fn list_orders_for_user(&self, user_id: &UserId) -> Result<Vec<Order>>;

    /// Lists every order, oldest first.
    async fn list_orders(&self) -> Result<Vec<Order>>;

    /// Sets `status` in a single conditional write that only matches when
    /// the current status is one of `allowed_current` and, if `owner` is
    /// given, the order belongs to that user.
    ///
    /// Returns the updated order, or None if nothing matched.
    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        allowed_current: &[OrderStatus],
        owner: Option<&UserId>,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>>;
}
