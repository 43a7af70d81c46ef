//! Cart maintenance ahead of checkout.

use chrono::Utc;
use common::{ProductId, UserId};
use domain::{CartLine, DomainError, Money, Product};
use serde::Serialize;
use store::{CartStore, ProductStore};

use crate::config::CheckoutConfig;
use crate::error::StorefrontError;

/// A cart line joined with the product it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartEntry {
    pub line: CartLine,
    pub product: Product,
}

impl CartEntry {
    /// Line total at the product's current price, or `None` if it does
    /// not fit in cents.
    pub fn subtotal(&self) -> Option<Money> {
        self.product.price.checked_multiply(self.line.quantity)
    }
}

/// Adds, lists, re-counts and removes cart lines.
///
/// Quantities are checked against stock when written, but nothing is held:
/// stock is only taken at checkout.
#[derive(Debug, Clone)]
pub struct CartService<P, C> {
    products: P,
    carts: C,
    config: CheckoutConfig,
}

impl<P, C> CartService<P, C>
where
    P: ProductStore,
    C: CartStore,
{
    pub fn new(products: P, carts: C, config: CheckoutConfig) -> Self {
        Self {
            products,
            carts,
            config,
        }
    }

    /// Adds `quantity` units to the user's line for `product_id`, creating
    /// the line if needed. The resulting quantity may not exceed stock.
    #[tracing::instrument(skip(self, user_id), fields(user_id = %user_id))]
    pub async fn add_item(
        &self,
        user_id: &UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartEntry, StorefrontError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity { quantity }.into());
        }
        let product = self.product(product_id).await?;

        let existing = self
            .config
            .bounded(self.carts.find_cart_lines(user_id, &[product_id]))
            .await?;
        let already = existing.first().map_or(0, |line| line.quantity);
        let wanted = already.saturating_add(quantity);
        ensure_in_stock(&product, wanted)?;

        let line = CartLine::new(user_id.clone(), product_id, wanted, Utc::now())?;
        let line = self.config.bounded(self.carts.upsert_cart_line(&line)).await?;
        tracing::debug!(quantity = line.quantity, "cart line saved");
        Ok(CartEntry { line, product })
    }

    /// The user's cart. Lines whose product has since been deleted are skipped.
    pub async fn list(&self, user_id: &UserId) -> Result<Vec<CartEntry>, StorefrontError> {
        let lines = self.config.bounded(self.carts.list_cart(user_id)).await?;

        let mut entries = Vec::with_capacity(lines.len());
        for line in lines {
            match self
                .config
                .bounded(self.products.find_product(line.product_id))
                .await?
            {
                Some(product) => entries.push(CartEntry { line, product }),
                None => tracing::debug!(product_id = %line.product_id, "skipping orphaned cart line"),
            }
        }
        Ok(entries)
    }

    /// Sets the quantity of an existing line. Zero removes the line and
    /// returns `None`.
    #[tracing::instrument(skip(self, user_id), fields(user_id = %user_id))]
    pub async fn update_quantity(
        &self,
        user_id: &UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Option<CartEntry>, StorefrontError> {
        let existing = self
            .config
            .bounded(self.carts.find_cart_lines(user_id, &[product_id]))
            .await?;
        if existing.is_empty() {
            return Err(StorefrontError::NotInCart(product_id));
        }
        let product = self.product(product_id).await?;

        if quantity == 0 {
            self.remove(user_id, product_id).await?;
            return Ok(None);
        }
        ensure_in_stock(&product, quantity)?;

        let line = self
            .config
            .bounded(self.carts.set_cart_quantity(user_id, product_id, quantity))
            .await?
            .ok_or(StorefrontError::NotInCart(product_id))?;
        Ok(Some(CartEntry { line, product }))
    }

    /// Removes the user's line for `product_id`.
    pub async fn remove(&self, user_id: &UserId, product_id: ProductId) -> Result<(), StorefrontError> {
        let removed = self
            .config
            .bounded(self.carts.remove_cart_line(user_id, product_id))
            .await?;
        if !removed {
            return Err(StorefrontError::NotInCart(product_id));
        }
        Ok(())
    }

    async fn product(&self, id: ProductId) -> Result<Product, StorefrontError> {
        self.config
            .bounded(self.products.find_product(id))
            .await?
            .ok_or(StorefrontError::ProductNotFound(id))
    }
}

fn ensure_in_stock(product: &Product, quantity: u32) -> Result<(), StorefrontError> {
    if !product.has_stock_for(quantity) {
        return Err(StorefrontError::QuantityExceedsStock {
            requested: quantity,
            available: product.stock,
        });
    }
    Ok(())
}
