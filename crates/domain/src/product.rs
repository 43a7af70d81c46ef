//! Catalog products and their sparse admin patches.

use chrono::{DateTime, Utc};
use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::Money;

/// Highest accepted unit price, in cents ($1,000,000,000.00).
pub const MAX_PRICE_CENTS: i64 = 100_000_000_000;

/// A catalog entry.
///
/// `stock` is the number of units available for checkout. It is unsigned so
/// the type itself rules out negative stock; stores additionally guard every
/// decrement with `stock >= amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub stock: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns true if `quantity` units can currently be taken from stock.
    pub fn has_stock_for(&self, quantity: u32) -> bool {
        quantity <= self.stock
    }
}

/// Fields required to create a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    pub stock: u32,
}

impl NewProduct {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        price: Money,
        stock: u32,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            price,
            stock,
        }
    }

    /// Validates the fields and assigns a fresh id and timestamps.
    pub fn into_product(self, now: DateTime<Utc>) -> Result<Product, DomainError> {
        validate_name(&self.name)?;
        validate_price(self.price)?;

        Ok(Product {
            id: ProductId::new(),
            name: self.name,
            description: self.description,
            price: self.price,
            stock: self.stock,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Sparse update for a product. Only fields that are `Some` are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default)]
    pub stock: Option<u32>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.stock.is_none()
    }

    /// Checks the present fields without applying them.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.is_empty() {
            return Err(DomainError::EmptyPatch);
        }
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        Ok(())
    }

    /// Applies the present fields to `product` and bumps `updated_at`.
    pub fn apply_to(&self, product: &mut Product, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.validate()?;

        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(description) = &self.description {
            product.description = description.clone();
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        product.updated_at = now;
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), DomainError> {
    if name.trim().is_empty() {
        return Err(DomainError::EmptyName);
    }
    Ok(())
}

fn validate_price(price: Money) -> Result<(), DomainError> {
    if price.is_negative() {
        return Err(DomainError::NegativePrice {
            cents: price.cents(),
        });
    }
    if price.cents() > MAX_PRICE_CENTS {
        return Err(DomainError::PriceTooHigh {
            cents: price.cents(),
            max: MAX_PRICE_CENTS,
        });
    }
    Ok(())
}
