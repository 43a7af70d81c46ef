//! Admin product catalog.

use chrono::Utc;
use common::ProductId;
use domain::{NewProduct, Product, ProductPatch};
use store::ProductStore;

use crate::config::CheckoutConfig;
use crate::error::StorefrontError;

#[derive(Debug, Clone)]
pub struct CatalogService<P> {
    products: P,
    config: CheckoutConfig,
}

impl<P: ProductStore> CatalogService<P> {
    pub fn new(products: P, config: CheckoutConfig) -> Self {
        Self { products, config }
    }

    #[tracing::instrument(skip(self, new_product), fields(name = %new_product.name))]
    pub async fn create(&self, new_product: NewProduct) -> Result<Product, StorefrontError> {
        let product = new_product.into_product(Utc::now())?;
        self.config
            .bounded(self.products.insert_product(&product))
            .await?;
        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    pub async fn list(&self) -> Result<Vec<Product>, StorefrontError> {
        Ok(self.config.bounded(self.products.list_products()).await?)
    }

    /// Applies the fields present in `patch`; absent fields are untouched.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: ProductId,
        patch: ProductPatch,
    ) -> Result<Product, StorefrontError> {
        patch.validate()?;
        self.config
            .bounded(self.products.update_product(id, &patch, Utc::now()))
            .await?
            .ok_or(StorefrontError::ProductNotFound(id))
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), StorefrontError> {
        let deleted = self.config.bounded(self.products.delete_product(id)).await?;
        if !deleted {
            return Err(StorefrontError::ProductNotFound(id));
        }
        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{DomainError, Money};
    use store::InMemoryStore;

    fn catalog() -> CatalogService<InMemoryStore> {
        CatalogService::new(InMemoryStore::new(), CheckoutConfig::default())
    }

    #[tokio::test]
    async fn test_create_list_update_delete() {
        let catalog = catalog();
        let created = catalog
            .create(NewProduct::new("Widget", "blue", Money::from_cents(1000), 3))
            .await
            .unwrap();
        assert_eq!(catalog.list().await.unwrap(), vec![created.clone()]);

        let updated = catalog
            .update(
                created.id,
                ProductPatch {
                    stock: Some(10),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.stock, 10);
        assert_eq!(updated.description, "blue");

        catalog.delete(created.id).await.unwrap();
        assert!(catalog.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_product() {
        let result = catalog()
            .create(NewProduct::new("", "", Money::from_cents(1), 1))
            .await;
        assert!(matches!(
            result,
            Err(StorefrontError::Invalid(DomainError::EmptyName))
        ));
    }

    #[tokio::test]
    async fn test_update_rejects_empty_patch() {
        let catalog = catalog();
        let created = catalog
            .create(NewProduct::new("Widget", "", Money::from_cents(1), 1))
            .await
            .unwrap();
        let result = catalog.update(created.id, ProductPatch::default()).await;
        assert!(matches!(
            result,
            Err(StorefrontError::Invalid(DomainError::EmptyPatch))
        ));
    }

    #[tokio::test]
    async fn test_missing_product() {
        let catalog = catalog();
        let patch = ProductPatch {
            name: Some("x".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            catalog.update(ProductId::new(), patch).await,
            Err(StorefrontError::ProductNotFound(_))
        ));
        assert!(matches!(
            catalog.delete(ProductId::new()).await,
            Err(StorefrontError::ProductNotFound(_))
        ));
    }
}
