//! Product catalog.

use std::collections::HashMap;
use std::sync::Arc;

use common::AggregateId;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::values::{Material, Money};

use super::RegistryError;

/// A product in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: AggregateId,
    pub product_code: String,
    pub material: Material,
    /// Quantity is measured in weight units rather than discrete count.
    pub by_weight: bool,
    /// Price per unit (or per kilogram for by-weight products).
    pub price: Money,
    /// Soft-deleted products stay resolvable for historical entries but
    /// are hidden from listings.
    pub deleted: bool,
}

/// Fields for registering a new product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub product_code: String,
    pub material: Material,
    pub by_weight: bool,
    pub price: Money,
}

/// Fields for editing an existing product.
#[derive(Debug, Clone)]
pub struct ProductUpdate {
    pub product_code: Option<String>,
    pub material: Option<Material>,
    pub by_weight: Option<bool>,
    pub price: Option<Money>,
}

/// In-memory product registry with a unique product code.
#[derive(Clone, Default)]
pub struct ProductCatalog {
    inner: Arc<RwLock<HashMap<AggregateId, Product>>>,
}

impl ProductCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new product. Fails if the product code is taken.
    pub async fn insert(&self, new: NewProduct) -> Result<Product, RegistryError> {
        let mut inner = self.inner.write().await;

        if inner
            .values()
            .any(|p| !p.deleted && p.product_code == new.product_code)
        {
            return Err(RegistryError::Duplicate {
                field: "product_code",
                value: new.product_code,
            });
        }

        let product = Product {
            id: AggregateId::new(),
            product_code: new.product_code,
            material: new.material,
            by_weight: new.by_weight,
            price: new.price,
            deleted: false,
        };
        inner.insert(product.id, product.clone());
        Ok(product)
    }

    /// Edits an existing product. Historical sale costs are not
    /// recomputed when the price changes.
    pub async fn update(
        &self,
        id: AggregateId,
        update: ProductUpdate,
    ) -> Result<Product, RegistryError> {
        let mut inner = self.inner.write().await;

        if let Some(ref code) = update.product_code
            && inner
                .values()
                .any(|p| p.id != id && !p.deleted && &p.product_code == code)
        {
            return Err(RegistryError::Duplicate {
                field: "product_code",
                value: code.clone(),
            });
        }

        let product = inner.get_mut(&id).ok_or(RegistryError::NotFound {
            kind: "Product",
            id,
        })?;

        if let Some(code) = update.product_code {
            product.product_code = code;
        }
        if let Some(material) = update.material {
            product.material = material;
        }
        if let Some(by_weight) = update.by_weight {
            product.by_weight = by_weight;
        }
        if let Some(price) = update.price {
            product.price = price;
        }

        Ok(product.clone())
    }

    /// Looks up a product, including soft-deleted ones.
    pub async fn get(&self, id: AggregateId) -> Result<Product, RegistryError> {
        self.inner
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(RegistryError::NotFound {
                kind: "Product",
                id,
            })
    }

    /// Lists non-deleted products ordered by product code.
    pub async fn all(&self) -> Vec<Product> {
        let inner = self.inner.read().await;
        let mut products: Vec<_> = inner.values().filter(|p| !p.deleted).cloned().collect();
        products.sort_by(|a, b| a.product_code.cmp(&b.product_code));
        products
    }

    /// Hides a product from listings while keeping it resolvable.
    pub async fn soft_delete(&self, id: AggregateId) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().await;
        let product = inner.get_mut(&id).ok_or(RegistryError::NotFound {
            kind: "Product",
            id,
        })?;
        product.deleted = true;
        Ok(())
    }

    /// Removes a product entirely.
    pub async fn hard_delete(&self, id: AggregateId) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().await;
        inner.remove(&id).ok_or(RegistryError::NotFound {
            kind: "Product",
            id,
        })?;
        Ok(())
    }
}
