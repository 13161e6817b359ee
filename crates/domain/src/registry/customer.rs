//! Customer directory.

use std::collections::HashMap;
use std::sync::Arc;

use common::AggregateId;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::RegistryError;

/// A customer row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: AggregateId,
    pub name: String,
    pub phone_number: String,
}

/// In-memory customer registry with a unique phone number.
#[derive(Clone, Default)]
pub struct CustomerDirectory {
    inner: Arc<RwLock<HashMap<AggregateId, Customer>>>,
}

impl CustomerDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new customer. Fails if the phone number is taken.
    pub async fn insert(
        &self,
        name: String,
        phone_number: String,
    ) -> Result<Customer, RegistryError> {
        let mut inner = self.inner.write().await;

        if inner.values().any(|c| c.phone_number == phone_number) {
            return Err(RegistryError::Duplicate {
                field: "phone_number",
                value: phone_number,
            });
        }

        let customer = Customer {
            id: AggregateId::new(),
            name,
            phone_number,
        };
        inner.insert(customer.id, customer.clone());
        Ok(customer)
    }

    /// Edits an existing customer.
    pub async fn update(
        &self,
        id: AggregateId,
        name: Option<String>,
        phone_number: Option<String>,
    ) -> Result<Customer, RegistryError> {
        let mut inner = self.inner.write().await;

        if let Some(ref phone) = phone_number
            && inner.values().any(|c| c.id != id && &c.phone_number == phone)
        {
            return Err(RegistryError::Duplicate {
                field: "phone_number",
                value: phone.clone(),
            });
        }

        let customer = inner.get_mut(&id).ok_or(RegistryError::NotFound {
            kind: "Customer",
            id,
        })?;

        if let Some(name) = name {
            customer.name = name;
        }
        if let Some(phone) = phone_number {
            customer.phone_number = phone;
        }

        Ok(customer.clone())
    }

    /// Looks up a customer.
    pub async fn get(&self, id: AggregateId) -> Result<Customer, RegistryError> {
        self.inner
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(RegistryError::NotFound {
                kind: "Customer",
                id,
            })
    }

    /// Lists all customers ordered by name.
    pub async fn all(&self) -> Vec<Customer> {
        let inner = self.inner.read().await;
        let mut customers: Vec<_> = inner.values().cloned().collect();
        customers.sort_by(|a, b| a.name.cmp(&b.name));
        customers
    }

    /// Removes a customer.
    pub async fn remove(&self, id: AggregateId) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().await;
        inner.remove(&id).ok_or(RegistryError::NotFound {
            kind: "Customer",
            id,
        })?;
        Ok(())
    }
}
