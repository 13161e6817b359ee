//! Worker roster.

use std::collections::HashMap;
use std::sync::Arc;

use common::AggregateId;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::RegistryError;

/// A worker row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub id: AggregateId,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
}

/// In-memory worker registry with a unique phone number.
#[derive(Clone, Default)]
pub struct WorkerRoster {
    inner: Arc<RwLock<HashMap<AggregateId, Worker>>>,
}

impl WorkerRoster {
    /// Creates an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new worker. Fails if the phone number is taken.
    pub async fn insert(
        &self,
        first_name: String,
        last_name: String,
        phone_number: String,
    ) -> Result<Worker, RegistryError> {
        let mut inner = self.inner.write().await;

        if inner.values().any(|w| w.phone_number == phone_number) {
            return Err(RegistryError::Duplicate {
                field: "phone_number",
                value: phone_number,
            });
        }

        let worker = Worker {
            id: AggregateId::new(),
            first_name,
            last_name,
            phone_number,
        };
        inner.insert(worker.id, worker.clone());
        Ok(worker)
    }

    /// Edits an existing worker.
    pub async fn update(
        &self,
        id: AggregateId,
        first_name: Option<String>,
        last_name: Option<String>,
        phone_number: Option<String>,
    ) -> Result<Worker, RegistryError> {
        let mut inner = self.inner.write().await;

        if let Some(ref phone) = phone_number
            && inner.values().any(|w| w.id != id && &w.phone_number == phone)
        {
            return Err(RegistryError::Duplicate {
                field: "phone_number",
                value: phone.clone(),
            });
        }

        let worker = inner.get_mut(&id).ok_or(RegistryError::NotFound {
            kind: "Worker",
            id,
        })?;

        if let Some(first_name) = first_name {
            worker.first_name = first_name;
        }
        if let Some(last_name) = last_name {
            worker.last_name = last_name;
        }
        if let Some(phone) = phone_number {
            worker.phone_number = phone;
        }

        Ok(worker.clone())
    }

    /// Looks up a worker.
    pub async fn get(&self, id: AggregateId) -> Result<Worker, RegistryError> {
        self.inner
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(RegistryError::NotFound {
                kind: "Worker",
                id,
            })
    }

    /// Lists all workers ordered by last then first name.
    pub async fn all(&self) -> Vec<Worker> {
        let inner = self.inner.read().await;
        let mut workers: Vec<_> = inner.values().cloned().collect();
        workers.sort_by(|a, b| {
            a.last_name
                .cmp(&b.last_name)
                .then(a.first_name.cmp(&b.first_name))
        });
        workers
    }

    /// Number of workers on the roster.
    pub async fn count(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Removes a worker.
    pub async fn remove(&self, id: AggregateId) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().await;
        inner.remove(&id).ok_or(RegistryError::NotFound {
            kind: "Worker",
            id,
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_and_count() {
        let roster = WorkerRoster::new();
        roster
            .insert("Ivan".to_string(), "Petrov".to_string(), "0888-1".to_string())
            .await
            .unwrap();
        roster
            .insert("Maria".to_string(), "Ivanova".to_string(), "0888-2".to_string())
            .await
            .unwrap();

        assert_eq!(roster.count().await, 2);
    }

    #[tokio::test]
    async fn duplicate_phone_is_rejected() {
        let roster = WorkerRoster::new();
        roster
            .insert("Ivan".to_string(), "Petrov".to_string(), "0888-1".to_string())
            .await
            .unwrap();

        let result = roster
            .insert("Maria".to_string(), "Ivanova".to_string(), "0888-1".to_string())
            .await;
        assert!(matches!(result, Err(RegistryError::Duplicate { .. })));
    }

    #[tokio::test]
    async fn listing_is_sorted_by_name() {
        let roster = WorkerRoster::new();
        roster
            .insert("Ivan".to_string(), "Petrov".to_string(), "0888-1".to_string())
            .await
            .unwrap();
        roster
            .insert("Maria".to_string(), "Ivanova".to_string(), "0888-2".to_string())
            .await
            .unwrap();

        let names: Vec<_> = roster
            .all()
            .await
            .into_iter()
            .map(|w| w.last_name)
            .collect();
        assert_eq!(names, vec!["Ivanova", "Petrov"]);
    }

    #[tokio::test]
    async fn remove_then_get_is_not_found() {
        let roster = WorkerRoster::new();
        let worker = roster
            .insert("Ivan".to_string(), "Petrov".to_string(), "0888-1".to_string())
            .await
            .unwrap();

        roster.remove(worker.id).await.unwrap();

        assert!(matches!(
            roster.get(worker.id).await,
            Err(RegistryError::NotFound { .. })
        ));
    }
}
