use std::sync::atomic::{AtomicI64, Ordering};

use tokio::sync::RwLock;

use crate::{domains::Person, error::RepositoryError};

use super::PersonRepository;

/// Process-local storage used when no database is configured.
#[derive(Debug)]
pub struct InMemoryPersonRepository {
    next_id: AtomicI64,
    people: RwLock<Vec<Person>>,
}

impl Default for InMemoryPersonRepository {
    fn default() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            people: RwLock::default(),
        }
    }
}

impl InMemoryPersonRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl PersonRepository for InMemoryPersonRepository {
    #[tracing::instrument(skip(self))]
    async fn add(&self, person: Person) -> Result<Person, RepositoryError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let stored = person.with_id(id);

        let mut people = self.people.write().await;
        // ids are taken before the lock, keep the list sorted anyway
        let position = people.partition_point(|p| p.id < stored.id);
        people.insert(position, stored.clone());

        tracing::debug!(id, "person stored");
        Ok(stored)
    }

    async fn list(&self) -> Result<Vec<Person>, RepositoryError> {
        Ok(self.people.read().await.clone())
    }
}
