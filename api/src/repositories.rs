pub mod memory;
pub mod sql;

use crate::{domains::Person, error::RepositoryError};

/// Storage for [`Person`] records. Shared by every request, so
/// implementations must tolerate concurrent `add` and `list` calls.
#[async_trait::async_trait]
pub trait PersonRepository {
    /// Stores a new person and returns it with the assigned id.
    async fn add(&self, person: Person) -> Result<Person, RepositoryError>;
    async fn list(&self) -> Result<Vec<Person>, RepositoryError>;
}
