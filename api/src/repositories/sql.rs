use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{domains::Person, error::RepositoryError};

use super::PersonRepository;

#[derive(Clone)]
pub struct SqlPersonRepository {
    pub(super) pool: PgPool,
}

impl SqlPersonRepository {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;

        sqlx::query(
            "\
CREATE TABLE IF NOT EXISTS person ( \
    id BIGSERIAL PRIMARY KEY, \
    name VARCHAR(255) NOT NULL \
)\
",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl PersonRepository for SqlPersonRepository {
    #[tracing::instrument(skip(self))]
    async fn add(&self, person: Person) -> Result<Person, RepositoryError> {
        sqlx::query_as("INSERT INTO person (name) VALUES ($1) RETURNING id, name")
            .bind(&person.name)
            .fetch_one(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn list(&self) -> Result<Vec<Person>, RepositoryError> {
        sqlx::query_as("SELECT id, name FROM person ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }
}
