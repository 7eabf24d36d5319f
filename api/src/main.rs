mod config;
mod controller;
mod domains;
mod error;
mod form;
mod http;
mod repositories;
mod server;
mod views;

use std::{process, sync::Arc};

use anyhow::Context;
use controller::{route_request, PersonController};
use form::DefaultFormFactory;
use repositories::{memory::InMemoryPersonRepository, sql::SqlPersonRepository, PersonRepository};
use server::Server;
use tokio::runtime::Handle;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(err) = run().await {
        tracing::error!("server failed: {err:#}");
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = config::Config::load()?;
    tracing::debug!(
        address = %config.server_address,
        max_connections = config.max_connections,
        "configuration loaded"
    );

    let repository: Arc<dyn PersonRepository + Send + Sync> = match &config.database_url {
        Some(url) => {
            let repository = SqlPersonRepository::connect(url, config.database_pool_size)
                .await
                .context("failed to connect to the database")?;
            Arc::new(repository)
        }
        None => {
            tracing::warn!("no database_url configured, persons are kept in memory");
            Arc::new(InMemoryPersonRepository::new())
        }
    };

    let controller =
        PersonController::new(Arc::new(DefaultFormFactory), repository, Handle::current());
    let state = AppState {
        controller: Arc::new(controller),
    };

    let server = Server::new(
        state,
        route_request,
        config.max_connections,
        config.request_timeout(),
    );

    server
        .bind(&config.server_address)
        .await
        .with_context(|| format!("failed to serve on {}", config.server_address))
}

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<PersonController>,
}
