use std::sync::Arc;

use http::{Method, StatusCode};
use tokio::runtime::Handle;

use crate::{
    error::RepositoryError,
    form::FormFactory,
    http::{IntoResponse, Json, Redirect, Request, Response},
    repositories::PersonRepository,
    views, AppState,
};

pub async fn route_request(request: Request, app_state: AppState) -> Response {
    macro_rules! routes {
        (
            $($m:ident $p:literal => $f:expr),*
            $(, _ => $wc:expr)?
        ) => {
            let path = match request.uri().path().trim_end_matches('/') {
                "" => "/".to_owned(),
                path => path.to_owned(),
            };
            $(if request.method() == Method::$m && path == $p {
                return $f;
            })*
            $(return $wc;)?
        };
    }

    let controller = &app_state.controller;
    routes!(
        GET "/" => controller.index(),
        GET "/persons" => controller.get_persons().await,
        POST "/persons" => controller.add_person(request).await,
        POST "/person" => controller.add_person(request).await,
        _ => {
            let msg = format!(
                "Unknown route {} {}",
                request.method(),
                request.uri().path()
            );
            (StatusCode::NOT_FOUND, msg).into_response()
        }
    );
}

/// Request handlers for the person pages. Every collaborator is injected:
/// the form binder, the repository and the runtime handle repository
/// writes are spawned on.
pub struct PersonController {
    forms: Arc<dyn FormFactory>,
    repository: Arc<dyn PersonRepository + Send + Sync>,
    executor: Handle,
}

impl PersonController {
    pub fn new(
        forms: Arc<dyn FormFactory>,
        repository: Arc<dyn PersonRepository + Send + Sync>,
        executor: Handle,
    ) -> Self {
        Self {
            forms,
            repository,
            executor,
        }
    }

    pub fn index(&self) -> Response {
        views::render_index(None).into_response()
    }

    pub async fn add_person(&self, request: Request) -> Response {
        let form = self.forms.person_form(&request);
        let Some(person) = form.value().cloned() else {
            tracing::debug!(?form, "rejected person form");
            return views::render_index(Some(&form)).into_response();
        };

        let repository = Arc::clone(&self.repository);
        let stored = self
            .executor
            .spawn(async move { repository.add(person).await })
            .await
            .unwrap_or_else(|err| Err(RepositoryError::Unavailable(err.to_string())));

        match stored {
            Ok(person) => {
                tracing::info!(id = ?person.id, name = %person.name, "person added");
                Redirect::see_other("/").into_response()
            }
            Err(err) => {
                tracing::error!(%err, "failed to add person");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }

    pub async fn get_persons(&self) -> Response {
        match self.repository.list().await {
            Ok(people) => Json(people).into_response(),
            Err(err) => {
                tracing::error!(%err, "failed to list persons");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
