pub mod auth;
pub mod catalogue;
pub mod config;
pub mod engine;
pub mod err;
pub mod models;
pub mod permission;
pub mod planner;
pub mod renewal;
pub mod store;
pub mod students;

use axum::handler::Handler;
use axum::routing::{get, post};
use axum::{Extension, Router};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::PrincipalResolver;
use crate::engine::UpdateEngine;
use crate::err::{Error, Fine, Maybe, Nothing};
use crate::planner::RenewalTrigger;
use crate::store::StudentStore;

pub type Payload<T> = Result<Maybe<T>, Error>;

pub fn proceeds<V>(value: V) -> Payload<V>
where
    V: Serialize,
{
    Ok(Fine(value))
}

pub fn breaks<V>(err: Error) -> Payload<V>
where
    V: Serialize,
{
    Ok(Nothing(err))
}

/// Everything a request handler needs, shared behind an `Arc`.
pub struct AppState {
    pub engine: UpdateEngine,
    pub store: Arc<dyn StudentStore>,
    pub resolver: Arc<dyn PrincipalResolver>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn StudentStore>,
        resolver: Arc<dyn PrincipalResolver>,
        trigger: RenewalTrigger,
        request_timeout: Duration,
    ) -> Self {
        AppState {
            engine: UpdateEngine::new(store.clone(), trigger, request_timeout),
            store,
            resolver,
        }
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/students/update", post(students::update_student))
        .route(
            "/students",
            get(students::get_student).post(students::register_student),
        )
        .fallback(err::handler404.into_service())
        .layer(Extension(state))
}
