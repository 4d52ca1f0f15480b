#![allow(non_snake_case)]

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;

use serde::Serialize;

use crate::auth::AuthError;
use crate::engine::UpdateError;
use crate::store::StoreError;

pub async fn handler404(path: Uri) -> Error {
    Error::NotFound {
        message: format!("Invalid path: {}", path),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Maybe<T> {
    Nothing(Error),
    Fine(Success<T>),
}

pub fn Fine<V>(v: V) -> Maybe<V>
where
    V: Serialize,
{
    Maybe::Fine(Success::of(v))
}

pub fn Created<V>(v: V) -> Maybe<V>
where
    V: Serialize,
{
    Maybe::Fine(Success {
        status: StatusCode::CREATED,
        success: true,
        value: v,
    })
}

pub fn Nothing<V>(err: Error) -> Maybe<V> {
    Maybe::Nothing(err)
}

#[derive(Debug, Clone, Serialize)]
pub struct Success<V> {
    #[serde(skip)]
    status: StatusCode,
    success: bool,
    #[serde(flatten)]
    value: V,
}

impl<T> IntoResponse for Maybe<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        match self {
            Maybe::Nothing(err) => err.into_response(),
            Maybe::Fine(success) => (success.status, Json(success)).into_response(),
        }
    }
}

impl<V: Serialize> Success<V> {
    pub fn of(value: V) -> Self {
        Self {
            status: StatusCode::OK,
            success: true,
            value,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "error")]
pub enum Error {
    Unauthorized { message: String },
    Forbidden { message: String },
    InvalidPayload { message: String },
    NotFound { message: String },
    Conflict { message: String },
    InternalError { kind: &'static str, message: String },
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Error::Forbidden { .. } => StatusCode::FORBIDDEN,
            Error::InvalidPayload { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Conflict { .. } => StatusCode::CONFLICT,
            Error::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn invalid<S: Into<String>>(msg: S) -> Error {
        Error::InvalidPayload {
            message: msg.into(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<AuthError> for Error {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Provider(_) => {
                log::error!("Identity provider failure: {}", err);
                Self::InternalError {
                    kind: "IdentityProviderError",
                    message: "Failed to verify credentials".to_string(),
                }
            }
            _ => Self::Unauthorized {
                message: err.to_string(),
            },
        }
    }
}

/// Details stay in the log; callers only see the kind.
impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        log::error!("Store failure: {}", err);
        Self::InternalError {
            kind: err.kind(),
            message: "Internal server error".to_string(),
        }
    }
}

impl From<UpdateError> for Error {
    fn from(err: UpdateError) -> Self {
        match err {
            UpdateError::Forbidden(denied) => Self::Forbidden {
                message: denied.reason.to_string(),
            },
            UpdateError::NoFields => Self::invalid("no valid fields to update"),
            UpdateError::NotFound(_) => Self::NotFound {
                message: "No student found with the provided email".to_string(),
            },
            UpdateError::RoleLookup(store) => {
                log::error!("Failed to get user role: {}", store);
                Self::InternalError {
                    kind: store.kind(),
                    message: "Failed to verify user permissions".to_string(),
                }
            }
            UpdateError::Store(store) => store.into(),
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid(format!("Invalid JSON format: {}", rejection))
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Self::invalid(format!("Invalid query: {}", rejection))
    }
}
