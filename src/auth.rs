use async_trait::async_trait;
use axum::extract::{FromRequest, RequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::err::Error;
use crate::models::Email;
use crate::AppState;

/// A caller whose bearer credential has been verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub email: Email,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing Authorization header")]
    MissingHeader,
    #[error("invalid Authorization header format")]
    Malformed,
    #[error("failed to verify token")]
    InvalidToken,
    #[error("identity provider unavailable: {0}")]
    Provider(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PrincipalResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Principal, AuthError>;
}

pub fn token_digest(token: &str) -> String {
    let mut hasher: Sha256 = Digest::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Resolves tokens against a fixed table of SHA-256 digests, so plaintext
/// tokens never sit in configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenResolver {
    tokens: HashMap<String, Email>,
}

impl StaticTokenResolver {
    pub fn new(tokens: HashMap<String, Email>) -> Self {
        StaticTokenResolver { tokens }
    }
}

#[async_trait]
impl PrincipalResolver for StaticTokenResolver {
    async fn resolve(&self, token: &str) -> Result<Principal, AuthError> {
        self.tokens
            .get(&token_digest(token))
            .map(|email| Principal {
                email: email.clone(),
            })
            .ok_or(AuthError::InvalidToken)
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers.get(AUTHORIZATION).ok_or(AuthError::MissingHeader)?;
    let value = value.to_str().map_err(|_| AuthError::Malformed)?;
    if value.is_empty() {
        return Err(AuthError::MissingHeader);
    }
    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AuthError::Malformed),
    }
}

/// Extractor yielding the verified [`Principal`] of the request.
pub struct Authenticated(pub Principal);

#[async_trait]
impl<B> FromRequest<B> for Authenticated
where
    B: Send,
{
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let state = req
            .extensions()
            .get::<Arc<AppState>>()
            .cloned()
            .ok_or_else(|| Error::InternalError {
                kind: "StateMissing",
                message: "application state is not installed".to_string(),
            })?;
        let token = bearer_token(req.headers())?.to_string();
        let principal = state.resolver.resolve(&token).await.map_err(|err| {
            log::warn!("Token verification failed: {}", err);
            err
        })?;
        log::info!("Authenticated user: {}", principal.email);
        Ok(Authenticated(principal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Ok("abc.def"));
    }

    #[test]
    fn rejects_missing_and_malformed_headers() {
        assert_eq!(bearer_token(&HeaderMap::new()), Err(AuthError::MissingHeader));
        assert_eq!(bearer_token(&headers("Basic Zm9vOmJhcg==")), Err(AuthError::Malformed));
        assert_eq!(bearer_token(&headers("Bearer   ")), Err(AuthError::Malformed));
    }

    #[test]
    fn digest_is_hex_sha256() {
        assert_eq!(
            token_digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn static_resolver_maps_known_tokens() {
        let mut tokens = HashMap::new();
        tokens.insert(token_digest("office-token"), Email::parse("Office@School.org").unwrap());
        let resolver = StaticTokenResolver::new(tokens);

        let principal = resolver.resolve("office-token").await.unwrap();
        assert_eq!(principal.email.as_str(), "office@school.org");
        assert_eq!(
            resolver.resolve("guess").await,
            Err(AuthError::InvalidToken)
        );
    }
}
