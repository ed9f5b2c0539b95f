//! `IdentityProvider` implementations.
//!
//! Sessions are owned elsewhere; these types only report who is acting.

use crate::domain::IdentityProvider;
use crate::errors::AppError;
use crate::models::Identity;
use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::RwLock;

/// Header carrying the caller's identity id, set by the fronting auth proxy.
pub const IDENTITY_HEADER: &str = "x-identity";

/// Reports the same identity (or none) for its whole lifetime.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(Option<Identity>);

impl StaticIdentity {
    pub fn signed_in(identity: Identity) -> Self {
        Self(Some(identity))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_identity(&self) -> Option<Identity> {
        self.0.clone()
    }
}

/// Identity that can change while components hold it, like a browser session
/// signing in and out.
#[derive(Debug, Default)]
pub struct SessionIdentity {
    current: RwLock<Option<Identity>>,
}

impl SessionIdentity {
    pub fn new(initial: Option<Identity>) -> Self {
        Self {
            current: RwLock::new(initial),
        }
    }

    pub fn sign_in(&self, identity: Identity) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(identity);
    }

    pub fn sign_out(&self) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

impl IdentityProvider for SessionIdentity {
    fn current_identity(&self) -> Option<Identity> {
        self.current.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Extracts the acting identity from [`IDENTITY_HEADER`]. A missing header is
/// an anonymous caller; a malformed one is rejected.
#[derive(Debug, Clone)]
pub struct RequestIdentity(pub StaticIdentity);

impl<S> FromRequestParts<S> for RequestIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts.headers.get(IDENTITY_HEADER) else {
            return Ok(RequestIdentity(StaticIdentity::anonymous()));
        };
        let raw = raw
            .to_str()
            .map_err(|_| AppError::InvalidInput(format!("{} header is not valid text", IDENTITY_HEADER)))?;
        let identity = Identity::new(raw.trim())?;
        Ok(RequestIdentity(StaticIdentity::signed_in(identity)))
    }
}
