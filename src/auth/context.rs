use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

use super::identity::SessionIdentity;

/// What the request authenticator attached to the request, if anything
#[derive(Clone, Debug)]
pub struct AuthContext {
    pub identity: SessionIdentity,
    pub token: String,
}

/// Extractor for handlers that need a logged-in caller
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthContext);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| ApiError::unauthorized("Please log in first"))
    }
}

/// Extractor that never rejects; `None` for anonymous callers
#[derive(Clone, Debug)]
pub struct MaybeUser(pub Option<AuthContext>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<AuthContext>().cloned()))
    }
}
