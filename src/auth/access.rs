use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;

use super::context::AuthContext;
use super::identity::SessionIdentity;

/// Per-route access requirements.
///
/// Routes are open unless they opt in to authentication; a role list only
/// applies on top of `require_auth`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouteAccess {
    pub require_auth: bool,
    pub roles: Vec<String>,
}

impl RouteAccess {
    pub fn public() -> Self {
        Self::default()
    }

    pub fn authenticated() -> Self {
        Self {
            require_auth: true,
            roles: Vec::new(),
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn authorize(&self, identity: Option<&SessionIdentity>) -> Result<(), ApiError> {
        if !self.require_auth {
            return Ok(());
        }

        let identity = identity.ok_or_else(|| ApiError::unauthorized("Please log in first"))?;

        if !self.roles.is_empty() && !identity.has_any_role(&self.roles) {
            tracing::debug!(
                "Access denied for user {}: needs one of {:?}, has {:?}",
                identity.id,
                self.roles,
                identity.roles()
            );
            return Err(ApiError::forbidden("Insufficient permissions"));
        }

        Ok(())
    }
}

/// Route-layer middleware; must run after the session authenticator
pub async fn require_access(
    State(access): State<RouteAccess>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = request.extensions().get::<AuthContext>().map(|ctx| &ctx.identity);
    access.authorize(identity)?;
    Ok(next.run(request).await)
}
