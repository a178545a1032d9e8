use serde::{Deserialize, Serialize};

use crate::auth::{SessionIdentity, SessionManager};
use crate::database::{User, UserRepository};
use crate::error::ApiError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginCmd {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginVo {
    pub token: String,
    pub user: SessionIdentity,
}

impl From<&User> for SessionIdentity {
    fn from(user: &User) -> Self {
        let mut identity = SessionIdentity::new(user.id, user.email.clone());
        if let Some(name) = user.name.as_deref().filter(|n| !n.is_empty()) {
            identity = identity.with_name(name);
        }
        if !user.roles.is_empty() {
            identity = identity.with_roles(user.roles.iter().cloned());
        }
        identity
    }
}

/// Login, logout and refresh on top of the session manager
#[derive(Clone)]
pub struct AuthService {
    users: UserRepository,
    sessions: SessionManager,
}

impl AuthService {
    pub fn new(users: UserRepository, sessions: SessionManager) -> Self {
        Self { users, sessions }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Credentials are only checked for presence; there is no password
    /// store to verify against.
    pub async fn login(&self, cmd: LoginCmd) -> Result<LoginVo, ApiError> {
        let email = cmd.email.trim();
        if email.is_empty() || cmd.password.is_empty() {
            return Err(ApiError::bad_request("Email and password are required"));
        }

        let Some(user) = self.users.find_by_email(email).await? else {
            tracing::warn!("Login rejected for unknown email {}", email);
            return Err(ApiError::unauthorized("Invalid credentials"));
        };

        let identity = SessionIdentity::from(&user);
        let token = self.sessions.create_session(&identity).await?;
        tracing::info!("User {} logged in", user.id);

        Ok(LoginVo { token, user: identity })
    }

    pub async fn logout(&self, token: &str) -> Result<bool, ApiError> {
        Ok(self.sessions.destroy_session(token).await?)
    }

    pub async fn refresh(&self, token: &str) -> Result<bool, ApiError> {
        Ok(self.sessions.refresh_session(token, self.sessions.default_ttl()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn identity_from_user_row() {
        let user = User {
            id: 3,
            email: "root@example.com".to_string(),
            name: Some(String::new()),
            roles: vec!["admin".to_string()],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let identity = SessionIdentity::from(&user);
        assert_eq!(identity.id, 3);
        assert_eq!(identity.name, None);
        assert_eq!(identity.roles(), ["admin".to_string()]);
    }

    #[test]
    fn empty_roles_are_omitted() {
        let user = User {
            id: 4,
            email: "u@example.com".to_string(),
            name: Some("U".to_string()),
            roles: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let identity = SessionIdentity::from(&user);
        assert!(identity.roles.is_none());
        assert_eq!(identity.name.as_deref(), Some("U"));
    }
}
