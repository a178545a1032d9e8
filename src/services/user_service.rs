use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::database::{NewUser, User, UserChanges, UserRepository};
use crate::error::ApiError;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;
const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserCmd {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub roles: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserCmd {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub roles: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListQuery {
    /// Fill defaults and clamp into the accepted range
    pub fn normalize(&self) -> (u32, u32) {
        let page = self.page.unwrap_or(DEFAULT_PAGE).max(1);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        (page, limit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserVo {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserVo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name.filter(|n| !n.is_empty()),
            created_at: user.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            updated_at: user.updated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: i64,
}

impl PageMeta {
    pub fn new(total: i64, page: u32, limit: u32) -> Self {
        let limit_i = i64::from(limit.max(1));
        Self {
            total,
            page,
            limit,
            total_pages: (total + limit_i - 1) / limit_i,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserListVo {
    pub data: Vec<UserVo>,
    pub meta: PageMeta,
}

/// User management over the `users` table
#[derive(Clone, Debug)]
pub struct UserService {
    repo: UserRepository,
}

impl UserService {
    pub fn new(repo: UserRepository) -> Self {
        Self { repo }
    }

    pub async fn create(&self, cmd: CreateUserCmd) -> Result<UserVo, ApiError> {
        validate_create(&cmd)?;
        let user = self
            .repo
            .create(&NewUser {
                email: cmd.email.trim().to_string(),
                name: cmd.name,
                roles: cmd.roles.unwrap_or_default(),
            })
            .await?;
        tracing::info!("Created user {} ({})", user.id, user.email);
        Ok(user.into())
    }

    pub async fn list(&self, query: ListQuery) -> Result<UserListVo, ApiError> {
        let (page, limit) = query.normalize();
        let (rows, total) = self.repo.find_page(page, limit).await?;
        Ok(UserListVo {
            data: rows.into_iter().map(UserVo::from).collect(),
            meta: PageMeta::new(total, page, limit),
        })
    }

    pub async fn get(&self, id: i64) -> Result<UserVo, ApiError> {
        self.repo
            .find_by_id(id)
            .await?
            .map(UserVo::from)
            .ok_or_else(|| ApiError::not_found(format!("User {} not found", id)))
    }

    pub async fn update(&self, id: i64, cmd: UpdateUserCmd) -> Result<UserVo, ApiError> {
        validate_update(&cmd)?;
        let changes = UserChanges {
            email: cmd.email.map(|e| e.trim().to_string()),
            name: cmd.name,
            roles: cmd.roles,
        };
        if changes.is_empty() {
            return self.get(id).await;
        }
        Ok(self.repo.update(id, &changes).await?.into())
    }

    pub async fn remove(&self, id: i64) -> Result<(), ApiError> {
        self.repo.delete(id).await?;
        tracing::info!("Deleted user {}", id);
        Ok(())
    }
}

/// `local@domain.tld`, with something on each side of the `@` and a dot
/// inside the domain
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

fn check_fields(
    email: Option<&str>,
    name: Option<&str>,
    roles: Option<&[String]>,
    errors: &mut HashMap<String, String>,
) {
    if let Some(email) = email {
        if !is_valid_email(email.trim()) {
            errors.insert("email".to_string(), "email must be an email".to_string());
        }
    }
    if let Some(name) = name {
        if name.chars().count() > MAX_NAME_LEN {
            errors.insert(
                "name".to_string(),
                format!("name must be shorter than or equal to {} characters", MAX_NAME_LEN),
            );
        }
    }
    if let Some(roles) = roles {
        if roles.iter().any(|r| r.trim().is_empty()) {
            errors.insert("roles".to_string(), "roles must not contain empty values".to_string());
        }
    }
}

fn into_result(errors: HashMap<String, String>) -> Result<(), ApiError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation_error("Validation failed", Some(errors)))
    }
}

fn validate_create(cmd: &CreateUserCmd) -> Result<(), ApiError> {
    let mut errors = HashMap::new();
    check_fields(Some(&cmd.email), cmd.name.as_deref(), cmd.roles.as_deref(), &mut errors);
    into_result(errors)
}

fn validate_update(cmd: &UpdateUserCmd) -> Result<(), ApiError> {
    let mut errors = HashMap::new();
    check_fields(cmd.email.as_deref(), cmd.name.as_deref(), cmd.roles.as_deref(), &mut errors);
    into_result(errors)
}
