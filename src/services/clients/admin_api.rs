use serde_json::{json, Value};
use std::time::Duration;

use crate::http_client::{ClientDescriptor, DeclarativeClient, HttpClientError, HttpClientFactory, MethodDescriptor};

pub const SERVICE_NAME: &str = "admin-api";

/// This service's own HTTP API, as seen by the admin CLI
pub fn descriptor(base_url: &str) -> ClientDescriptor {
    ClientDescriptor::new(SERVICE_NAME, base_url)
        .timeout(Duration::from_secs(15))
        .header("Accept", "application/json")
        .method("info", MethodDescriptor::get("/"))
        .method("health", MethodDescriptor::get("/health"))
        .method("login", MethodDescriptor::post("/auth/login").body())
        .method("me", MethodDescriptor::get("/auth/me").header("Authorization"))
        .method("refresh", MethodDescriptor::post("/auth/refresh").header("Authorization"))
        .method("logout", MethodDescriptor::post("/auth/logout").header("Authorization"))
        .method(
            "listUsers",
            MethodDescriptor::get("/users").query_param("page").query_param("limit"),
        )
        .method("getUser", MethodDescriptor::get("/users/{id}").path_param("id"))
        .method(
            "createUser",
            MethodDescriptor::post("/users").body().header("Authorization"),
        )
        .method(
            "deleteUser",
            MethodDescriptor::delete("/users/{id}").path_param("id").header("Authorization"),
        )
}

/// Calls return the `data` member of the success envelope
#[derive(Clone)]
pub struct AdminApiClient {
    client: DeclarativeClient,
    token: Option<String>,
}

impl AdminApiClient {
    pub fn new(factory: &HttpClientFactory, base_url: &str) -> Result<Self, HttpClientError> {
        Ok(Self {
            client: factory.build(descriptor(base_url))?,
            token: None,
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    fn bearer(&self) -> Value {
        match &self.token {
            Some(token) => json!(format!("Bearer {}", token)),
            None => Value::Null,
        }
    }

    async fn data(&self, method: &str, args: &[Value]) -> Result<Value, HttpClientError> {
        let mut envelope = self.client.call(method, args).await?;
        Ok(envelope.get_mut("data").map(Value::take).unwrap_or(envelope))
    }

    pub async fn info(&self) -> Result<Value, HttpClientError> {
        self.data("info", &[]).await
    }

    pub async fn health(&self) -> Result<Value, HttpClientError> {
        self.data("health", &[]).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Value, HttpClientError> {
        self.data("login", &[json!({"email": email, "password": password})]).await
    }

    pub async fn me(&self) -> Result<Value, HttpClientError> {
        self.data("me", &[self.bearer()]).await
    }

    pub async fn refresh(&self) -> Result<Value, HttpClientError> {
        self.data("refresh", &[self.bearer()]).await
    }

    pub async fn logout(&self) -> Result<Value, HttpClientError> {
        self.data("logout", &[self.bearer()]).await
    }

    pub async fn list_users(&self, page: Option<u32>, limit: Option<u32>) -> Result<Value, HttpClientError> {
        self.data("listUsers", &[json!(page), json!(limit)]).await
    }

    pub async fn get_user(&self, id: i64) -> Result<Value, HttpClientError> {
        self.data("getUser", &[json!(id)]).await
    }

    pub async fn create_user(&self, email: &str, name: Option<&str>) -> Result<Value, HttpClientError> {
        self.data("createUser", &[json!({"email": email, "name": name}), self.bearer()])
            .await
    }

    pub async fn delete_user(&self, id: i64) -> Result<Value, HttpClientError> {
        self.data("deleteUser", &[json!(id), self.bearer()]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_is_valid() {
        assert!(descriptor("http://127.0.0.1:3000").validate().is_ok());
    }
}
