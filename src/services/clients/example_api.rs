use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use crate::http_client::{ClientDescriptor, DeclarativeClient, HttpClientError, HttpClientFactory, MethodDescriptor};

pub const SERVICE_NAME: &str = "jsonplaceholder";
pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExternalUser {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateExternalUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// JSONPlaceholder users API
pub fn descriptor(base_url: &str) -> ClientDescriptor {
    ClientDescriptor::new(SERVICE_NAME, base_url)
        .timeout(Duration::from_secs(10))
        .header("Content-Type", "application/json")
        .retries(2)
        .method("getUsers", MethodDescriptor::get("/users"))
        .method("getUser", MethodDescriptor::get("/users/:id").path_param("id"))
        .method(
            "searchUsers",
            MethodDescriptor::get("/users").query_param("name").query_param("email"),
        )
        .method("createUser", MethodDescriptor::post("/users").body())
        .method("updateUser", MethodDescriptor::put("/users/:id").path_param("id").body())
        .method("deleteUser", MethodDescriptor::delete("/users/:id").path_param("id"))
        .method(
            "getUserWithAuth",
            MethodDescriptor::get("/users/:id").path_param("id").header("Authorization"),
        )
}

/// Typed facade over the declarative client
#[derive(Clone)]
pub struct ExampleApiClient {
    client: DeclarativeClient,
}

impl ExampleApiClient {
    pub fn new(factory: &HttpClientFactory, base_url: &str) -> Result<Self, HttpClientError> {
        Ok(Self {
            client: factory.build(descriptor(base_url))?,
        })
    }

    pub fn client(&self) -> &DeclarativeClient {
        &self.client
    }

    pub async fn get_users(&self) -> Result<Vec<ExternalUser>, HttpClientError> {
        self.client.call_as("getUsers", &[]).await
    }

    pub async fn get_user(&self, id: i64) -> Result<ExternalUser, HttpClientError> {
        self.client.call_as("getUser", &[json!(id)]).await
    }

    pub async fn search_users(
        &self,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<Vec<ExternalUser>, HttpClientError> {
        self.client.call_as("searchUsers", &[json!(name), json!(email)]).await
    }

    pub async fn create_user(&self, data: &CreateExternalUser) -> Result<ExternalUser, HttpClientError> {
        self.client.call_as("createUser", &[to_arg(data)?]).await
    }

    pub async fn update_user(&self, id: i64, data: &UpdateExternalUser) -> Result<ExternalUser, HttpClientError> {
        self.client.call_as("updateUser", &[json!(id), to_arg(data)?]).await
    }

    pub async fn delete_user(&self, id: i64) -> Result<(), HttpClientError> {
        self.client.call("deleteUser", &[json!(id)]).await?;
        Ok(())
    }

    pub async fn get_user_with_auth(&self, id: i64, token: &str) -> Result<ExternalUser, HttpClientError> {
        self.client.call_as("getUserWithAuth", &[json!(id), json!(token)]).await
    }
}

fn to_arg<T: Serialize>(value: &T) -> Result<Value, HttpClientError> {
    serde_json::to_value(value).map_err(|e| HttpClientError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{HttpClientService, TransportDefaults};
    use std::sync::Arc;

    fn client() -> ExampleApiClient {
        let factory = HttpClientFactory::new(Arc::new(HttpClientService::new(TransportDefaults::default())));
        ExampleApiClient::new(&factory, DEFAULT_BASE_URL).unwrap()
    }

    #[test]
    fn descriptor_is_valid() {
        let d = descriptor(DEFAULT_BASE_URL);
        assert!(d.validate().is_ok());
        assert_eq!(d.retries, 2);
        assert_eq!(d.timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn search_omits_missing_filters() {
        let request = client()
            .client()
            .prepare("searchUsers", &[json!(None::<&str>), json!("a@b.co")])
            .unwrap();
        assert_eq!(request.query, vec![("email".to_string(), "a@b.co".to_string())]);
    }

    #[test]
    fn auth_header_is_bound() {
        let request = client()
            .client()
            .prepare("getUserWithAuth", &[json!(1), json!("Bearer t")])
            .unwrap();
        assert_eq!(request.path, "/users/1");
        assert_eq!(request.headers["authorization"], "Bearer t");
    }
}
