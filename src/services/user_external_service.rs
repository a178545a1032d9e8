use tracing::{error, info};

use crate::http_client::HttpClientError;

use super::clients::{CreateExternalUser, ExampleApiClient, ExternalUser, UpdateExternalUser};

/// Business-side access to the third-party users API. Every call logs its
/// outcome and hands failures back unchanged.
#[derive(Clone)]
pub struct UserExternalService {
    api: ExampleApiClient,
}

impl UserExternalService {
    pub fn new(api: ExampleApiClient) -> Self {
        Self { api }
    }

    pub async fn get_external_users(&self) -> Result<Vec<ExternalUser>, HttpClientError> {
        self.api
            .get_users()
            .await
            .inspect(|users| info!("Fetched {} external users", users.len()))
            .inspect_err(|e| error!("Failed to fetch external users: {}", e))
    }

    pub async fn get_external_user(&self, id: i64) -> Result<ExternalUser, HttpClientError> {
        self.api
            .get_user(id)
            .await
            .inspect(|user| info!("Fetched external user: {}", user.name))
            .inspect_err(|e| error!("Failed to fetch external user {}: {}", id, e))
    }

    pub async fn search_external_users(
        &self,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<Vec<ExternalUser>, HttpClientError> {
        self.api
            .search_users(name, email)
            .await
            .inspect(|users| info!("Search matched {} external users", users.len()))
            .inspect_err(|e| error!("External user search failed: {}", e))
    }

    pub async fn create_external_user(&self, data: &CreateExternalUser) -> Result<ExternalUser, HttpClientError> {
        self.api
            .create_user(data)
            .await
            .inspect(|user| info!("Created external user: {}", user.name))
            .inspect_err(|e| error!("Failed to create external user: {}", e))
    }

    pub async fn update_external_user(
        &self,
        id: i64,
        data: &UpdateExternalUser,
    ) -> Result<ExternalUser, HttpClientError> {
        self.api
            .update_user(id, data)
            .await
            .inspect(|user| info!("Updated external user: {}", user.name))
            .inspect_err(|e| error!("Failed to update external user {}: {}", id, e))
    }

    pub async fn delete_external_user(&self, id: i64) -> Result<(), HttpClientError> {
        self.api
            .delete_user(id)
            .await
            .inspect(|_| info!("Deleted external user {}", id))
            .inspect_err(|e| error!("Failed to delete external user {}: {}", id, e))
    }

    pub async fn get_external_user_with_auth(&self, id: i64, token: &str) -> Result<ExternalUser, HttpClientError> {
        self.api
            .get_user_with_auth(id, token)
            .await
            .inspect(|user| info!("Fetched external user with auth: {}", user.name))
            .inspect_err(|e| error!("Authenticated external user fetch failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{HttpClientFactory, HttpClientService, TransportDefaults};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(base_url: &str) -> UserExternalService {
        let transport = Arc::new(HttpClientService::new(TransportDefaults {
            retry_delay: Duration::from_millis(5),
            ..TransportDefaults::default()
        }));
        let api = ExampleApiClient::new(&HttpClientFactory::new(transport), base_url).unwrap();
        UserExternalService::new(api)
    }

    #[tokio::test]
    async fn authorized_fetch_forwards_the_token() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/3"))
            .and(header("Authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 3,
                "name": "Clementine Bauch",
                "email": "Nathan@yesenia.net"
            })))
            .expect(1)
            .mount(&upstream)
            .await;

        let user = service(&upstream.uri())
            .get_external_user_with_auth(3, "Bearer secret")
            .await
            .unwrap();
        assert_eq!(user.id, 3);
        assert_eq!(user.name, "Clementine Bauch");
    }

    #[tokio::test]
    async fn rejected_token_is_returned_unchanged() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/3"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&upstream)
            .await;

        let err = service(&upstream.uri())
            .get_external_user_with_auth(3, "Bearer stale")
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(401));
    }
}
