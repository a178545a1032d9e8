use std::sync::Arc;

use crate::auth::SessionManager;
use crate::config::AppConfig;
use crate::database::{DatabaseManager, UserRepository};
use crate::http_client::{HttpClientError, HttpClientFactory, HttpClientService, TransportDefaults};
use crate::services::clients::ExampleApiClient;
use crate::services::{AuthService, UserExternalService, UserService};
use crate::store::SharedStore;

/// Long-lived collaborators shared by every request. Built once at startup,
/// released through [`AppState::shutdown`].
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseManager,
    pub sessions: SessionManager,
    pub http: Arc<HttpClientService>,
    pub factory: HttpClientFactory,
    pub users: UserService,
    pub auth: AuthService,
    pub user_external: UserExternalService,
}

impl AppState {
    pub fn new(config: AppConfig, db: DatabaseManager, store: SharedStore) -> Result<Self, HttpClientError> {
        let sessions = SessionManager::new(store, &config.session);
        let http = Arc::new(HttpClientService::new(TransportDefaults::from(&config.http_client)));
        let factory = HttpClientFactory::new(http.clone());

        let repo = UserRepository::new(db.pool().clone());
        let example_api = ExampleApiClient::new(&factory, &config.external.example_api_base_url)?;

        Ok(Self {
            users: UserService::new(repo.clone()),
            auth: AuthService::new(repo, sessions.clone()),
            user_external: UserExternalService::new(example_api),
            config: Arc::new(config),
            db,
            sessions,
            http,
            factory,
        })
    }

    pub async fn shutdown(&self) {
        self.http.clear_all_clients().await;
        self.db.close().await;
    }
}
