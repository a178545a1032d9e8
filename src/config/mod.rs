use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub session: SessionConfig,
    pub http_client: HttpClientConfig,
    pub security: SecurityConfig,
    pub external: ExternalConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
    Test,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

/// Which backend holds session records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Redis,
    Memory,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub enabled: bool,
    pub backend: StoreBackend,
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: i64,
}

impl RedisConfig {
    /// `redis://[:password@]host:port/db`, password percent-encoded
    pub fn url(&self) -> String {
        match &self.password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                urlencoding::encode(password),
                self.host,
                self.port,
                self.db
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub ttl_seconds: u64,
    pub key_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpClientConfig {
    pub timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub retry_delay_ms: u64,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalConfig {
    pub example_api_base_url: String,
}

pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 7 * 24 * 3600;

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").or_else(|_| env::var("NODE_ENV")).as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            Ok("test") => Environment::Test,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
            Environment::Test => Self::test(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Redis overrides (enabled unless explicitly "false")
        if let Ok(v) = env::var("REDIS_ENABLED") {
            self.redis.enabled = v != "false";
        }
        if let Ok(v) = env::var("REDIS_HOST") {
            self.redis.host = v;
        }
        if let Ok(v) = env::var("REDIS_PORT") {
            self.redis.port = v.parse().unwrap_or(self.redis.port);
        }
        if let Ok(v) = env::var("REDIS_PASSWORD") {
            self.redis.password = Some(v).filter(|p| !p.is_empty());
        }
        if let Ok(v) = env::var("REDIS_DB") {
            self.redis.db = v.parse().unwrap_or(self.redis.db);
        }
        self.redis.backend = match env::var("SESSION_STORE").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            Ok("disabled") => StoreBackend::Disabled,
            Ok("redis") => StoreBackend::Redis,
            _ => self.redis.backend,
        };
        if !self.redis.enabled && self.redis.backend == StoreBackend::Redis {
            self.redis.backend = StoreBackend::Disabled;
        }

        // Session overrides
        if let Ok(v) = env::var("SESSION_TTL_SECONDS") {
            self.session.ttl_seconds = v
                .parse::<u64>()
                .ok()
                .filter(|ttl| *ttl > 0)
                .unwrap_or(self.session.ttl_seconds);
        }

        // Outbound HTTP overrides
        if let Ok(v) = env::var("HTTP_CLIENT_TIMEOUT_MS") {
            self.http_client.timeout_ms = v.parse().unwrap_or(self.http_client.timeout_ms);
        }
        if let Ok(v) = env::var("HTTP_CLIENT_CONNECT_TIMEOUT_MS") {
            self.http_client.connect_timeout_ms = v.parse().unwrap_or(self.http_client.connect_timeout_ms);
        }
        if let Ok(v) = env::var("HTTP_CLIENT_RETRY_DELAY_MS") {
            self.http_client.retry_delay_ms = v.parse().unwrap_or(self.http_client.retry_delay_ms);
        }
        if let Ok(v) = env::var("HTTP_CLIENT_POOL_MAX_IDLE_PER_HOST") {
            self.http_client.pool_max_idle_per_host = v.parse().unwrap_or(self.http_client.pool_max_idle_per_host);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        if let Ok(v) = env::var("EXAMPLE_API_BASE_URL") {
            self.external.example_api_base_url = v;
        }

        self
    }

    fn base(environment: Environment) -> Self {
        Self {
            environment,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            redis: RedisConfig {
                enabled: true,
                backend: StoreBackend::Redis,
                host: "127.0.0.1".to_string(),
                port: 6379,
                password: None,
                db: 0,
            },
            session: SessionConfig {
                ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
                key_prefix: "auth:token:".to_string(),
            },
            http_client: HttpClientConfig {
                timeout_ms: 30_000,
                connect_timeout_ms: 5_000,
                retry_delay_ms: 1_000,
                pool_max_idle_per_host: 32,
                pool_idle_timeout_secs: 90,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            external: ExternalConfig {
                example_api_base_url: "https://jsonplaceholder.typicode.com".to_string(),
            },
        }
    }

    fn development() -> Self {
        Self::base(Environment::Development)
    }

    fn staging() -> Self {
        let mut config = Self::base(Environment::Staging);
        config.database.max_connections = 20;
        config.database.connection_timeout = 10;
        config.security.cors_origins = vec!["https://staging.example.com".to_string()];
        config
    }

    fn production() -> Self {
        let mut config = Self::base(Environment::Production);
        config.database.max_connections = 50;
        config.database.connection_timeout = 5;
        config.http_client.pool_max_idle_per_host = 64;
        config.security.cors_origins = vec!["https://admin.example.com".to_string()];
        config
    }

    /// In-process defaults for tests: memory session store, no database URL.
    pub fn test() -> Self {
        let mut config = Self::base(Environment::Test);
        config.redis.backend = StoreBackend::Memory;
        config.http_client.retry_delay_ms = 10;
        config
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
