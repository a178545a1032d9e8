use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Persistence errors, already translated out of driver shapes where a
/// business meaning exists
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidReference(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        let translated = match &err {
            sqlx::Error::RowNotFound => Some(DatabaseError::NotFound("Record not found".to_string())),
            sqlx::Error::Database(db) => {
                let code = db.code().map(|c| c.into_owned());
                match code.as_deref() {
                    // unique_violation
                    Some("23505") => Some(DatabaseError::Conflict(format!(
                        "{} already exists",
                        constraint_subject(db.constraint())
                    ))),
                    // foreign_key_violation
                    Some("23503") => Some(DatabaseError::InvalidReference(
                        "Referenced record does not exist".to_string(),
                    )),
                    // not_null_violation, check_violation
                    Some("23502") | Some("23514") => Some(DatabaseError::Validation(
                        "Record failed validation".to_string(),
                    )),
                    _ => None,
                }
            }
            _ => None,
        };
        translated.unwrap_or(DatabaseError::Sqlx(err))
    }
}

/// `users_email_key` -> `email`
fn constraint_subject(constraint: Option<&str>) -> String {
    let Some(name) = constraint else {
        return "Record".to_string();
    };
    let trimmed = name.trim_end_matches("_key").trim_end_matches("_unique");
    trimmed
        .split_once('_')
        .map(|(_, column)| column)
        .unwrap_or(trimmed)
        .to_string()
}

/// Owns the process-wide connection pool. Constructed once at startup and
/// handed to repositories; closed on shutdown.
#[derive(Clone, Debug)]
pub struct DatabaseManager {
    pool: PgPool,
}

impl DatabaseManager {
    /// Connect eagerly, failing if the database is unreachable
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let url = config.url.as_deref().ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;
        let pool = Self::pool_options(config).connect(url).await?;
        info!("Connected database pool (max {} connections)", config.max_connections);
        Ok(Self { pool })
    }

    /// Build the pool without opening a connection
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let url = config.url.as_deref().ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;
        let pool = Self::pool_options(config).connect_lazy(url)?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }

    fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
    }
}
