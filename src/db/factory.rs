//! Repository construction from runtime configuration.
//!
//! Backend selection lives in [`crate::config::StoreConfig`] (file) and
//! [`crate::config::StoreBackend`] (environment); this module turns a
//! selection into a ready `Arc<dyn FullRepository>`.

use std::path::Path;
use std::sync::Arc;

use crate::config::{StoreBackend, StoreConfig};

use super::repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
use super::repositories::PostgresRepository;
use super::repository::{FullRepository, RepositoryResult};
#[cfg(not(feature = "postgres-repo"))]
use super::repository::RepositoryError;
#[cfg(feature = "postgres-repo")]
use super::PostgresConfig;

pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Create an in-memory local repository.
    pub fn create_local() -> Arc<dyn FullRepository> {
        Arc::new(LocalRepository::new())
    }

    /// Create a Postgres repository, running pending migrations.
    #[cfg(feature = "postgres-repo")]
    pub async fn create_postgres(
        config: &PostgresConfig,
    ) -> RepositoryResult<Arc<PostgresRepository>> {
        let repo = PostgresRepository::new(config.clone())?;
        Ok(Arc::new(repo))
    }

    /// Create the repository selected by the environment: Postgres when a
    /// database URL (or `REPOSITORY_TYPE=postgres`) is set, local
    /// otherwise.
    pub async fn from_env() -> RepositoryResult<Arc<dyn FullRepository>> {
        match StoreBackend::from_env() {
            StoreBackend::Local => Ok(Self::create_local()),
            StoreBackend::Postgres => {
                #[cfg(feature = "postgres-repo")]
                {
                    let config = PostgresConfig::from_env()
                        .map_err(super::repository::RepositoryError::configuration)?;
                    let pg = Self::create_postgres(&config).await?;
                    Ok(pg as Arc<dyn FullRepository>)
                }
                #[cfg(not(feature = "postgres-repo"))]
                {
                    Err(RepositoryError::configuration(
                        "Postgres repository feature not enabled",
                    ))
                }
            }
        }
    }

    /// Create the repository described by a [`StoreConfig`].
    pub async fn from_store_config(
        config: &StoreConfig,
    ) -> RepositoryResult<Arc<dyn FullRepository>> {
        match config.backend {
            StoreBackend::Local => Ok(Self::create_local()),
            StoreBackend::Postgres => {
                #[cfg(feature = "postgres-repo")]
                {
                    if config.postgres.database_url.is_empty() {
                        return Err(super::repository::RepositoryError::configuration(
                            "Postgres backend requires 'postgres.database_url'",
                        ));
                    }
                    let pg_config = PostgresConfig {
                        database_url: config.postgres.database_url.clone(),
                        max_pool_size: config.postgres.max_connections,
                        min_pool_size: config.postgres.min_connections,
                        connection_timeout_sec: config.postgres.connect_timeout,
                        idle_timeout_sec: config.postgres.idle_timeout,
                        max_retries: config.postgres.max_retries,
                        retry_delay_ms: config.postgres.retry_delay_ms,
                    };
                    let pg = Self::create_postgres(&pg_config).await?;
                    Ok(pg as Arc<dyn FullRepository>)
                }
                #[cfg(not(feature = "postgres-repo"))]
                {
                    Err(RepositoryError::configuration(
                        "Postgres repository feature not enabled",
                    ))
                }
            }
        }
    }

    /// Create the repository from a `fieldops.toml` at `config_path`.
    pub async fn from_config_file<P: AsRef<Path>>(
        config_path: P,
    ) -> RepositoryResult<Arc<dyn FullRepository>> {
        let config = StoreConfig::from_file(config_path)
            .map_err(super::repository::RepositoryError::configuration)?;
        Self::from_store_config(&config).await
    }

    /// Create the repository from `fieldops.toml` in a standard location.
    pub async fn from_default_config() -> RepositoryResult<Arc<dyn FullRepository>> {
        let config = StoreConfig::from_default_location()
            .map_err(super::repository::RepositoryError::configuration)?;
        Self::from_store_config(&config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_backend_from_store_config() {
        let config = StoreConfig::default();
        let repo = RepositoryFactory::from_store_config(&config).await.unwrap();
        assert!(repo.health_check().await.unwrap());
    }

    #[cfg(not(feature = "postgres-repo"))]
    #[tokio::test]
    async fn postgres_backend_requires_the_feature() {
        let config = StoreConfig {
            backend: crate::config::StoreBackend::Postgres,
            ..Default::default()
        };
        assert!(RepositoryFactory::from_store_config(&config).await.is_err());
    }
}
