//! Storage implementations.
//!
//! - `sql`: PostgreSQL and SQLite stores for both roles; Cloud Spanner via
//!   its PostgreSQL interface
//! - `mock`: in-memory stores for tests

use std::sync::Arc;

use tracing::info;

use crate::config::{PrimaryConfig, PrimaryType, SecondaryConfig, SecondaryType, StorageConfig};
use crate::interfaces::{PrimaryStore, SecondaryStore};

pub mod helpers;

#[cfg(any(feature = "postgres", feature = "sqlite"))]
pub mod schema;

#[cfg(any(feature = "postgres", feature = "sqlite"))]
pub mod sql;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use crate::interfaces::{Result, StoreError};

#[cfg(feature = "postgres")]
pub use sql::postgres::{PostgresPrimaryStore, SpannerSecondaryStore};

#[cfg(feature = "sqlite")]
pub use sql::sqlite::{SqlitePrimaryStore, SqliteSecondaryStore};

#[cfg(any(test, feature = "test-utils"))]
pub use mock::{Call, CallLog, MockOp, MockPrimaryStore, MockSecondaryStore, StoreRole};

/// Initialize both stores based on configuration.
///
/// Returns tuple of (PrimaryStore, SecondaryStore) implementations based on
/// the configured storage types.
pub async fn init_stores(
    config: &StorageConfig,
) -> std::result::Result<(Arc<dyn PrimaryStore>, Arc<dyn SecondaryStore>), Box<dyn std::error::Error>>
{
    let primary = init_primary(&config.primary, config.timeouts.connect()).await?;
    let secondary = init_secondary(&config.secondary, config.timeouts.connect()).await?;
    Ok((primary, secondary))
}

#[cfg_attr(
    not(any(feature = "postgres", feature = "sqlite")),
    allow(unused_variables)
)]
async fn init_primary(
    config: &PrimaryConfig,
    connect_timeout: std::time::Duration,
) -> std::result::Result<Arc<dyn PrimaryStore>, Box<dyn std::error::Error>> {
    info!(storage_type = ?config.storage_type, "Connecting primary store");

    match config.storage_type {
        #[cfg(feature = "postgres")]
        PrimaryType::Postgres => {
            let pool = connect::postgres("primary", config, connect_timeout).await?;
            let store = PostgresPrimaryStore::new(pool);
            if config.init_schema {
                store.init().await?;
            }
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "postgres"))]
        PrimaryType::Postgres => {
            tracing::error!("PostgreSQL primary requested but 'postgres' feature is not enabled");
            Err("PostgreSQL feature not enabled".into())
        }
        #[cfg(feature = "sqlite")]
        PrimaryType::Sqlite => {
            let pool = connect::sqlite("primary", config, connect_timeout).await?;
            let store = SqlitePrimaryStore::new(pool);
            if config.init_schema {
                store.init().await?;
            }
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "sqlite"))]
        PrimaryType::Sqlite => {
            tracing::error!("SQLite primary requested but 'sqlite' feature is not enabled");
            Err("SQLite feature not enabled".into())
        }
    }
}

#[cfg_attr(
    not(any(feature = "postgres", feature = "sqlite")),
    allow(unused_variables)
)]
async fn init_secondary(
    config: &SecondaryConfig,
    connect_timeout: std::time::Duration,
) -> std::result::Result<Arc<dyn SecondaryStore>, Box<dyn std::error::Error>> {
    info!(storage_type = ?config.storage_type, "Connecting secondary store");

    match config.storage_type {
        #[cfg(feature = "spanner")]
        SecondaryType::Spanner => {
            let pool = connect::postgres("secondary", config, connect_timeout).await?;
            let store = SpannerSecondaryStore::new(pool);
            if config.init_schema {
                store.init().await?;
            }
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "spanner"))]
        SecondaryType::Spanner => {
            tracing::error!("Spanner secondary requested but 'spanner' feature is not enabled");
            Err("Spanner feature not enabled".into())
        }
        #[cfg(feature = "sqlite")]
        SecondaryType::Sqlite => {
            let pool = connect::sqlite("secondary", config, connect_timeout).await?;
            let store = SqliteSecondaryStore::new(pool);
            if config.init_schema {
                store.init().await?;
            }
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "sqlite"))]
        SecondaryType::Sqlite => {
            tracing::error!("SQLite secondary requested but 'sqlite' feature is not enabled");
            Err("SQLite feature not enabled".into())
        }
    }
}

/// Connection settings shared by both roles.
trait PoolSettings {
    fn uri(&self) -> &str;
    fn max_connections(&self) -> u32;
}

impl PoolSettings for PrimaryConfig {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn max_connections(&self) -> u32 {
        self.max_connections
    }
}

impl PoolSettings for SecondaryConfig {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn max_connections(&self) -> u32 {
        self.max_connections
    }
}

#[cfg(any(feature = "postgres", feature = "sqlite"))]
mod connect {
    //! Pool construction with startup retry.

    use std::time::Duration;

    use backon::Retryable;
    use tracing::{info, warn};

    use super::helpers::classify;
    use super::PoolSettings;
    use crate::utils::retry::connection_backoff;

    fn retryable(err: &sqlx::Error) -> bool {
        classify(err).is_retryable()
    }

    #[cfg(feature = "postgres")]
    pub(super) async fn postgres(
        role: &'static str,
        settings: &impl PoolSettings,
        acquire_timeout: Duration,
    ) -> Result<sqlx::PgPool, sqlx::Error> {
        let options = sqlx::postgres::PgPoolOptions::new()
            .max_connections(settings.max_connections())
            .acquire_timeout(acquire_timeout);
        let uri = settings.uri();

        let pool = (|| options.clone().connect(uri))
            .retry(connection_backoff())
            .when(retryable)
            .notify(|err: &sqlx::Error, dur: Duration| {
                warn!(role, error = %err, "Store connection failed, retrying in {:?}", dur);
            })
            .await?;
        info!(role, "Connected to PostgreSQL");
        Ok(pool)
    }

    #[cfg(feature = "sqlite")]
    pub(super) async fn sqlite(
        role: &'static str,
        settings: &impl PoolSettings,
        acquire_timeout: Duration,
    ) -> Result<sqlx::SqlitePool, sqlx::Error> {
        use super::helpers::{is_sqlite_memory, sqlite_file_path};

        let uri = settings.uri();
        if let Some(parent) = sqlite_file_path(uri)
            .as_deref()
            .and_then(std::path::Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
        {
            std::fs::create_dir_all(parent)?;
        }

        // Each connection to an in-memory database opens a fresh one.
        let options = if is_sqlite_memory(uri) {
            sqlx::sqlite::SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            sqlx::sqlite::SqlitePoolOptions::new().max_connections(settings.max_connections())
        }
        .acquire_timeout(acquire_timeout);

        let pool = (|| options.clone().connect(uri))
            .retry(connection_backoff())
            .when(retryable)
            .notify(|err: &sqlx::Error, dur: Duration| {
                warn!(role, error = %err, "Store connection failed, retrying in {:?}", dur);
            })
            .await?;
        info!(role, "Connected to SQLite");
        Ok(pool)
    }
}
