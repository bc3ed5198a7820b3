//! Ephemeral database disposal.

use super::connection::create_connection_pool;
use crate::adapters::config::{database_name, replace_database};
use crate::adapters::{ConnectionConfig, DatabaseDropper, EphemeralConfig};
use crate::diff::quote_ident;
use crate::error::{SchemaDiffError, redact_database_url};
use crate::Result;
use async_trait::async_trait;

/// Drops ephemeral databases through the server's maintenance database.
///
/// Refuses any database whose name lacks the configured ephemeral prefix,
/// so a misrouted connection string can never drop a caller's database.
#[derive(Debug, Clone)]
pub struct PostgresDatabaseDropper {
    maintenance_database: String,
    name_prefix: String,
    config: ConnectionConfig,
}

impl PostgresDatabaseDropper {
    /// Creates a dropper for databases provisioned under `ephemeral`
    pub fn new(ephemeral: &EphemeralConfig, config: ConnectionConfig) -> Self {
        Self {
            maintenance_database: ephemeral.maintenance_database.clone(),
            name_prefix: ephemeral.name_prefix.clone(),
            config,
        }
    }

    fn check_owned(&self, database: &str) -> Result<()> {
        if database.starts_with(&self.name_prefix) {
            Ok(())
        } else {
            Err(SchemaDiffError::configuration(format!(
                "refusing to drop database {database}: it does not carry the ephemeral prefix {}",
                self.name_prefix
            )))
        }
    }
}

#[async_trait]
impl DatabaseDropper for PostgresDatabaseDropper {
    async fn drop_database(&self, connection_string: &str) -> Result<()> {
        let database = database_name(connection_string)?;
        self.check_owned(&database)?;
        let admin_url = replace_database(connection_string, &self.maintenance_database)?;

        let pool = create_connection_pool(&admin_url, &self.config, false)
            .await
            .map_err(|e| SchemaDiffError::cleanup_failed(connection_string, e))?;

        // FORCE terminates sessions a failed replay may have left behind
        let statement = format!("DROP DATABASE IF EXISTS {} WITH (FORCE)", quote_ident(&database));
        let result = sqlx::raw_sql(&statement).execute(&pool).await;
        pool.close().await;

        result.map_err(|e| SchemaDiffError::cleanup_failed(connection_string, e))?;
        tracing::info!(
            "✓ Dropped ephemeral database {}",
            redact_database_url(connection_string)
        );
        Ok(())
    }
}
