//! PostgreSQL connection pool creation and validation.

use crate::Result;
use crate::adapters::ConnectionConfig;
use crate::adapters::config::parse_postgres_url;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};

/// Opens a pool whose sessions are configured on connect.
///
/// The pool connects eagerly, so an unreachable server or a missing database
/// is reported here rather than on first use. Every session gets the
/// configured `statement_timeout` and a `schemadiff-<version>` application
/// name; `read_only` sessions also default to read-only transactions.
pub(crate) async fn create_connection_pool(
    connection_string: &str,
    config: &ConnectionConfig,
    read_only: bool,
) -> std::result::Result<PgPool, sqlx::Error> {
    let session_setup = session_setup(config, read_only);

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(0)
        .acquire_timeout(config.connect_timeout)
        .after_connect(move |conn, _meta| {
            let session_setup = session_setup.clone();
            Box::pin(async move {
                // No bind arguments, so the batch goes out as one simple query
                conn.execute(session_setup.as_str()).await?;
                Ok(())
            })
        })
        .connect(connection_string)
        .await
}

fn session_setup(config: &ConnectionConfig, read_only: bool) -> String {
    let mut setup = format!(
        "SET statement_timeout = {}; SET application_name = 'schemadiff-{}';",
        config.statement_timeout_ms(),
        env!("CARGO_PKG_VERSION")
    );
    if read_only {
        setup.push_str(" SET default_transaction_read_only = on;");
    }
    setup
}

/// Checks that a connection string is a PostgreSQL URL with a host.
///
/// # Errors
/// Returns a configuration error (with the password redacted) otherwise
pub fn validate_connection_string(connection_string: &str) -> Result<()> {
    parse_postgres_url(connection_string, "connection string").map(|_| ())
}
