//! PostgreSQL implementations of the collaborator traits.
//!
//! # Module Structure
//! - `connection`: Pool creation and connection string validation
//! - `schema_collection`: [`PostgresSchemaLoader`], read-only catalog introspection
//! - `replay`: [`PostgresScriptRunner`], database creation and script replay
//! - `cleanup`: [`PostgresDatabaseDropper`], ephemeral database disposal
//!
//! # Guarantees
//! - Schema loading runs in read-only sessions
//! - Only databases carrying the ephemeral name prefix are ever dropped
//! - Connection strings are sanitized in error messages

mod cleanup;
mod connection;
mod replay;
mod schema_collection;

#[cfg(test)]
mod tests;

pub use cleanup::PostgresDatabaseDropper;
pub use connection::validate_connection_string;
pub use replay::PostgresScriptRunner;
pub use schema_collection::PostgresSchemaLoader;
