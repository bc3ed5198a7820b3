//! Configuration types for database connections and ephemeral databases.
//!
//! # Module Structure
//! - `connection`: Pool and timeout settings for every connection
//! - `ephemeral`: Where and how ephemeral databases are provisioned

mod connection;
mod ephemeral;

pub use connection::ConnectionConfig;
pub use ephemeral::EphemeralConfig;

#[cfg(feature = "postgresql")]
pub(crate) use ephemeral::{database_name, parse_postgres_url, replace_database};
