//! Ephemeral database provisioning settings.

use crate::error::{SchemaDiffError, redact_database_url};
use url::Url;
use uuid::Uuid;

/// Longest database name PostgreSQL accepts without truncation.
const MAX_IDENTIFIER_LEN: usize = 63;
/// Length of a UUID rendered without hyphens.
const UUID_SIMPLE_LEN: usize = 32;

/// Where ephemeral databases are created and how they are named.
///
/// # Example
/// ```rust
/// use schemadiff_core::adapters::EphemeralConfig;
///
/// let config = EphemeralConfig::new("postgres://postgres@localhost:5432")
///     .with_name_prefix("ci_");
///
/// let url = config.connection_string_for("ci_0123").unwrap();
/// assert_eq!(url, "postgres://postgres@localhost:5432/ci_0123");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EphemeralConfig {
    /// Server on which ephemeral databases are created (any path is ignored)
    pub server_url: String,
    /// Database used for CREATE/DROP DATABASE statements
    pub maintenance_database: String,
    /// Prepended to the generated identifier to form the database name
    pub name_prefix: String,
}

impl Default for EphemeralConfig {
    fn default() -> Self {
        Self {
            server_url: "postgres://localhost:5432".to_string(),
            maintenance_database: "postgres".to_string(),
            name_prefix: "schemadiff_".to_string(),
        }
    }
}

impl EphemeralConfig {
    /// Creates a configuration targeting `server_url`
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Self::default()
        }
    }

    /// Sets the maintenance database
    #[must_use]
    pub fn with_maintenance_database(mut self, database: impl Into<String>) -> Self {
        self.maintenance_database = database.into();
        self
    }

    /// Sets the database name prefix
    #[must_use]
    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    /// Builds a database name from a unique identifier.
    ///
    /// The identifier is rendered without hyphens so the name is a plain
    /// identifier.
    pub fn database_name(&self, id: Uuid) -> String {
        format!("{}{}", self.name_prefix, id.simple())
    }

    /// Connection string for the named database on the configured server
    ///
    /// # Errors
    /// Returns a configuration error if the server URL does not parse
    pub fn connection_string_for(&self, database: &str) -> crate::Result<String> {
        replace_database(&self.server_url, database)
    }

    /// Connection string for the maintenance database
    ///
    /// # Errors
    /// Returns a configuration error if the server URL does not parse
    pub fn maintenance_connection_string(&self) -> crate::Result<String> {
        replace_database(&self.server_url, &self.maintenance_database)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns a configuration error if the server URL is not a postgres URL
    /// with a host, or if the prefix would produce an invalid database name
    pub fn validate(&self) -> crate::Result<()> {
        parse_postgres_url(&self.server_url, "ephemeral server URL")?;

        if self.maintenance_database.trim().is_empty() {
            return Err(SchemaDiffError::configuration(
                "maintenance database cannot be empty",
            ));
        }

        validate_prefix(&self.name_prefix)
    }
}

fn validate_prefix(prefix: &str) -> crate::Result<()> {
    if prefix.len().saturating_add(UUID_SIMPLE_LEN) > MAX_IDENTIFIER_LEN {
        return Err(SchemaDiffError::configuration(format!(
            "name prefix too long: maximum {} characters",
            MAX_IDENTIFIER_LEN.saturating_sub(UUID_SIMPLE_LEN)
        )));
    }

    // The UUID part may start with a digit, so an empty prefix would not
    // form a valid unquoted identifier.
    let Some(first) = prefix.chars().next() else {
        return Err(SchemaDiffError::configuration(
            "name prefix cannot be empty",
        ));
    };
    if !first.is_ascii_lowercase() && first != '_' {
        return Err(SchemaDiffError::configuration(
            "name prefix must start with a lowercase letter or underscore",
        ));
    }
    if !prefix
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(SchemaDiffError::configuration(
            "name prefix may only contain lowercase letters, digits and underscores",
        ));
    }

    Ok(())
}

/// Parses `connection_string` and checks it is a postgres URL with a host.
///
/// `what` names the value in error messages.
pub(crate) fn parse_postgres_url(connection_string: &str, what: &str) -> crate::Result<Url> {
    let url = Url::parse(connection_string).map_err(|e| {
        SchemaDiffError::configuration(format!(
            "{what} {} is not a valid URL: {e}",
            redact_database_url(connection_string)
        ))
    })?;
    if !matches!(url.scheme(), "postgres" | "postgresql") {
        return Err(SchemaDiffError::configuration(format!(
            "{what} must use the postgres:// or postgresql:// scheme, not {}://",
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(SchemaDiffError::configuration(format!(
            "{what} {} has no host",
            redact_database_url(connection_string)
        )));
    }
    Ok(url)
}

/// Returns `connection_string` with its database path replaced by `database`.
pub(crate) fn replace_database(connection_string: &str, database: &str) -> crate::Result<String> {
    let mut url = Url::parse(connection_string).map_err(|e| {
        SchemaDiffError::configuration(format!(
            "Invalid connection string {}: {}",
            redact_database_url(connection_string),
            e
        ))
    })?;
    url.set_path(&format!("/{database}"));
    Ok(url.to_string())
}

/// Extracts the database name from a connection string's path.
pub(crate) fn database_name(connection_string: &str) -> crate::Result<String> {
    let url = Url::parse(connection_string).map_err(|e| {
        SchemaDiffError::configuration(format!(
            "Invalid connection string {}: {}",
            redact_database_url(connection_string),
            e
        ))
    })?;
    let name = url.path().trim_start_matches('/');
    if name.is_empty() {
        return Err(SchemaDiffError::configuration(format!(
            "connection string {} does not name a database",
            redact_database_url(connection_string)
        )));
    }
    Ok(name.to_string())
}
