//! Error types with credential sanitization.
//!
//! Connection strings that reach an error message always pass through
//! [`redact_database_url`] first, so passwords never surface in error output
//! or logs.

use crate::models::ReplayFailure;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for SchemaDiff operations.
#[derive(Debug, Error)]
pub enum SchemaDiffError {
    /// The diff script was not written because a file already exists there.
    ///
    /// The comparison itself succeeded; only the write step was blocked.
    /// `report` holds the status lines produced before the write was refused.
    #[error("{} already exists - set overwrite to true if you want to replace it", path.display())]
    OutputAlreadyExists { path: PathBuf, report: Vec<String> },

    /// Replaying a script directory into an ephemeral database failed
    #[error("{failure}")]
    Materialization { failure: ReplayFailure },

    /// A schema could not be loaded from a resolved endpoint (credentials sanitized)
    #[error("Schema load failed: {context}")]
    SchemaLoad {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Dropping an ephemeral database failed
    #[error("Cleanup failed: {context}")]
    Cleanup {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration or validation error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// I/O operation failed
    #[error("I/O operation failed: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience type alias for Results with SchemaDiffError
pub type Result<T> = std::result::Result<T, SchemaDiffError>;

/// Masks credentials in a connection string before it is shown anywhere.
///
/// Both the userinfo password and a `password` query parameter are
/// replaced. Strings that do not parse as URLs are hidden entirely.
///
/// ```rust
/// use schemadiff_core::error::redact_database_url;
///
/// assert_eq!(
///     redact_database_url("postgres://app:secret@db/shop?password=secret&sslmode=require"),
///     "postgres://app:****@db/shop?password=****&sslmode=require"
/// );
/// ```
pub fn redact_database_url(connection_string: &str) -> String {
    const MASK: &str = "****";

    let Ok(mut url) = url::Url::parse(connection_string) else {
        return "<redacted>".to_string();
    };

    if url.password().is_some() {
        let _ = url.set_password(Some(MASK));
    }

    let has_query_password = url
        .query_pairs()
        .any(|(key, _)| key.eq_ignore_ascii_case("password"));
    if has_query_password {
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(key, value)| {
                let value = if key.eq_ignore_ascii_case("password") {
                    MASK.to_string()
                } else {
                    value.into_owned()
                };
                (key.into_owned(), value)
            })
            .collect();
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }

    url.to_string()
}

impl SchemaDiffError {
    /// Creates a schema load error for the given (redacted) connection string
    pub fn schema_load_failed<E>(connection_string: &str, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::SchemaLoad {
            context: format!(
                "could not load schema from {}",
                redact_database_url(connection_string)
            ),
            source: Box::new(error),
        }
    }

    /// Creates a cleanup error for the given (redacted) connection string
    pub fn cleanup_failed<E>(connection_string: &str, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Cleanup {
            context: format!(
                "could not drop ephemeral database {}",
                redact_database_url(connection_string)
            ),
            source: Box::new(error),
        }
    }

    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an I/O error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Returns the replay failure carried by a materialization error, if any
    pub fn replay_failure(&self) -> Option<&ReplayFailure> {
        match self {
            Self::Materialization { failure } => Some(failure),
            _ => None,
        }
    }

    /// Status lines of a comparison that completed before this error.
    ///
    /// Empty for every error raised before the schemas were compared.
    pub fn report(&self) -> &[String] {
        match self {
            Self::OutputAlreadyExists { report, .. } => report,
            _ => &[],
        }
    }
}

impl From<ReplayFailure> for SchemaDiffError {
    fn from(failure: ReplayFailure) -> Self {
        Self::Materialization { failure }
    }
}
