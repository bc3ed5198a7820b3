//! Pool and timeout settings.

use crate::error::SchemaDiffError;
use std::ops::RangeInclusive;
use std::time::Duration;

const POOL_SIZE_RANGE: RangeInclusive<u32> = 1..=100;
const MIN_QUERY_TIMEOUT: Duration = Duration::from_secs(1);

/// Pool and timeout settings shared by every database connection.
///
/// Credentials are never stored here; they stay inside the connection string.
///
/// # Example
/// ```rust
/// use schemadiff_core::adapters::ConnectionConfig;
/// use std::time::Duration;
///
/// let config = ConnectionConfig::new()
///     .with_connect_timeout(Duration::from_secs(5))
///     .with_max_connections(2);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// How long to wait for a pooled connection
    pub connect_timeout: Duration,
    /// Server-side `statement_timeout` for every session
    pub query_timeout: Duration,
    /// Pool size; a comparison never needs more than a couple
    pub max_connections: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            query_timeout: Duration::from_secs(60),
            max_connections: 2,
        }
    }
}

impl ConnectionConfig {
    /// Creates a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the connection timeout
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the per-statement timeout
    #[must_use]
    pub const fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Sets the pool size
    #[must_use]
    pub const fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Checks pool size and timeouts against the supported ranges.
    ///
    /// # Errors
    /// Returns a configuration error naming the first out-of-range setting
    pub fn validate(&self) -> crate::Result<()> {
        if !POOL_SIZE_RANGE.contains(&self.max_connections) {
            return Err(SchemaDiffError::configuration(format!(
                "max_connections must be between {} and {}, got {}",
                POOL_SIZE_RANGE.start(),
                POOL_SIZE_RANGE.end(),
                self.max_connections
            )));
        }
        if self.connect_timeout.is_zero() {
            return Err(SchemaDiffError::configuration(
                "connect_timeout cannot be zero",
            ));
        }
        if self.query_timeout < MIN_QUERY_TIMEOUT {
            return Err(SchemaDiffError::configuration(format!(
                "query_timeout must be at least {}s",
                MIN_QUERY_TIMEOUT.as_secs()
            )));
        }
        Ok(())
    }

    /// `statement_timeout` value in milliseconds, as sent to the server
    pub fn statement_timeout_ms(&self) -> u128 {
        self.query_timeout.as_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_in_range() {
        let config = ConnectionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.statement_timeout_ms(), 60_000);
    }

    #[test]
    fn test_pool_size_bounds() {
        for size in [0, 101] {
            let error = ConnectionConfig::new()
                .with_max_connections(size)
                .validate()
                .unwrap_err();
            assert!(error.to_string().contains("between 1 and 100"));
        }
        assert!(ConnectionConfig::new().with_max_connections(100).validate().is_ok());
    }

    #[test]
    fn test_timeouts_are_checked() {
        let zero_connect = ConnectionConfig::new().with_connect_timeout(Duration::ZERO);
        assert!(zero_connect.validate().is_err());

        let short_query = ConnectionConfig::new().with_query_timeout(Duration::from_millis(500));
        assert!(short_query.validate().is_err());

        let ok = ConnectionConfig::new().with_query_timeout(Duration::from_millis(1500));
        assert!(ok.validate().is_ok());
        assert_eq!(ok.statement_timeout_ms(), 1500);
    }
}
