//! Logging setup for the SchemaDiff binaries.
//!
//! Logs go to stderr so that stdout carries only the comparison report (or
//! its JSON form). Dependency crates such as sqlx are held at `warn` unless
//! `RUST_LOG` says otherwise.

use crate::Result;
use crate::error::SchemaDiffError;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// How log events are rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable single-line events
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Verbosity and format chosen on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogSettings {
    pub verbose: u8,
    pub quiet: bool,
    pub format: LogFormat,
}

impl LogSettings {
    pub const fn new(verbose: u8, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            format: LogFormat::Text,
        }
    }

    #[must_use]
    pub const fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Level applied to SchemaDiff's own crates. `quiet` wins over `verbose`.
    pub const fn level(&self) -> Level {
        match (self.quiet, self.verbose) {
            (true, _) => Level::ERROR,
            (false, 0) => Level::INFO,
            (false, 1) => Level::DEBUG,
            (false, _) => Level::TRACE,
        }
    }

    /// Filter directives used when `RUST_LOG` is unset
    pub fn directives(&self) -> String {
        let level = self.level().as_str().to_ascii_lowercase();
        if self.quiet {
            return level;
        }
        format!("warn,schemadiff={level},schemadiff_core={level}")
    }
}

/// Installs the global subscriber for the given verbosity flags.
///
/// # Example
/// ```rust,no_run
/// use schemadiff_core::logging::init_logging;
///
/// init_logging(1, false).expect("Failed to initialize logging");
/// ```
///
/// # Errors
/// Returns a configuration error if a global subscriber is already set
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    init_with(&LogSettings::new(verbose, quiet))
}

/// Installs the global subscriber described by `settings`.
///
/// # Errors
/// Returns a configuration error if a global subscriber is already set
pub fn init_with(settings: &LogSettings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.directives()));
    let show_targets = settings.verbose >= 2;

    let installed = match settings.format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(show_targets)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_current_span(false)
            .try_init(),
    };

    installed.map_err(|e| SchemaDiffError::configuration(format!("Failed to initialize logging: {e}")))
}
