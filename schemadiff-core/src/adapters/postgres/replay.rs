//! Script directory replay.
//!
//! Scripts are discovered recursively (`*.sql`, any case) and replayed in
//! relative-path order. Files that fail are retried in further passes as
//! long as each pass gets at least one more file through, which resolves
//! most cross-file dependencies without a dependency graph. When a pass
//! makes no progress the remaining failures are reported as a partial
//! failure, in replay order.

use super::connection::create_connection_pool;
use crate::adapters::config::{database_name, replace_database};
use crate::adapters::{ConnectionConfig, EphemeralConfig, ScriptRunner};
use crate::diff::quote_ident;
use crate::models::{FileError, ReplayFailure};
use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::{PgDatabaseError, PgErrorPosition};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One discovered script: its path on disk and its display name relative to
/// the replayed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScriptFile {
    pub(crate) path: PathBuf,
    pub(crate) relative_name: String,
}

/// Creates ephemeral databases and replays script directories into them.
#[derive(Debug, Clone)]
pub struct PostgresScriptRunner {
    maintenance_database: String,
    config: ConnectionConfig,
}

impl PostgresScriptRunner {
    /// Creates a runner for databases provisioned under `ephemeral`
    pub fn new(ephemeral: &EphemeralConfig, config: ConnectionConfig) -> Self {
        Self {
            maintenance_database: ephemeral.maintenance_database.clone(),
            config,
        }
    }

    async fn create_database(&self, connection_string: &str) -> Result<(), ReplayFailure> {
        let database = database_name(connection_string).map_err(aborted)?;
        let admin_url =
            replace_database(connection_string, &self.maintenance_database).map_err(aborted)?;

        let pool = create_connection_pool(&admin_url, &self.config, false)
            .await
            .map_err(|e| aborted(format!("could not connect to the ephemeral server: {e}")))?;
        let result = sqlx::raw_sql(&format!("CREATE DATABASE {}", quote_ident(&database)))
            .execute(&pool)
            .await;
        pool.close().await;

        result.map_err(|e| aborted(format!("could not create database {database}: {e}")))?;
        debug!("Created ephemeral database {}", database);
        Ok(())
    }
}

#[async_trait]
impl ScriptRunner for PostgresScriptRunner {
    async fn materialize(
        &self,
        directory: &Path,
        connection_string: &str,
    ) -> Result<(), ReplayFailure> {
        let scripts = discover_scripts(directory).await.map_err(|e| {
            aborted(format!(
                "could not read script directory {}: {e}",
                directory.display()
            ))
        })?;
        info!("Found {} script(s) in {}", scripts.len(), directory.display());

        self.create_database(connection_string).await?;

        let pool = create_connection_pool(connection_string, &self.config, false)
            .await
            .map_err(|e| aborted(format!("could not connect to the ephemeral database: {e}")))?;
        let result = replay(&pool, scripts).await;
        pool.close().await;
        result
    }
}

/// Runs passes over `pending` until everything succeeds or a pass stalls.
async fn replay(pool: &PgPool, mut pending: Vec<ScriptFile>) -> Result<(), ReplayFailure> {
    let mut pass: u32 = 1;
    loop {
        let mut failed = Vec::new();
        let mut errors = Vec::new();
        let attempted = pending.len();

        for script in pending {
            match run_script(pool, &script).await? {
                None => debug!("✓ {}", script.relative_name),
                Some(error) => {
                    debug!("Pass {} failed {}: {}", pass, script.relative_name, error.message);
                    errors.push(error);
                    failed.push(script);
                }
            }
        }

        if failed.is_empty() {
            return Ok(());
        }
        if failed.len() == attempted {
            warn!("{} script(s) could not be replayed", errors.len());
            return Err(ReplayFailure::partial(errors));
        }

        debug!("Retrying {} script(s) after pass {}", failed.len(), pass);
        pending = failed;
        pass = pass.saturating_add(1);
    }
}

/// Runs one script.
///
/// Returns `Ok(Some(_))` for a failure scoped to this file and `Err(_)` when
/// replay cannot continue at all.
async fn run_script(pool: &PgPool, script: &ScriptFile) -> Result<Option<FileError>, ReplayFailure> {
    let content = match tokio::fs::read_to_string(&script.path).await {
        Ok(content) => content,
        Err(e) => {
            return Ok(Some(FileError {
                file_name: Some(script.relative_name.clone()),
                line_number: None,
                message: format!("could not read script: {e}"),
            }));
        }
    };

    match sqlx::raw_sql(&content).execute(pool).await {
        Ok(_) => Ok(None),
        Err(sqlx::Error::Database(db_error)) => {
            let line = db_error
                .try_downcast_ref::<PgDatabaseError>()
                .and_then(|pg| match pg.position() {
                    Some(PgErrorPosition::Original(position)) => {
                        Some(line_at_position(&content, position))
                    }
                    _ => None,
                });
            Ok(Some(FileError {
                file_name: Some(script.relative_name.clone()),
                line_number: line,
                message: db_error.message().to_string(),
            }))
        }
        Err(e) => Err(ReplayFailure::aborted(FileError {
            file_name: Some(script.relative_name.clone()),
            line_number: None,
            message: e.to_string(),
        })),
    }
}

/// Converts a 1-based character position into a 1-based line number.
pub(crate) fn line_at_position(content: &str, position: usize) -> u32 {
    let newlines = content
        .chars()
        .take(position.saturating_sub(1))
        .filter(|&c| c == '\n')
        .count();
    u32::try_from(newlines.saturating_add(1)).unwrap_or(u32::MAX)
}

/// Lists every `.sql` file under `directory`, sorted by relative path.
pub(crate) async fn discover_scripts(directory: &Path) -> std::io::Result<Vec<ScriptFile>> {
    let mut scripts = Vec::new();
    let mut stack = vec![directory.to_path_buf()];

    while let Some(current) = stack.pop() {
        let mut entries = tokio::fs::read_dir(&current).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;

            if file_type.is_dir() {
                stack.push(path);
            } else if file_type.is_file() && is_sql_file(&path) {
                let relative_name = path
                    .strip_prefix(directory)
                    .unwrap_or(&path)
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                scripts.push(ScriptFile {
                    path,
                    relative_name,
                });
            }
        }
    }

    scripts.sort_by(|a, b| a.relative_name.cmp(&b.relative_name));
    Ok(scripts)
}

fn is_sql_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"))
}

fn aborted(message: impl ToString) -> ReplayFailure {
    ReplayFailure::aborted(FileError::unattributed(message.to_string()))
}
