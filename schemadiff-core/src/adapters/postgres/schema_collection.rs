//! PostgreSQL schema collection.
//!
//! Reads tables and columns straight from `pg_catalog` so column types keep
//! their modifiers (`character varying(255)`, `numeric(10,2)`).

use super::connection::{create_connection_pool, validate_connection_string};
use crate::adapters::{ConnectionConfig, SchemaLoader};
use crate::error::{SchemaDiffError, redact_database_url};
use crate::models::{Column, DatabaseSchema, Table};
use crate::Result;
use async_trait::async_trait;
use sqlx::{PgPool, Row};

const COLUMNS_QUERY: &str = r"
    SELECT
        n.nspname AS table_schema,
        c.relname AS table_name,
        a.attname AS column_name,
        format_type(a.atttypid, a.atttypmod) AS data_type,
        NOT a.attnotnull AS is_nullable,
        pg_get_expr(d.adbin, d.adrelid) AS column_default,
        a.attnum::int4 AS ordinal_position
    FROM pg_catalog.pg_class c
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    LEFT JOIN pg_catalog.pg_attribute a
        ON a.attrelid = c.oid AND a.attnum > 0 AND NOT a.attisdropped
    LEFT JOIN pg_catalog.pg_attrdef d
        ON d.adrelid = c.oid AND d.adnum = a.attnum
    WHERE c.relkind IN ('r', 'p')
      AND n.nspname NOT IN ('pg_catalog', 'information_schema')
      AND n.nspname NOT LIKE 'pg_toast%'
      AND n.nspname NOT LIKE 'pg_temp_%'
    ORDER BY n.nspname, c.relname, a.attnum
";

/// Loads schemas from PostgreSQL databases in read-only sessions.
#[derive(Debug, Clone, Default)]
pub struct PostgresSchemaLoader {
    config: ConnectionConfig,
}

impl PostgresSchemaLoader {
    /// Creates a loader using `config` for every connection
    pub const fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SchemaLoader for PostgresSchemaLoader {
    async fn load(&self, connection_string: &str) -> Result<DatabaseSchema> {
        validate_connection_string(connection_string)?;

        let pool = create_connection_pool(connection_string, &self.config, true)
            .await
            .map_err(|e| SchemaDiffError::schema_load_failed(connection_string, e))?;

        let result = collect_schema(&pool).await;
        pool.close().await;

        let schema =
            result.map_err(|e| SchemaDiffError::schema_load_failed(connection_string, e))?;
        tracing::info!(
            "Loaded {} tables from {}",
            schema.tables.len(),
            redact_database_url(connection_string)
        );
        Ok(schema)
    }
}

async fn collect_schema(pool: &PgPool) -> std::result::Result<DatabaseSchema, sqlx::Error> {
    let database_name: String = sqlx::query_scalar("SELECT current_database()")
        .fetch_one(pool)
        .await?;

    let rows = sqlx::query(COLUMNS_QUERY).fetch_all(pool).await?;
    tracing::debug!("Catalog query returned {} rows", rows.len());

    let mut tables: Vec<Table> = Vec::new();
    for row in rows {
        let schema: String = row.try_get("table_schema")?;
        let name: String = row.try_get("table_name")?;

        let is_same_table = tables
            .last()
            .is_some_and(|t| t.schema == schema && t.name == name);
        if !is_same_table {
            tables.push(Table::new(schema, name));
        }

        // Tables without columns come back as a single row of NULLs
        let Some(column_name) = row.try_get::<Option<String>, _>("column_name")? else {
            continue;
        };
        let ordinal: i32 = row.try_get::<Option<i32>, _>("ordinal_position")?.unwrap_or(0);

        let column = Column {
            name: column_name,
            data_type: row
                .try_get::<Option<String>, _>("data_type")?
                .unwrap_or_default(),
            is_nullable: row.try_get::<Option<bool>, _>("is_nullable")?.unwrap_or(true),
            default_value: row.try_get("column_default")?,
            ordinal_position: u32::try_from(ordinal).unwrap_or(0),
        };

        if let Some(table) = tables.last_mut() {
            table.columns.push(column);
        }
    }

    Ok(DatabaseSchema {
        database_name: Some(database_name),
        tables,
    })
}
