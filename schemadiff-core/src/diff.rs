//! Structural schema comparison and diff script generation.
//!
//! [`StructuralComparator`] is the bundled [`SchemaComparator`]: it compares
//! tables and columns by name and renders PostgreSQL DDL that, applied to the
//! target, makes it match the source.

use crate::adapters::SchemaComparator;
use crate::models::{Column, DatabaseSchema, Table};
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

/// A single structural difference, expressed as the change the target needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaChange {
    /// Table exists only in the source
    CreateTable { table: Table },
    /// Table exists only in the target
    DropTable { table: String },
    /// Column exists only in the source
    AddColumn { table: String, column: Column },
    /// Column exists only in the target
    DropColumn { table: String, column: String },
    /// Column exists on both sides with a different definition
    AlterColumn {
        table: String,
        from: Column,
        to: Column,
    },
}

impl SchemaChange {
    const fn kind(&self) -> &'static str {
        match self {
            Self::CreateTable { .. } => "table(s) to create",
            Self::DropTable { .. } => "table(s) to drop",
            Self::AddColumn { .. } => "column(s) to add",
            Self::DropColumn { .. } => "column(s) to drop",
            Self::AlterColumn { .. } => "column(s) to alter",
        }
    }
}

impl fmt::Display for SchemaChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateTable { table } => write!(
                f,
                "+ table {} ({} columns)",
                table.qualified_name(),
                table.columns.len()
            ),
            Self::DropTable { table } => write!(f, "- table {table}"),
            Self::AddColumn { table, column } => write!(
                f,
                "+ column {table}.{} {}",
                column.name,
                describe_column(column)
            ),
            Self::DropColumn { table, column } => write!(f, "- column {table}.{column}"),
            Self::AlterColumn { table, from, to } => write!(
                f,
                "~ column {table}.{}: {} -> {}",
                to.name,
                describe_column(from),
                describe_column(to)
            ),
        }
    }
}

fn describe_column(column: &Column) -> String {
    let mut text = column.data_type.clone();
    text.push_str(if column.is_nullable { " NULL" } else { " NOT NULL" });
    if let Some(default) = &column.default_value {
        let _ = write!(text, " DEFAULT {default}");
    }
    text
}

/// The outcome of comparing two schemas. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    changes: Vec<SchemaChange>,
    script: String,
}

impl DiffResult {
    /// Builds a result from a list of changes and the script that applies them
    pub fn new(changes: Vec<SchemaChange>, script: impl Into<String>) -> Self {
        Self {
            changes,
            script: script.into(),
        }
    }

    /// A result with no differences
    pub fn identical() -> Self {
        Self::default()
    }

    /// True if the schemas differ
    pub fn has_differences(&self) -> bool {
        !self.changes.is_empty()
    }

    /// The individual changes, in script order
    pub fn changes(&self) -> &[SchemaChange] {
        &self.changes
    }

    /// DDL that makes the target identical to the source
    pub fn script(&self) -> &str {
        &self.script
    }

    /// Human-readable summary.
    ///
    /// Terse mode gives one count per change kind; verbose mode gives one line
    /// per change.
    pub fn summarize(&self, verbose: bool) -> String {
        if self.changes.is_empty() {
            return "No differences.".to_string();
        }

        if verbose {
            return self
                .changes
                .iter()
                .map(|c| format!("  {c}"))
                .collect::<Vec<_>>()
                .join("\n");
        }

        let mut counts: Vec<(&'static str, usize)> = Vec::new();
        for change in &self.changes {
            let kind = change.kind();
            match counts.iter_mut().find(|(k, _)| *k == kind) {
                Some((_, count)) => *count = count.saturating_add(1),
                None => counts.push((kind, 1)),
            }
        }
        counts
            .iter()
            .map(|(kind, count)| format!("{count} {kind}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Compares tables and columns by name.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralComparator;

impl StructuralComparator {
    /// Creates a comparator
    pub const fn new() -> Self {
        Self
    }
}

impl SchemaComparator for StructuralComparator {
    fn compare(&self, source: &DatabaseSchema, target: &DatabaseSchema) -> DiffResult {
        let source_tables = index_tables(source);
        let target_tables = index_tables(target);

        let mut creates = Vec::new();
        let mut adds = Vec::new();
        let mut alters = Vec::new();
        let mut column_drops = Vec::new();
        let mut table_drops = Vec::new();

        for (name, source_table) in &source_tables {
            let Some(target_table) = target_tables.get(name) else {
                creates.push(SchemaChange::CreateTable {
                    table: (*source_table).clone(),
                });
                continue;
            };

            let mut source_columns: Vec<&Column> = source_table.columns.iter().collect();
            source_columns.sort_by_key(|c| c.ordinal_position);
            for column in source_columns {
                match target_table.column(&column.name) {
                    None => adds.push(SchemaChange::AddColumn {
                        table: name.clone(),
                        column: column.clone(),
                    }),
                    Some(existing) if !same_definition(existing, column) => {
                        alters.push(SchemaChange::AlterColumn {
                            table: name.clone(),
                            from: existing.clone(),
                            to: column.clone(),
                        });
                    }
                    Some(_) => {}
                }
            }

            for column in &target_table.columns {
                if source_table.column(&column.name).is_none() {
                    column_drops.push(SchemaChange::DropColumn {
                        table: name.clone(),
                        column: column.name.clone(),
                    });
                }
            }
        }

        for name in target_tables.keys() {
            if !source_tables.contains_key(name) {
                table_drops.push(SchemaChange::DropTable {
                    table: name.clone(),
                });
            }
        }

        let changes: Vec<SchemaChange> = creates
            .into_iter()
            .chain(adds)
            .chain(alters)
            .chain(column_drops)
            .chain(table_drops)
            .collect();

        if changes.is_empty() {
            return DiffResult::identical();
        }

        let script = render_script(&changes, &source_tables, &target_tables);
        DiffResult::new(changes, script)
    }
}

fn index_tables(schema: &DatabaseSchema) -> BTreeMap<String, &Table> {
    schema
        .tables
        .iter()
        .map(|t| (t.qualified_name(), t))
        .collect()
}

fn same_definition(a: &Column, b: &Column) -> bool {
    a.data_type.eq_ignore_ascii_case(&b.data_type)
        && a.is_nullable == b.is_nullable
        && a.default_value == b.default_value
}

/// Quotes an identifier, doubling embedded quotes.
pub(crate) fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn qualified(table: &Table) -> String {
    format!("{}.{}", quote_ident(&table.schema), quote_ident(&table.name))
}

fn qualified_by_key(key: &str, tables: &BTreeMap<String, &Table>) -> String {
    tables
        .get(key)
        .map_or_else(|| quote_ident(key), |t| qualified(t))
}

fn column_definition(column: &Column) -> String {
    let mut definition = format!("{} {}", quote_ident(&column.name), column.data_type);
    if let Some(default) = &column.default_value {
        let _ = write!(definition, " DEFAULT {default}");
    }
    if !column.is_nullable {
        definition.push_str(" NOT NULL");
    }
    definition
}

fn render_script(
    changes: &[SchemaChange],
    source: &BTreeMap<String, &Table>,
    target: &BTreeMap<String, &Table>,
) -> String {
    let mut script = String::from("BEGIN;\n\n");

    for change in changes {
        match change {
            SchemaChange::CreateTable { table } => {
                let mut columns: Vec<&Column> = table.columns.iter().collect();
                columns.sort_by_key(|c| c.ordinal_position);
                let body = columns
                    .iter()
                    .map(|c| format!("    {}", column_definition(c)))
                    .collect::<Vec<_>>()
                    .join(",\n");
                let _ = writeln!(script, "CREATE TABLE {} (\n{}\n);", qualified(table), body);
            }
            SchemaChange::AddColumn { table, column } => {
                let _ = writeln!(
                    script,
                    "ALTER TABLE {} ADD COLUMN {};",
                    qualified_by_key(table, source),
                    column_definition(column)
                );
            }
            SchemaChange::AlterColumn { table, from, to } => {
                let table = qualified_by_key(table, source);
                let column = quote_ident(&to.name);
                if !from.data_type.eq_ignore_ascii_case(&to.data_type) {
                    let _ = writeln!(
                        script,
                        "ALTER TABLE {table} ALTER COLUMN {column} TYPE {ty} USING {column}::{ty};",
                        ty = to.data_type
                    );
                }
                if from.default_value != to.default_value {
                    match &to.default_value {
                        Some(default) => {
                            let _ = writeln!(
                                script,
                                "ALTER TABLE {table} ALTER COLUMN {column} SET DEFAULT {default};"
                            );
                        }
                        None => {
                            let _ = writeln!(
                                script,
                                "ALTER TABLE {table} ALTER COLUMN {column} DROP DEFAULT;"
                            );
                        }
                    }
                }
                if from.is_nullable != to.is_nullable {
                    let action = if to.is_nullable {
                        "DROP NOT NULL"
                    } else {
                        "SET NOT NULL"
                    };
                    let _ = writeln!(
                        script,
                        "ALTER TABLE {table} ALTER COLUMN {column} {action};"
                    );
                }
            }
            SchemaChange::DropColumn { table, column } => {
                let _ = writeln!(
                    script,
                    "ALTER TABLE {} DROP COLUMN {};",
                    qualified_by_key(table, target),
                    quote_ident(column)
                );
            }
            SchemaChange::DropTable { table } => {
                let _ = writeln!(script, "DROP TABLE {};", qualified_by_key(table, target));
            }
        }
    }

    script.push_str("\nCOMMIT;\n");
    script
}
