//! Key constraint resolution.
//!
//! Constraint metadata is fetched per schema and joined client-side: each
//! key-usage row is matched to its constraint (for the kind) and, for
//! foreign keys, to the referenced-side column usage (for the target).
//! Constraint names are only unique within a schema, so both joins stay
//! inside the schema being processed.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::catalog::{
    ColumnMeta, ConstraintKind, ReferencedColumn, SchemaSource, TableIdentity,
};
use crate::config::ConstraintMatching;
use crate::error::Result;

/// A fully-qualified column reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub schema: String,
    pub table: String,
    pub column: String,
}

/// One column's participation in one key constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEdge {
    pub schema: String,
    pub table: String,
    pub column: String,
    pub role: ConstraintKind,
    pub constraint_name: String,

    /// Referenced column, for foreign keys whose target the catalog exposes.
    pub referenced: Option<ColumnRef>,
}

/// A column with its key roles. Roles are independent flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedColumn {
    pub meta: ColumnMeta,
    pub is_primary_key: bool,
    pub is_unique: bool,
    pub is_foreign_key: bool,
    pub referenced_target: Option<TableIdentity>,
}

impl AnnotatedColumn {
    /// A column with no key roles.
    pub fn plain(meta: ColumnMeta) -> Self {
        Self {
            meta,
            is_primary_key: false,
            is_unique: false,
            is_foreign_key: false,
            referenced_target: None,
        }
    }
}

/// Builds [`KeyEdge`]s from the catalog and attaches them to columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstraintResolver {
    matching: ConstraintMatching,
}

impl ConstraintResolver {
    pub fn new(matching: ConstraintMatching) -> Self {
        Self { matching }
    }

    /// Fetch key edges for each schema in turn and concatenate them.
    pub async fn resolve<S>(&self, source: &S, schemas: &[String]) -> Result<Vec<KeyEdge>>
    where
        S: SchemaSource + ?Sized,
    {
        let mut edges = Vec::new();
        for schema in schemas {
            let schema_edges = resolve_schema(source, schema).await?;
            debug!("Resolved {} key edges in schema '{}'", schema_edges.len(), schema);
            edges.extend(schema_edges);
        }
        Ok(edges)
    }

    /// Attach key roles to each column, keeping column order.
    pub fn annotate(&self, columns: Vec<ColumnMeta>, edges: &[KeyEdge]) -> Vec<AnnotatedColumn> {
        let mut index: HashMap<(&str, &str, &str), Vec<&KeyEdge>> = HashMap::new();
        for edge in edges {
            index
                .entry(self.key(&edge.schema, &edge.table, &edge.column))
                .or_default()
                .push(edge);
        }

        columns
            .into_iter()
            .map(|meta| {
                let matched: Vec<&KeyEdge> = index
                    .get(&self.key(&meta.schema, &meta.table, &meta.column))
                    .cloned()
                    .unwrap_or_default();

                let mut annotated = AnnotatedColumn::plain(meta);
                for edge in matched {
                    match edge.role {
                        ConstraintKind::PrimaryKey => annotated.is_primary_key = true,
                        ConstraintKind::Unique => annotated.is_unique = true,
                        ConstraintKind::ForeignKey => {
                            annotated.is_foreign_key = true;
                            if annotated.referenced_target.is_none() {
                                annotated.referenced_target = edge
                                    .referenced
                                    .as_ref()
                                    .map(|r| TableIdentity::new(&r.schema, &r.table));
                            }
                        }
                    }
                }
                annotated
            })
            .collect()
    }

    fn key<'a>(&self, schema: &'a str, table: &'a str, column: &'a str) -> (&'a str, &'a str, &'a str) {
        match self.matching {
            ConstraintMatching::Qualified => (schema, table, column),
            ConstraintMatching::TableColumn => ("", table, column),
        }
    }
}

/// Constraint, key-usage and column-usage triad for one schema.
async fn resolve_schema<S>(source: &S, schema: &str) -> Result<Vec<KeyEdge>>
where
    S: SchemaSource + ?Sized,
{
    let constraints = source.list_constraints(schema, &ConstraintKind::ALL).await?;
    if constraints.is_empty() {
        return Ok(Vec::new());
    }

    let kinds: HashMap<&str, ConstraintKind> = constraints
        .iter()
        .filter(|c| c.schema == schema)
        .map(|c| (c.constraint_name.as_str(), c.kind))
        .collect();
    let names: Vec<String> = kinds.keys().map(|n| n.to_string()).collect();
    let fk_names: Vec<String> = kinds
        .iter()
        .filter(|(_, kind)| **kind == ConstraintKind::ForeignKey)
        .map(|(name, _)| name.to_string())
        .collect();

    let usage = source.list_key_usage(schema, &names).await?;
    let referenced = if fk_names.is_empty() {
        Vec::new()
    } else {
        source.list_referenced_column_usage(&fk_names).await?
    };

    // First referenced row per constraint of this schema. Composite keys
    // always reference a single table, which is all branding needs.
    let mut targets: HashMap<&str, &ReferencedColumn> = HashMap::new();
    for r in referenced.iter().filter(|r| r.constraint_schema == schema) {
        targets.entry(r.constraint_name.as_str()).or_insert(r);
    }

    let mut edges = Vec::with_capacity(usage.len());
    for u in usage {
        let Some(&role) = kinds.get(u.constraint_name.as_str()) else {
            debug!("Skipping key usage for unknown constraint {}", u.constraint_name);
            continue;
        };

        let referenced = match role {
            ConstraintKind::ForeignKey => {
                let target = targets.get(u.constraint_name.as_str()).map(|r| ColumnRef {
                    schema: r.schema.clone(),
                    table: r.table.clone(),
                    column: r.column.clone(),
                });
                if target.is_none() {
                    warn!(
                        "No referenced column visible for foreign key {}.{}; {}.{} will not be branded",
                        schema, u.constraint_name, u.table, u.column
                    );
                }
                target
            }
            _ => None,
        };

        edges.push(KeyEdge {
            schema: u.schema,
            table: u.table,
            column: u.column,
            role,
            constraint_name: u.constraint_name,
            referenced,
        });
    }

    Ok(edges)
}
