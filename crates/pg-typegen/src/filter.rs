//! Schema and table selection.

use std::collections::BTreeSet;

use crate::config::ListSpec;

/// Resolved include/exclude sets. Matching is exact and case-sensitive,
/// against catalog identifiers verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaFilter {
    pub include_schemas: BTreeSet<String>,
    pub exclude_schemas: BTreeSet<String>,
    pub exclude_tables: BTreeSet<String>,
}

impl SchemaFilter {
    /// Partition `schemas` into includes and `!`-prefixed excludes.
    pub fn resolve(schemas: &ListSpec, exclude: &ListSpec) -> Self {
        let mut filter = SchemaFilter::default();
        for entry in schemas.entries() {
            match entry.strip_prefix('!') {
                Some(excluded) => {
                    filter.exclude_schemas.insert(excluded.trim().to_string());
                }
                None => {
                    filter.include_schemas.insert(entry);
                }
            }
        }
        filter.exclude_tables = exclude.entries().into_iter().collect();
        filter
    }

    /// Only explicitly included, non-excluded schemas are queried.
    pub fn includes_schema(&self, schema: &str) -> bool {
        self.include_schemas.contains(schema) && !self.exclude_schemas.contains(schema)
    }

    /// Whether a table is excluded by bare name or by `schema.table`.
    pub fn excludes_table(&self, schema: &str, table: &str) -> bool {
        self.exclude_tables.contains(table)
            || self.exclude_tables.contains(&format!("{}.{}", schema, table))
    }

    /// Schemas whose constraints are fetched, in sorted order.
    pub fn queried_schemas(&self) -> Vec<String> {
        self.include_schemas
            .iter()
            .filter(|s| !self.exclude_schemas.contains(*s))
            .cloned()
            .collect()
    }

    /// Arguments for `SchemaSource::list_columns`. Qualified table excludes
    /// are left out here and applied with [`Self::excludes_table`].
    pub fn query_args(&self) -> (Vec<String>, Vec<String>, Vec<String>) {
        (
            self.queried_schemas(),
            self.exclude_schemas.iter().cloned().collect(),
            self.exclude_tables
                .iter()
                .filter(|t| !t.contains('.'))
                .cloned()
                .collect(),
        )
    }
}
