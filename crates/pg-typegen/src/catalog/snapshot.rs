//! Recorded catalog snapshots.
//!
//! A snapshot is the raw answer set of every catalog query a run makes,
//! stored as JSON. Replaying it through [`SnapshotSource`] gives the same
//! declarations as the live catalog it was captured from.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{
    ColumnMeta, ConstraintInfo, ConstraintKind, EnumMember, KeyUsage, ReferencedColumn,
    SchemaSource,
};
use crate::error::Result;
use crate::filter::SchemaFilter;

/// Every catalog row a generation run can ask for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub enums: Vec<EnumMember>,

    #[serde(default)]
    pub columns: Vec<ColumnMeta>,

    #[serde(default)]
    pub constraints: Vec<ConstraintInfo>,

    #[serde(default)]
    pub key_usage: Vec<KeyUsage>,

    #[serde(default)]
    pub referenced_columns: Vec<ReferencedColumn>,
}

impl CatalogSnapshot {
    /// Load a snapshot from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse a snapshot from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Save the snapshot as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Record everything a run with `filter` would read from `source`.
    pub async fn capture<S>(source: &S, filter: &SchemaFilter) -> Result<Self>
    where
        S: SchemaSource + ?Sized,
    {
        let (include, exclude, exclude_tables) = filter.query_args();
        let enums = source.list_enum_members().await?;
        let columns = source
            .list_columns(&include, &exclude, &exclude_tables)
            .await?
            .into_iter()
            .filter(|c| !filter.excludes_table(&c.schema, &c.table))
            .collect();

        let mut snapshot = CatalogSnapshot {
            enums,
            columns,
            ..Default::default()
        };

        for schema in &include {
            let constraints = source.list_constraints(schema, &ConstraintKind::ALL).await?;
            let names: Vec<String> = constraints
                .iter()
                .map(|c| c.constraint_name.clone())
                .collect();
            let fk_names: Vec<String> = constraints
                .iter()
                .filter(|c| c.kind == ConstraintKind::ForeignKey)
                .map(|c| c.constraint_name.clone())
                .collect();

            if !names.is_empty() {
                snapshot
                    .key_usage
                    .extend(source.list_key_usage(schema, &names).await?);
            }
            if !fk_names.is_empty() {
                snapshot.referenced_columns.extend(
                    source
                        .list_referenced_column_usage(&fk_names)
                        .await?
                        .into_iter()
                        .filter(|r| &r.constraint_schema == schema),
                );
            }
            snapshot.constraints.extend(constraints);
        }

        info!(
            "Captured snapshot: {} enum members, {} columns, {} constraints",
            snapshot.enums.len(),
            snapshot.columns.len(),
            snapshot.constraints.len()
        );
        Ok(snapshot)
    }
}

/// [`SchemaSource`] that replays a [`CatalogSnapshot`].
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    snapshot: CatalogSnapshot,
    label: String,
}

impl SnapshotSource {
    pub fn new(snapshot: CatalogSnapshot) -> Self {
        Self {
            snapshot,
            label: "snapshot".to_string(),
        }
    }

    /// Load a snapshot file and label the source with its path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let snapshot = CatalogSnapshot::load(path)?;
        Ok(Self {
            snapshot,
            label: format!("snapshot:{}", path.display()),
        })
    }
}

#[async_trait]
impl SchemaSource for SnapshotSource {
    async fn list_enum_members(&self) -> Result<Vec<EnumMember>> {
        let mut members = self.snapshot.enums.clone();
        // Stable: keeps each type's member order.
        members.sort_by(|a, b| (&a.type_name, &a.schema).cmp(&(&b.type_name, &b.schema)));
        Ok(members)
    }

    async fn list_columns(
        &self,
        include_schemas: &[String],
        exclude_schemas: &[String],
        exclude_tables: &[String],
    ) -> Result<Vec<ColumnMeta>> {
        let mut columns: Vec<ColumnMeta> = self
            .snapshot
            .columns
            .iter()
            .filter(|c| include_schemas.contains(&c.schema))
            .filter(|c| !exclude_schemas.contains(&c.schema))
            .filter(|c| !exclude_tables.contains(&c.table))
            .cloned()
            .collect();
        // Stable: keeps ordinal order within each table.
        columns.sort_by(|a, b| (&a.schema, &a.table).cmp(&(&b.schema, &b.table)));
        debug!("Replayed {} columns", columns.len());
        Ok(columns)
    }

    async fn list_constraints(
        &self,
        schema: &str,
        kinds: &[ConstraintKind],
    ) -> Result<Vec<ConstraintInfo>> {
        Ok(self
            .snapshot
            .constraints
            .iter()
            .filter(|c| c.schema == schema && kinds.contains(&c.kind))
            .cloned()
            .collect())
    }

    async fn list_key_usage(
        &self,
        schema: &str,
        constraint_names: &[String],
    ) -> Result<Vec<KeyUsage>> {
        Ok(self
            .snapshot
            .key_usage
            .iter()
            .filter(|k| k.schema == schema && constraint_names.contains(&k.constraint_name))
            .cloned()
            .collect())
    }

    async fn list_referenced_column_usage(
        &self,
        constraint_names: &[String],
    ) -> Result<Vec<ReferencedColumn>> {
        Ok(self
            .snapshot
            .referenced_columns
            .iter()
            .filter(|r| constraint_names.contains(&r.constraint_name))
            .cloned()
            .collect())
    }

    fn describe(&self) -> String {
        self.label.clone()
    }

    async fn close(&mut self) {
        debug!("Released {}", self.label);
    }
}
