//! Read-only access to catalog metadata.
//!
//! [`SchemaSource`] is the seam between the generation pipeline and the
//! database. [`PgSchemaSource`] answers it from a live PostgreSQL connection;
//! [`SnapshotSource`] answers it from a [`CatalogSnapshot`] recorded earlier,
//! with the same filtering and ordering.

mod postgres;
mod snapshot;
mod types;

pub use postgres::PgSchemaSource;
pub use snapshot::{CatalogSnapshot, SnapshotSource};
pub use types::*;

use async_trait::async_trait;

use crate::error::Result;

/// Catalog queries consumed by the generator.
///
/// Every method is a single read-only round trip. Implementations must keep
/// the documented ordering because emission grouping depends on it.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Enum members ordered by type name, then by the type's own member order.
    async fn list_enum_members(&self) -> Result<Vec<EnumMember>>;

    /// Columns of tables in `include_schemas`, minus `exclude_schemas` and
    /// tables named in `exclude_tables`, ordered by
    /// `(schema, table, ordinal position)`.
    async fn list_columns(
        &self,
        include_schemas: &[String],
        exclude_schemas: &[String],
        exclude_tables: &[String],
    ) -> Result<Vec<ColumnMeta>>;

    /// Constraints of the given kinds declared in `schema`.
    async fn list_constraints(
        &self,
        schema: &str,
        kinds: &[ConstraintKind],
    ) -> Result<Vec<ConstraintInfo>>;

    /// Columns participating in the named constraints of `schema`.
    async fn list_key_usage(
        &self,
        schema: &str,
        constraint_names: &[String],
    ) -> Result<Vec<KeyUsage>>;

    /// Referenced-side columns of the named foreign key constraints.
    async fn list_referenced_column_usage(
        &self,
        constraint_names: &[String],
    ) -> Result<Vec<ReferencedColumn>>;

    /// Short label for logs.
    fn describe(&self) -> String;

    /// Release the underlying connection. Called once at the end of a run.
    async fn close(&mut self);
}
