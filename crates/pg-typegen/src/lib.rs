//! # pg-typegen
//!
//! TypeScript declarations from a PostgreSQL catalog.
//!
//! This library reads catalog metadata for a set of schemas and writes:
//!
//! - **Enum maps** for every native enum type, in the type's own member order
//! - **A table index** enumerating every `schema.table`
//! - **A table map** from index members to record types
//! - **Record interfaces** per table, with branded key columns so that ids
//!   of different tables are not interchangeable
//!
//! Catalog metadata comes from a live connection or from a recorded JSON
//! snapshot, and the same catalog and configuration always produce
//! byte-identical output.
//!
//! ## Example
//!
//! ```rust,no_run
//! use pg_typegen::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> pg_typegen::Result<()> {
//!     let config = Config::load("typegen.yaml")?;
//!     let orchestrator = Orchestrator::new(config)?;
//!     let result = orchestrator.run().await?;
//!     println!("Declared {} tables", result.tables);
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod constraints;
pub mod emit;
pub mod error;
pub mod filter;
pub mod naming;
pub mod orchestrator;
pub mod typemap;

// Re-exports for convenient access
pub use catalog::{CatalogSnapshot, PgSchemaSource, SchemaSource, SnapshotSource};
pub use config::{Config, ConstraintMatching, DatabaseConfig, FieldCase, OutputTarget};
pub use constraints::{AnnotatedColumn, ConstraintResolver, KeyEdge};
pub use emit::{DeclarationSink, Emitter, FileSink, Stage, WriterSink};
pub use error::{Result, TypegenError};
pub use filter::SchemaFilter;
pub use naming::NameTransformer;
pub use orchestrator::{GenerationResult, HealthCheckResult, Orchestrator};
pub use typemap::TypeMapper;
