//! Generation orchestrator - main workflow coordinator.

use crate::catalog::{
    CatalogSnapshot, ColumnMeta, EnumMember, PgSchemaSource, SchemaSource, TableIdentity,
};
use crate::config::{Config, DatabaseConfig};
use crate::constraints::{AnnotatedColumn, ConstraintResolver};
use crate::emit::{distinct_tables, open_sink, runs, DeclarationSink, Emitter, TableNames};
use crate::error::{Result, TypegenError};
use crate::filter::SchemaFilter;
use crate::naming::{is_bare_identifier, NameTransformer};
use crate::typemap::TypeMapper;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Generation orchestrator.
pub struct Orchestrator {
    config: Config,
}

/// Result of a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Where the catalog was read from.
    pub source: String,

    /// Where declarations were written.
    pub output: String,

    /// Enum types declared.
    pub enums: usize,

    /// Record types declared.
    pub tables: usize,

    /// Fields across all record types.
    pub columns: usize,

    /// Fields carrying a self or foreign brand.
    pub branded_fields: usize,

    /// When generation started.
    pub started_at: DateTime<Utc>,

    /// When generation completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,
}

/// Result of a connectivity check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub database: String,
    pub connected: bool,
    pub latency_ms: u64,
    pub error: Option<String>,
    pub healthy: bool,
}

/// Everything read from the catalog before any output is written.
struct ResolvedCatalog {
    enums: Vec<EnumMember>,
    tables: Vec<TableIdentity>,
    columns: Vec<AnnotatedColumn>,
}

#[derive(Debug, Default)]
struct EmitCounts {
    enums: usize,
    tables: usize,
    columns: usize,
    branded_fields: usize,
}

impl Orchestrator {
    /// Create a new orchestrator.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolved schema and table selection.
    pub fn filter(&self) -> SchemaFilter {
        SchemaFilter::resolve(&self.config.schemas, &self.config.exclude)
    }

    fn database(&self) -> Result<&DatabaseConfig> {
        self.config.database.as_ref().ok_or_else(|| {
            TypegenError::Config("a database section is required to connect".to_string())
        })
    }

    /// Open a connection to the configured database.
    pub async fn connect(&self) -> Result<PgSchemaSource> {
        PgSchemaSource::connect(self.database()?).await
    }

    /// Generate from the configured database into the configured output.
    pub async fn run(&self) -> Result<GenerationResult> {
        let mut source = self.connect().await?;
        self.generate_from(&mut source).await
    }

    /// Generate from `source` into the configured output.
    pub async fn generate_from<S>(&self, source: &mut S) -> Result<GenerationResult>
    where
        S: SchemaSource + ?Sized,
    {
        let mut sink = match open_sink(&self.config.output_target()) {
            Ok(sink) => sink,
            Err(e) => {
                source.close().await;
                return Err(e);
            }
        };
        self.run_with(source, sink.as_mut()).await
    }

    /// Run the pipeline. `source` and `sink` are closed on every path.
    pub async fn run_with<S>(
        &self,
        source: &mut S,
        sink: &mut dyn DeclarationSink,
    ) -> Result<GenerationResult>
    where
        S: SchemaSource + ?Sized,
    {
        let started_at = Utc::now();
        let source_label = source.describe();
        let output = sink.describe();
        info!("Starting generation from {} into {}", source_label, output);

        let resolved = self.resolve(&*source).await;
        source.close().await;

        let catalog = match resolved {
            Ok(catalog) => catalog,
            Err(e) => {
                if let Err(close_err) = sink.close() {
                    warn!("Failed to close {}: {}", output, close_err);
                }
                return Err(e);
            }
        };

        let counts = self.emit(&catalog, sink)?;

        let completed_at = Utc::now();
        let duration = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;
        info!(
            "Generated {} enums and {} record types ({} fields, {} branded) in {:.2}s",
            counts.enums, counts.tables, counts.columns, counts.branded_fields, duration
        );

        Ok(GenerationResult {
            source: source_label,
            output,
            enums: counts.enums,
            tables: counts.tables,
            columns: counts.columns,
            branded_fields: counts.branded_fields,
            started_at,
            completed_at,
            duration_seconds: duration,
        })
    }

    /// Record a snapshot of everything a run would read, then release `source`.
    pub async fn capture_snapshot<S>(&self, source: &mut S) -> Result<CatalogSnapshot>
    where
        S: SchemaSource + ?Sized,
    {
        let captured = CatalogSnapshot::capture(&*source, &self.filter()).await;
        source.close().await;
        captured
    }

    /// Test connectivity to the configured database.
    pub async fn health_check(&self) -> Result<HealthCheckResult> {
        let db = self.database()?;
        let database = format!("{}:{}/{}", db.host, db.port, db.database);

        let start = Instant::now();
        let (connected, error) = match PgSchemaSource::connect(db).await {
            Ok(mut source) => {
                source.close().await;
                (true, None)
            }
            Err(e) => (false, Some(e.to_string())),
        };
        let latency_ms = start.elapsed().as_millis() as u64;

        Ok(HealthCheckResult {
            database,
            connected,
            latency_ms,
            error,
            healthy: connected,
        })
    }

    /// Fetch enums and columns, then resolve key constraints.
    async fn resolve<S>(&self, source: &S) -> Result<ResolvedCatalog>
    where
        S: SchemaSource + ?Sized,
    {
        let filter = self.filter();
        let (include, exclude, exclude_tables) = filter.query_args();

        info!("Phase 1: Fetching enum types");
        let enums = source.list_enum_members().await?;
        debug!("Fetched {} enum members", enums.len());

        info!("Phase 2: Fetching columns for schemas {:?}", include);
        let columns: Vec<ColumnMeta> = source
            .list_columns(&include, &exclude, &exclude_tables)
            .await?
            .into_iter()
            .filter(|c| filter.includes_schema(&c.schema))
            .filter(|c| !filter.excludes_table(&c.schema, &c.table))
            .collect();
        let tables = distinct_tables(&columns);
        info!("Found {} tables ({} columns)", tables.len(), columns.len());

        info!("Phase 3: Resolving key constraints");
        let resolver = ConstraintResolver::new(self.config.constraint_matching);
        let edges = resolver.resolve(source, &include).await?;
        debug!("Resolved {} key edges", edges.len());
        let columns = resolver.annotate(columns, &edges);

        Ok(ResolvedCatalog {
            enums,
            tables,
            columns,
        })
    }

    /// Write every section, closing the sink whether or not writing succeeds.
    fn emit(&self, catalog: &ResolvedCatalog, sink: &mut dyn DeclarationSink) -> Result<EmitCounts> {
        let names = NameTransformer::new(&self.config.overrides, self.config.field_case);
        let table_names = TableNames {
            index: self.config.table_enum_name.clone(),
            map: self.config.table_map_name.clone(),
        };
        let checked = check_declaration_names(&names, &table_names, catalog);
        let mapper = TypeMapper::from_enum_members(&catalog.enums, &names);
        let mut emitter = Emitter::new(sink, names, &mapper).with_table_names(table_names);

        info!("Phase 4: Writing declarations");
        match checked.and_then(|()| self.write_sections(&mut emitter, catalog)) {
            Ok(counts) => {
                emitter.finish()?;
                Ok(counts)
            }
            Err(e) => {
                if let Err(close_err) = emitter.finish() {
                    warn!("Failed to close output: {}", close_err);
                }
                Err(e)
            }
        }
    }

    fn write_sections(&self, emitter: &mut Emitter<'_>, catalog: &ResolvedCatalog) -> Result<EmitCounts> {
        emitter.write_prefix(self.config.prefix.as_deref())?;
        let enums = emitter.write_enums(&catalog.enums)?;
        emitter.write_table_index(&catalog.tables)?;
        emitter.write_table_map(&catalog.tables)?;
        let stats = emitter.write_records(&catalog.columns)?;
        emitter.write_suffix(self.config.suffix.as_deref())?;

        Ok(EmitCounts {
            enums,
            tables: stats.records,
            columns: stats.fields,
            branded_fields: stats.branded_fields,
        })
    }
}

/// Every top-level declaration must get a distinct, valid name.
fn check_declaration_names(
    names: &NameTransformer<'_>,
    tables: &TableNames,
    catalog: &ResolvedCatalog,
) -> Result<()> {
    let mut claimed: HashMap<String, String> = HashMap::new();
    let mut claim = |name: String, owner: String| -> Result<()> {
        if !is_bare_identifier(&name) {
            return Err(TypegenError::Config(format!(
                "{} is declared as '{}', which is not a valid identifier; rename it in overrides",
                owner, name
            )));
        }
        match claimed.entry(name) {
            Entry::Occupied(entry) => Err(TypegenError::Config(format!(
                "{} and {} are both declared as '{}'; rename one in overrides with a schema.name key",
                entry.get(),
                owner,
                entry.key()
            ))),
            Entry::Vacant(entry) => {
                entry.insert(owner);
                Ok(())
            }
        }
    };

    claim(tables.index.clone(), "the table index".to_string())?;
    claim(tables.map.clone(), "the table map".to_string())?;
    for group in runs(&catalog.enums, |m| (m.schema.as_str(), m.type_name.as_str())) {
        let first = &group[0];
        claim(
            names.type_name(&first.schema, &first.type_name),
            format!("enum {}.{}", first.schema, first.type_name),
        )?;
    }
    for table in &catalog.tables {
        claim(
            names.type_name(&table.schema, &table.table),
            format!("table {}", table.full_name()),
        )?;
    }
    Ok(())
}

impl GenerationResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
