//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Catalog connection. Not needed when generating from a snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseConfig>,

    /// Output target: a file path, or "-" for stdout.
    #[serde(default = "default_output")]
    pub output: String,

    /// Schemas to include; `!`-prefixed entries are excluded.
    #[serde(default = "default_schemas")]
    pub schemas: ListSpec,

    /// Tables to omit entirely (bare names or `schema.table`).
    #[serde(default)]
    pub exclude: ListSpec,

    /// Explicit identifier to name substitutions.
    #[serde(default)]
    pub overrides: HashMap<String, String>,

    /// Literal text written before all declarations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    /// Literal text written after all declarations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,

    /// How column names become field names.
    #[serde(default)]
    pub field_case: FieldCase,

    /// Name of the table index enumeration.
    #[serde(default = "default_table_enum_name")]
    pub table_enum_name: String,

    /// Name of the table-to-record lookup type.
    #[serde(default = "default_table_map_name")]
    pub table_map_name: String,

    /// How key constraints are attached to columns.
    #[serde(default)]
    pub constraint_matching: ConstraintMatching,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: None,
            output: default_output(),
            schemas: default_schemas(),
            exclude: ListSpec::default(),
            overrides: HashMap::new(),
            prefix: None,
            suffix: None,
            field_case: FieldCase::default(),
            table_enum_name: default_table_enum_name(),
            table_map_name: default_table_map_name(),
            constraint_matching: ConstraintMatching::default(),
        }
    }
}

impl Config {
    /// Resolve the configured output into a concrete target.
    pub fn output_target(&self) -> OutputTarget {
        OutputTarget::parse(&self.output)
    }
}

/// Catalog database connection settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 5432).
    #[serde(default = "default_pg_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    #[serde(default, skip_serializing)]
    pub password: String,

    /// SSL mode (default: "require").
    #[serde(default = "default_require")]
    pub ssl_mode: String,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// A list option that may be written either as a comma-separated string
/// or as a YAML sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListSpec {
    Joined(String),
    List(Vec<String>),
}

impl Default for ListSpec {
    fn default() -> Self {
        ListSpec::List(Vec::new())
    }
}

impl ListSpec {
    /// Split into trimmed, non-empty entries.
    pub fn entries(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            ListSpec::Joined(s) => s.split(',').collect(),
            ListSpec::List(items) => items.iter().map(String::as_str).collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl From<&str> for ListSpec {
    fn from(value: &str) -> Self {
        ListSpec::Joined(value.to_string())
    }
}

impl From<Vec<String>> for ListSpec {
    fn from(value: Vec<String>) -> Self {
        ListSpec::List(value)
    }
}

/// Field naming strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCase {
    /// `author_id` becomes `authorId`.
    #[default]
    Camel,

    /// Column names are used as-is.
    Preserve,
}

/// Which catalog coordinates a key constraint must share with a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintMatching {
    /// Match on `(schema, table, column)`.
    #[default]
    Qualified,

    /// Match on `(table, column)` only. Same-named tables in different
    /// schemas share each other's key annotations.
    TableColumn,
}

/// Where generated declarations are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

impl OutputTarget {
    /// `-` (or an empty string) selects stdout, anything else is a path.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" | "-" => OutputTarget::Stdout,
            path => OutputTarget::File(PathBuf::from(path)),
        }
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputTarget::Stdout => write!(f, "<stdout>"),
            OutputTarget::File(path) => write!(f, "{}", path.display()),
        }
    }
}

// Default value functions for serde
fn default_output() -> String {
    "-".to_string()
}

fn default_schemas() -> ListSpec {
    ListSpec::List(vec!["public".to_string()])
}

fn default_table_enum_name() -> String {
    "Table".to_string()
}

fn default_table_map_name() -> String {
    "Tables".to_string()
}

fn default_pg_port() -> u16 {
    5432
}

fn default_require() -> String {
    "require".to_string()
}
