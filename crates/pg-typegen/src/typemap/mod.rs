//! Type mapping from PostgreSQL catalog types to TypeScript.

use std::collections::{BTreeMap, HashMap};

use tracing::warn;

use crate::catalog::{ColumnMeta, EnumMember};
use crate::naming::{NameTransformer, DEFAULT_SCHEMA};

/// TypeScript type for `interval` values as returned by node-postgres.
pub const INTERVAL_TYPE: &str = "{ years?: number; months?: number; days?: number; hours?: number; minutes?: number; seconds?: number; milliseconds?: number }";

/// Fallback for anything unmapped.
pub const ANY_TYPE: &str = "any";

/// Built-in mappings, keyed by `udt_name` and by the SQL-standard spelling
/// reported in `data_type`.
const BUILTIN_TYPES: &[(&[&str], &str)] = &[
    (&["bool", "boolean"], "boolean"),
    (
        &[
            // Character types
            "text", "varchar", "character varying", "bpchar", "char", "character", "name",
            "citext",
            // Numeric types that do not fit a JS number
            "money", "numeric", "decimal", "int8", "bigint",
            // Identifiers, times of day, documents
            "uuid", "time", "timetz", "time without time zone", "time with time zone", "xml",
            // Full-text search
            "tsvector", "tsquery",
            // Network addresses
            "inet", "cidr", "macaddr", "macaddr8",
        ],
        "string",
    ),
    (
        &[
            "int2", "smallint", "int4", "integer", "float4", "real", "float8",
            "double precision", "oid",
        ],
        "number",
    ),
    (
        &[
            "date", "timestamp", "timestamptz", "timestamp without time zone",
            "timestamp with time zone",
        ],
        "Date",
    ),
    (&["bytea"], "Buffer"),
    (&["interval"], INTERVAL_TYPE),
];

/// Look up a built-in mapping. `json`/`jsonb` are narrowed by their default.
pub fn builtin_type(native: &str, default: Option<&str>) -> Option<String> {
    if native == "json" || native == "jsonb" {
        return Some(json_type(default).to_string());
    }
    BUILTIN_TYPES
        .iter()
        .find(|(names, _)| names.contains(&native))
        .map(|(_, ts)| ts.to_string())
}

/// Narrow a json column by sniffing its default literal. Best effort only.
fn json_type(default: Option<&str>) -> &'static str {
    match default.map(str::trim_start) {
        Some(d) if d.starts_with("'{") => "Record<string, unknown>",
        Some(d) if d.starts_with("'[") => "unknown[]",
        _ => "unknown",
    }
}

/// Wrap a type as an array, parenthesizing unions and intersections.
pub fn array_of(element: &str) -> String {
    if element.contains('&') || element.contains('|') {
        format!("({})[]", element)
    } else {
        format!("{}[]", element)
    }
}

/// Maps native types to declaration types, with a registry of the
/// database's enum types for anything not built in.
///
/// Enums are registered under `schema.name` and under the bare name. When
/// two schemas declare the same bare name, the bare entry belongs to the
/// default schema, or else to the schema that sorts first.
#[derive(Debug, Clone, Default)]
pub struct TypeMapper {
    enums: HashMap<String, String>,
    declared: usize,
}

impl TypeMapper {
    /// Build from native enum name (bare or `schema.name`) to declared type
    /// name.
    pub fn new(enums: HashMap<String, String>) -> Self {
        let declared = enums.len();
        Self { enums, declared }
    }

    /// Register every distinct enum type in `members`.
    pub fn from_enum_members(members: &[EnumMember], names: &NameTransformer<'_>) -> Self {
        let mut qualified: BTreeMap<(&str, &str), String> = BTreeMap::new();
        for m in members {
            qualified
                .entry((m.schema.as_str(), m.type_name.as_str()))
                .or_insert_with(|| names.type_name(&m.schema, &m.type_name));
        }

        let mut enums: HashMap<String, String> = HashMap::with_capacity(qualified.len() * 2);
        for ((schema, type_name), declared) in &qualified {
            let claims_bare = *schema == DEFAULT_SCHEMA || !enums.contains_key(*type_name);
            if claims_bare {
                enums.insert(type_name.to_string(), declared.clone());
            }
            enums.insert(format!("{}.{}", schema, type_name), declared.clone());
        }
        Self {
            enums,
            declared: qualified.len(),
        }
    }

    /// Number of registered enum types.
    pub fn enum_count(&self) -> usize {
        self.declared
    }

    /// Map a native type name. Falls back to the enum registry, then `any`.
    pub fn map_type(&self, native: &str, is_array: bool, default: Option<&str>) -> String {
        let base = self.lookup(None, native, default).unwrap_or_else(|| unmapped(native));
        if is_array {
            array_of(&base)
        } else {
            base
        }
    }

    /// Declaration type for a column before branding and null union.
    pub fn map_column(&self, column: &ColumnMeta) -> String {
        let udt_schema = column.udt_schema.as_deref();
        if column.is_array() {
            let element = column
                .udt_name
                .strip_prefix('_')
                .unwrap_or(&column.udt_name);
            // The default of an array column describes the array, not its elements.
            let base = self
                .lookup(udt_schema, element, None)
                .unwrap_or_else(|| unmapped(element));
            return array_of(&base);
        }

        let default = column.default.as_deref();
        match self.lookup(udt_schema, &column.udt_name, default) {
            Some(ts) => ts,
            None => self.map_type(&column.native_type, false, default),
        }
    }

    fn lookup(&self, schema: Option<&str>, native: &str, default: Option<&str>) -> Option<String> {
        builtin_type(native, default)
            .or_else(|| {
                schema.and_then(|schema| self.enums.get(&format!("{}.{}", schema, native)).cloned())
            })
            .or_else(|| self.enums.get(native).cloned())
    }
}

fn unmapped(native: &str) -> String {
    warn!("Unmapped native type '{}', using '{}'", native, ANY_TYPE);
    ANY_TYPE.to_string()
}
