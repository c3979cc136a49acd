//! Catalog metadata records.

use serde::{Deserialize, Serialize};

/// One enum member row. Rows arrive ordered by type name, then schema, then
/// by the type's defined sort order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumMember {
    /// Schema the enum type lives in.
    #[serde(default = "default_schema")]
    pub schema: String,

    /// Native enum type name.
    pub type_name: String,

    /// Member label.
    pub label: String,
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    /// Schema name.
    pub schema: String,

    /// Table name.
    pub table: String,

    /// Column name.
    pub column: String,

    /// Whether the column allows NULL.
    pub nullable: bool,

    /// Raw default expression as reported by the catalog.
    #[serde(default)]
    pub default: Option<String>,

    /// SQL-standard type name (`integer`, `ARRAY`, `USER-DEFINED`, ...).
    pub native_type: String,

    /// Underlying type name (`int4`, `_text`, `mood`, ...).
    pub udt_name: String,

    /// Schema of the underlying type, when the catalog reports it.
    #[serde(default)]
    pub udt_schema: Option<String>,
}

fn default_schema() -> String {
    crate::naming::DEFAULT_SCHEMA.to_string()
}

impl ColumnMeta {
    /// The `(schema, table)` pair this column belongs to.
    pub fn identity(&self) -> TableIdentity {
        TableIdentity::new(&self.schema, &self.table)
    }

    /// Whether the catalog reports this column as an array.
    pub fn is_array(&self) -> bool {
        self.native_type.eq_ignore_ascii_case("ARRAY")
    }
}

/// Key constraint kinds that influence branding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    #[serde(rename = "PRIMARY KEY")]
    PrimaryKey,
    #[serde(rename = "UNIQUE")]
    Unique,
    #[serde(rename = "FOREIGN KEY")]
    ForeignKey,
}

impl ConstraintKind {
    /// Every kind, in catalog order.
    pub const ALL: [ConstraintKind; 3] = [
        ConstraintKind::PrimaryKey,
        ConstraintKind::Unique,
        ConstraintKind::ForeignKey,
    ];

    /// The `constraint_type` spelling used by `information_schema`.
    pub fn as_sql(&self) -> &'static str {
        match self {
            ConstraintKind::PrimaryKey => "PRIMARY KEY",
            ConstraintKind::Unique => "UNIQUE",
            ConstraintKind::ForeignKey => "FOREIGN KEY",
        }
    }

    /// Parse an `information_schema` constraint type.
    pub fn from_sql(value: &str) -> Option<Self> {
        match value {
            "PRIMARY KEY" => Some(ConstraintKind::PrimaryKey),
            "UNIQUE" => Some(ConstraintKind::Unique),
            "FOREIGN KEY" => Some(ConstraintKind::ForeignKey),
            _ => None,
        }
    }
}

/// A constraint declared in a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintInfo {
    /// Schema the constraint is declared in.
    pub schema: String,

    /// Constraint name, unique within its schema.
    pub constraint_name: String,

    /// Constraint kind.
    pub kind: ConstraintKind,
}

/// A column participating in a constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyUsage {
    pub schema: String,
    pub table: String,
    pub column: String,
    pub constraint_name: String,
}

/// A column on the referenced side of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencedColumn {
    /// Schema the foreign key constraint is declared in.
    pub constraint_schema: String,

    /// Referenced table's schema.
    pub schema: String,

    /// Referenced table.
    pub table: String,

    /// Referenced column.
    pub column: String,

    pub constraint_name: String,
}

/// A `(schema, table)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableIdentity {
    pub schema: String,
    pub table: String,
}

impl TableIdentity {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// `schema.table`
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}
