//! Declaration emission.
//!
//! [`Emitter`] writes the output in a fixed section order:
//! prefix, enums, table index, table map, record types, suffix. Sections
//! may be skipped but never revisited, and nothing can be written once the
//! sink is closed.

mod group;
mod sink;

pub use group::{distinct_tables, runs, Runs};
pub use sink::{open_sink, DeclarationSink, FileSink, WriterSink};

use std::fmt;

use tracing::debug;

use crate::catalog::{EnumMember, TableIdentity};
use crate::constraints::AnnotatedColumn;
use crate::error::{Result, TypegenError};
use crate::naming::{property_name, string_literal, NameTransformer};
use crate::typemap::TypeMapper;

/// Emission sections, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Prefix,
    Enums,
    TableIndex,
    TableMap,
    RecordTypes,
    Suffix,
    Closed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Prefix => "prefix",
            Stage::Enums => "enums",
            Stage::TableIndex => "table index",
            Stage::TableMap => "table map",
            Stage::RecordTypes => "record types",
            Stage::Suffix => "suffix",
            Stage::Closed => "closed",
        };
        write!(f, "{}", name)
    }
}

/// Counts from the record-type section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordStats {
    pub records: usize,
    pub fields: usize,
    pub branded_fields: usize,
}

/// Names of the table index enumeration and the table map type.
#[derive(Debug, Clone)]
pub struct TableNames {
    pub index: String,
    pub map: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            index: "Table".to_string(),
            map: "Tables".to_string(),
        }
    }
}

/// Writes declarations to a sink, one section at a time.
pub struct Emitter<'a> {
    sink: &'a mut dyn DeclarationSink,
    names: NameTransformer<'a>,
    mapper: &'a TypeMapper,
    tables: TableNames,
    stage: Option<Stage>,
}

impl<'a> Emitter<'a> {
    pub fn new(
        sink: &'a mut dyn DeclarationSink,
        names: NameTransformer<'a>,
        mapper: &'a TypeMapper,
    ) -> Self {
        Self {
            sink,
            names,
            mapper,
            tables: TableNames::default(),
            stage: None,
        }
    }

    pub fn with_table_names(mut self, tables: TableNames) -> Self {
        self.tables = tables;
        self
    }

    /// The last section entered, if any.
    pub fn stage(&self) -> Option<Stage> {
        self.stage
    }

    fn advance(&mut self, next: Stage) -> Result<()> {
        if let Some(current) = self.stage {
            if current >= next {
                return Err(TypegenError::Emit(format!(
                    "cannot write {} after {}",
                    next, current
                )));
            }
        }
        debug!("Emitting {}", next);
        self.stage = Some(next);
        Ok(())
    }

    /// Literal text followed by a blank line.
    pub fn write_prefix(&mut self, prefix: Option<&str>) -> Result<()> {
        self.advance(Stage::Prefix)?;
        if let Some(text) = prefix {
            self.sink.write(&terminated(text))?;
            self.sink.write("\n")?;
        }
        Ok(())
    }

    /// One const map plus key-type alias per enum. Returns the number of
    /// enums written.
    pub fn write_enums(&mut self, members: &[EnumMember]) -> Result<usize> {
        self.advance(Stage::Enums)?;
        let mut count = 0;
        for group in runs(members, |m| (m.schema.as_str(), m.type_name.as_str())) {
            let name = self.names.type_name(&group[0].schema, &group[0].type_name);
            let mut decl = format!("export const {} = {{\n", name);
            for member in group {
                let label = string_literal(&member.label);
                decl.push_str(&format!("  {}: {},\n", label, label));
            }
            decl.push_str("} as const;\n");
            decl.push_str(&format!("export type {0} = keyof typeof {0};\n\n", name));
            self.sink.write(&decl)?;
            count += 1;
        }
        Ok(count)
    }

    /// Enumeration of every table, valued by its `schema.table` name.
    pub fn write_table_index(&mut self, tables: &[TableIdentity]) -> Result<()> {
        self.advance(Stage::TableIndex)?;
        let mut decl = format!("export enum {} {{\n", self.tables.index);
        for table in tables {
            decl.push_str(&format!(
                "  {} = {},\n",
                self.record_name(table),
                string_literal(&table.full_name())
            ));
        }
        decl.push_str("}\n\n");
        self.sink.write(&decl)
    }

    /// Map from table index member to record type.
    pub fn write_table_map(&mut self, tables: &[TableIdentity]) -> Result<()> {
        self.advance(Stage::TableMap)?;
        let mut decl = format!("export type {} = {{\n", self.tables.map);
        for table in tables {
            let name = self.record_name(table);
            decl.push_str(&format!("  [{}.{}]: {};\n", self.tables.index, name, name));
        }
        decl.push_str("};\n\n");
        self.sink.write(&decl)
    }

    /// One interface per contiguous run of a table's columns.
    pub fn write_records(&mut self, columns: &[AnnotatedColumn]) -> Result<RecordStats> {
        self.advance(Stage::RecordTypes)?;
        let mut stats = RecordStats::default();
        for group in runs(columns, |c| (c.meta.schema.as_str(), c.meta.table.as_str())) {
            let record = self.record_name(&group[0].meta.identity());
            let mut decl = format!("export interface {} {{\n", record);
            for column in group {
                let (field_type, branded) = self.field_type(column, &record);
                if branded {
                    stats.branded_fields += 1;
                }
                decl.push_str(&format!(
                    "  {}: {};\n",
                    property_name(&self.names.field_name(&column.meta.column)),
                    field_type
                ));
            }
            decl.push_str("}\n\n");
            self.sink.write(&decl)?;
            debug!("Wrote {} with {} fields", record, group.len());
            stats.records += 1;
            stats.fields += group.len();
        }
        Ok(stats)
    }

    /// Literal text, newline-terminated.
    pub fn write_suffix(&mut self, suffix: Option<&str>) -> Result<()> {
        self.advance(Stage::Suffix)?;
        if let Some(text) = suffix {
            self.sink.write(&terminated(text))?;
        }
        Ok(())
    }

    /// Flush and close the sink.
    pub fn finish(&mut self) -> Result<()> {
        self.advance(Stage::Closed)?;
        self.sink.close()
    }

    fn record_name(&self, table: &TableIdentity) -> String {
        self.names.type_name(&table.schema, &table.table)
    }

    /// Mapped type, then brands, then the null union.
    fn field_type(&self, column: &AnnotatedColumn, record: &str) -> (String, bool) {
        let mut ty = self.mapper.map_column(&column.meta);
        let mut branded = false;

        let name = column.meta.column.as_str();
        if name == "id" && (column.is_primary_key || column.is_unique) {
            ty = format!("{} & {{ __brand: {} }}", ty, string_literal(record));
            branded = true;
        }
        if column.is_foreign_key && name.ends_with("id") {
            if let Some(target) = &column.referenced_target {
                ty = format!(
                    "{} & {{ __flavor?: {} }}",
                    ty,
                    string_literal(&self.record_name(target))
                );
                branded = true;
            }
        }

        if column.meta.nullable {
            ty.push_str(" | null");
        }
        (ty, branded)
    }
}

fn terminated(text: &str) -> String {
    if text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{}\n", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ColumnMeta;
    use crate::config::FieldCase;
    use std::collections::HashMap;

    fn meta(schema: &str, table: &str, column: &str, udt: &str, nullable: bool) -> ColumnMeta {
        ColumnMeta {
            schema: schema.into(),
            table: table.into(),
            column: column.into(),
            nullable,
            default: None,
            native_type: if udt.starts_with('_') { "ARRAY".into() } else { udt.into() },
            udt_name: udt.into(),
            udt_schema: None,
        }
    }

    fn plain(schema: &str, table: &str, column: &str, udt: &str, nullable: bool) -> AnnotatedColumn {
        AnnotatedColumn::plain(meta(schema, table, column, udt, nullable))
    }

    fn member(type_name: &str, label: &str) -> EnumMember {
        EnumMember {
            schema: "public".into(),
            type_name: type_name.into(),
            label: label.into(),
        }
    }

    fn records(columns: &[AnnotatedColumn]) -> (String, RecordStats) {
        let overrides = HashMap::new();
        let mapper = TypeMapper::default();
        let mut sink = WriterSink::buffer();
        let stats = {
            let names = NameTransformer::new(&overrides, FieldCase::Camel);
            let mut emitter = Emitter::new(&mut sink, names, &mapper);
            let stats = emitter.write_records(columns).unwrap();
            emitter.finish().unwrap();
            stats
        };
        (sink.contents(), stats)
    }

    // =========================================================================
    // Sections
    // =========================================================================

    #[test]
    fn test_enum_declaration() {
        let overrides = HashMap::new();
        let mapper = TypeMapper::default();
        let mut sink = WriterSink::buffer();
        {
            let names = NameTransformer::new(&overrides, FieldCase::Camel);
            let mut emitter = Emitter::new(&mut sink, names, &mapper);
            let count = emitter
                .write_enums(&[member("mood", "happy"), member("mood", "sad")])
                .unwrap();
            assert_eq!(count, 1);
            emitter.finish().unwrap();
        }
        assert_eq!(
            sink.contents(),
            "export const Mood = {\n  \"happy\": \"happy\",\n  \"sad\": \"sad\",\n} as const;\n\
             export type Mood = keyof typeof Mood;\n\n"
        );
    }

    #[test]
    fn test_enum_groups_follow_type_boundaries() {
        let overrides = HashMap::new();
        let mapper = TypeMapper::default();
        let mut sink = WriterSink::buffer();
        {
            let names = NameTransformer::new(&overrides, FieldCase::Camel);
            let mut emitter = Emitter::new(&mut sink, names, &mapper);
            let count = emitter
                .write_enums(&[
                    member("color", "red"),
                    member("mood", "sad"),
                    member("mood", "happy"),
                ])
                .unwrap();
            assert_eq!(count, 2);
        }
        let out = sink.contents();
        assert!(out.find("Color").unwrap() < out.find("Mood").unwrap());
        // Catalog order, not alphabetical.
        assert!(out.find("\"sad\"").unwrap() < out.find("\"happy\"").unwrap());
    }

    #[test]
    fn test_enums_split_by_schema() {
        let overrides = HashMap::new();
        let mapper = TypeMapper::default();
        let mut sink = WriterSink::buffer();
        let mut billing = member("status", "paid");
        billing.schema = "billing".into();
        {
            let names = NameTransformer::new(&overrides, FieldCase::Camel);
            let mut emitter = Emitter::new(&mut sink, names, &mapper);
            let count = emitter
                .write_enums(&[billing, member("status", "open")])
                .unwrap();
            assert_eq!(count, 2);
        }
        let out = sink.contents();
        assert!(out.contains("export const BillingStatus = {\n  \"paid\": \"paid\",\n}"));
        assert!(out.contains("export const Status = {\n  \"open\": \"open\",\n}"));
    }

    #[test]
    fn test_table_index_and_map() {
        let overrides = HashMap::new();
        let mapper = TypeMapper::default();
        let mut sink = WriterSink::buffer();
        let tables = vec![
            TableIdentity::new("public", "user"),
            TableIdentity::new("auth", "user"),
        ];
        {
            let names = NameTransformer::new(&overrides, FieldCase::Camel);
            let mut emitter = Emitter::new(&mut sink, names, &mapper);
            emitter.write_table_index(&tables).unwrap();
            emitter.write_table_map(&tables).unwrap();
        }
        assert_eq!(
            sink.contents(),
            "export enum Table {\n  User = \"public.user\",\n  AuthUser = \"auth.user\",\n}\n\n\
             export type Tables = {\n  [Table.User]: User;\n  [Table.AuthUser]: AuthUser;\n};\n\n"
        );
    }

    #[test]
    fn test_custom_table_names() {
        let overrides = HashMap::new();
        let mapper = TypeMapper::default();
        let mut sink = WriterSink::buffer();
        let tables = vec![TableIdentity::new("public", "post")];
        {
            let names = NameTransformer::new(&overrides, FieldCase::Camel);
            let mut emitter = Emitter::new(&mut sink, names, &mapper).with_table_names(TableNames {
                index: "DbTable".into(),
                map: "DbTables".into(),
            });
            emitter.write_table_index(&tables).unwrap();
            emitter.write_table_map(&tables).unwrap();
        }
        let out = sink.contents();
        assert!(out.contains("export enum DbTable {"));
        assert!(out.contains("[DbTable.Post]: Post;"));
    }

    #[test]
    fn test_prefix_and_suffix() {
        let overrides = HashMap::new();
        let mapper = TypeMapper::default();
        let mut sink = WriterSink::buffer();
        {
            let names = NameTransformer::new(&overrides, FieldCase::Camel);
            let mut emitter = Emitter::new(&mut sink, names, &mapper);
            emitter.write_prefix(Some("/* generated */")).unwrap();
            emitter.write_suffix(Some("export {};\n")).unwrap();
            emitter.finish().unwrap();
        }
        assert_eq!(sink.contents(), "/* generated */\n\nexport {};\n");
    }

    // =========================================================================
    // Record types and branding
    // =========================================================================

    #[test]
    fn test_primary_key_id_is_self_branded() {
        let mut id = plain("public", "user", "id", "int4", false);
        id.is_primary_key = true;
        let (out, stats) = records(&[id, plain("public", "user", "email", "text", false)]);
        assert_eq!(
            out,
            "export interface User {\n  id: number & { __brand: \"User\" };\n  email: string;\n}\n\n"
        );
        assert_eq!(stats.branded_fields, 1);
    }

    #[test]
    fn test_id_without_key_role_is_not_branded() {
        let (out, stats) = records(&[plain("public", "log", "id", "int4", false)]);
        assert!(out.contains("  id: number;\n"));
        assert_eq!(stats.branded_fields, 0);
    }

    #[test]
    fn test_foreign_key_is_flavored_with_referenced_record() {
        let mut author = plain("public", "post", "author_id", "int4", false);
        author.is_foreign_key = true;
        author.referenced_target = Some(TableIdentity::new("public", "user"));
        let (out, _) = records(&[author]);
        assert!(out.contains("  authorId: number & { __flavor?: \"User\" };\n"), "{}", out);
    }

    #[test]
    fn test_foreign_key_without_target_is_plain() {
        let mut author = plain("public", "post", "author_id", "int4", true);
        author.is_foreign_key = true;
        let (out, stats) = records(&[author]);
        assert!(out.contains("  authorId: number | null;\n"));
        assert_eq!(stats.branded_fields, 0);
    }

    #[test]
    fn test_foreign_key_not_ending_in_id_is_plain() {
        let mut owner = plain("public", "pet", "owner", "int4", false);
        owner.is_foreign_key = true;
        owner.referenced_target = Some(TableIdentity::new("public", "user"));
        let (out, stats) = records(&[owner]);
        assert!(out.contains("  owner: number;\n"), "{}", out);
        assert_eq!(stats.branded_fields, 0);
    }

    #[test]
    fn test_unique_column_not_named_id_is_plain() {
        let mut email = plain("public", "user", "email", "text", false);
        email.is_unique = true;
        let mut user_id = plain("public", "profile", "user_id", "int4", false);
        user_id.is_primary_key = true;
        let (out, stats) = records(&[email, user_id]);
        assert!(out.contains("  email: string;\n"), "{}", out);
        assert!(out.contains("  userId: number;\n"), "{}", out);
        assert_eq!(stats.branded_fields, 0);
    }

    #[test]
    fn test_brands_stack_before_null_union() {
        let mut id = plain("public", "user_profile", "id", "int4", true);
        id.is_unique = true;
        id.is_foreign_key = true;
        id.referenced_target = Some(TableIdentity::new("auth", "user"));
        let (out, _) = records(&[id]);
        assert!(
            out.contains(
                "  id: number & { __brand: \"UserProfile\" } & { __flavor?: \"AuthUser\" } | null;\n"
            ),
            "{}",
            out
        );
    }

    #[test]
    fn test_nullable_text_array() {
        let (out, _) = records(&[plain("public", "post", "tags", "_text", true)]);
        assert!(out.contains("  tags: string[] | null;\n"));
    }

    #[test]
    fn test_field_names_quoted_when_not_bare() {
        let (out, _) = records(&[plain("public", "t", "2fa-code", "text", false)]);
        assert!(out.contains("  \"2faCode\": string;\n"), "{}", out);
    }

    #[test]
    fn test_one_record_per_contiguous_table() {
        let columns = vec![
            plain("auth", "user", "id", "int4", false),
            plain("public", "post", "id", "int4", false),
            plain("public", "post", "title", "text", false),
            plain("public", "user", "id", "int4", false),
        ];
        let (out, stats) = records(&columns);
        assert_eq!(stats.records, 3);
        assert_eq!(stats.fields, 4);
        assert_eq!(out.matches("export interface").count(), 3);
        assert_eq!(out.matches("\n}\n").count(), 3);

        let post_open = out.find("export interface Post {").unwrap();
        let user_open = out.find("export interface User {").unwrap();
        let title = out.find("  title: string;").unwrap();
        assert!(post_open < title && title < user_open);
    }

    // =========================================================================
    // State machine
    // =========================================================================

    #[test]
    fn test_sections_cannot_be_revisited() {
        let overrides = HashMap::new();
        let mapper = TypeMapper::default();
        let mut sink = WriterSink::buffer();
        let names = NameTransformer::new(&overrides, FieldCase::Camel);
        let mut emitter = Emitter::new(&mut sink, names, &mapper);

        emitter.write_table_index(&[]).unwrap();
        assert_eq!(emitter.stage(), Some(Stage::TableIndex));
        let err = emitter.write_enums(&[]).unwrap_err();
        assert!(matches!(err, TypegenError::Emit(_)));
        assert!(emitter.write_table_index(&[]).is_err());
        emitter.write_records(&[]).unwrap();
    }

    #[test]
    fn test_nothing_after_close() {
        let overrides = HashMap::new();
        let mapper = TypeMapper::default();
        let mut sink = WriterSink::buffer();
        {
            let names = NameTransformer::new(&overrides, FieldCase::Camel);
            let mut emitter = Emitter::new(&mut sink, names, &mapper);
            emitter.finish().unwrap();
            assert_eq!(emitter.stage(), Some(Stage::Closed));
            assert!(emitter.write_suffix(None).is_err());
            assert!(emitter.finish().is_err());
        }
        assert!(sink.is_closed());
    }
}
