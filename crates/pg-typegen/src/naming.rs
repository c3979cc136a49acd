//! Identifier naming for generated declarations.
//!
//! Catalog identifiers are snake_case SQL names; declarations use PascalCase
//! type names and (by default) camelCase field names. An explicit override
//! table is consulted before any automatic transform, and entities outside
//! the default schema carry their schema name as a prefix so that
//! `public.user` and `auth.user` become `User` and `AuthUser`.

use std::collections::HashMap;

use crate::config::FieldCase;

/// The schema whose entities are emitted without a prefix.
pub const DEFAULT_SCHEMA: &str = "public";

/// Transform a raw identifier into a PascalCase name.
///
/// Splits on every non-alphanumeric character, capitalizes the first letter
/// of each segment and lower-cases the rest. Total: an identifier with no
/// alphanumeric characters yields an empty string.
pub fn pascal_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for segment in raw.split(|c: char| !c.is_alphanumeric()) {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            for c in chars {
                out.extend(c.to_lowercase());
            }
        }
    }
    out
}

/// Transform a raw identifier into a camelCase name.
pub fn camel_case(raw: &str) -> String {
    let pascal = pascal_case(raw);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => pascal,
    }
}

/// Whether `name` can be written as a bare property name or type name,
/// i.e. matches `[A-Za-z$_][A-Za-z$_0-9]*`.
pub fn is_bare_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '$' || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '$' || c == '_')
}

/// Render a string as a double-quoted literal.
pub fn string_literal(value: &str) -> String {
    // Serializing a str to JSON cannot fail.
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
}

/// Property name for a field: bare when possible, quoted otherwise.
pub fn property_name(name: &str) -> String {
    if is_bare_identifier(name) {
        name.to_string()
    } else {
        string_literal(name)
    }
}

fn declaration_safe(name: String) -> String {
    match name.chars().next() {
        Some(c) if !c.is_ascii_digit() => name,
        _ => format!("_{}", name),
    }
}

/// Deterministic naming with an immutable override table.
#[derive(Debug, Clone, Copy)]
pub struct NameTransformer<'a> {
    overrides: &'a HashMap<String, String>,
    field_case: FieldCase,
}

impl<'a> NameTransformer<'a> {
    pub fn new(overrides: &'a HashMap<String, String>, field_case: FieldCase) -> Self {
        Self {
            overrides,
            field_case,
        }
    }

    /// Override if present, otherwise PascalCase with a forced uppercase
    /// first character.
    pub fn resolve_name(&self, raw: &str) -> String {
        match self.overrides.get(raw) {
            Some(name) => name.clone(),
            None => pascal_case(raw),
        }
    }

    /// Declaration name for a record or enum in `schema`.
    ///
    /// Checks the override table for `schema.name` first, then resolves the
    /// bare name and prefixes the resolved schema name outside the default
    /// schema. A derived name that would start with a digit, or is empty,
    /// gets a leading `_`. Override values are used as given.
    pub fn type_name(&self, schema: &str, raw: &str) -> String {
        if let Some(name) = self.overrides.get(&format!("{}.{}", schema, raw)) {
            return name.clone();
        }
        if schema == DEFAULT_SCHEMA || schema.is_empty() {
            if let Some(name) = self.overrides.get(raw) {
                return name.clone();
            }
            return declaration_safe(pascal_case(raw));
        }
        declaration_safe(format!("{}{}", self.resolve_name(schema), self.resolve_name(raw)))
    }

    /// Field name for a column, before quoting.
    pub fn field_name(&self, column: &str) -> String {
        if let Some(name) = self.overrides.get(column) {
            return name.clone();
        }
        match self.field_case {
            FieldCase::Camel => camel_case(column),
            FieldCase::Preserve => column.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_overrides() -> HashMap<String, String> {
        HashMap::new()
    }

    // =========================================================================
    // Case conversion
    // =========================================================================

    #[test]
    fn test_pascal_case() {
        assert_eq!(pascal_case("user"), "User");
        assert_eq!(pascal_case("user_account"), "UserAccount");
        assert_eq!(pascal_case("log-event.v2"), "LogEventV2");
        assert_eq!(pascal_case("HTTP_status"), "HttpStatus");
        assert_eq!(pascal_case("__x__"), "X");
    }

    #[test]
    fn test_pascal_case_is_total() {
        assert_eq!(pascal_case(""), "");
        assert_eq!(pascal_case("___"), "");
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("author_id"), "authorId");
        assert_eq!(camel_case("id"), "id");
        assert_eq!(camel_case("Created_At"), "createdAt");
        assert_eq!(camel_case(""), "");
    }

    // =========================================================================
    // Identifier quoting
    // =========================================================================

    #[test]
    fn test_is_bare_identifier() {
        assert!(is_bare_identifier("email"));
        assert!(is_bare_identifier("$ref"));
        assert!(is_bare_identifier("_private2"));
        assert!(!is_bare_identifier("2fa"));
        assert!(!is_bare_identifier("first name"));
        assert!(!is_bare_identifier("a-b"));
        assert!(!is_bare_identifier(""));
    }

    #[test]
    fn test_property_name_quotes_when_needed() {
        assert_eq!(property_name("email"), "email");
        assert_eq!(property_name("first name"), "\"first name\"");
        assert_eq!(property_name("say \"hi\""), "\"say \\\"hi\\\"\"");
    }

    // =========================================================================
    // Overrides and schema qualification
    // =========================================================================

    #[test]
    fn test_type_name_schema_prefix() {
        let overrides = no_overrides();
        let names = NameTransformer::new(&overrides, FieldCase::Camel);
        assert_eq!(names.type_name("public", "user"), "User");
        assert_eq!(names.type_name("auth", "user"), "AuthUser");
        assert_eq!(names.type_name("audit_log", "event"), "AuditLogEvent");
    }

    #[test]
    fn test_overrides_win() {
        let mut overrides = no_overrides();
        overrides.insert("user_account".into(), "Account".into());
        overrides.insert("auth.user".into(), "Principal".into());
        overrides.insert("e_mail".into(), "email".into());
        let names = NameTransformer::new(&overrides, FieldCase::Camel);

        assert_eq!(names.resolve_name("user_account"), "Account");
        assert_eq!(names.type_name("public", "user_account"), "Account");
        assert_eq!(names.type_name("billing", "user_account"), "BillingAccount");
        assert_eq!(names.type_name("auth", "user"), "Principal");
        assert_eq!(names.field_name("e_mail"), "email");
    }

    #[test]
    fn test_type_name_never_starts_with_digit() {
        let overrides = no_overrides();
        let names = NameTransformer::new(&overrides, FieldCase::Camel);
        assert_eq!(names.type_name("public", "2fa_codes"), "_2faCodes");
        assert_eq!(names.type_name("public", "___"), "_");
        assert_eq!(names.type_name("auth", "2fa_codes"), "Auth2faCodes");
        assert_eq!(names.type_name("9lives", "cat"), "_9livesCat");
        assert!(is_bare_identifier(&names.type_name("public", "2fa_codes")));
    }

    #[test]
    fn test_field_case_preserve() {
        let overrides = no_overrides();
        let names = NameTransformer::new(&overrides, FieldCase::Preserve);
        assert_eq!(names.field_name("author_id"), "author_id");
    }
}
