//! Grouping of ordered rows into contiguous runs.

use crate::catalog::{ColumnMeta, TableIdentity};

/// Iterator over maximal runs of consecutive items sharing a key.
///
/// Items with equal keys that are not adjacent form separate runs; callers
/// rely on the catalog ordering to make each key's rows contiguous.
#[derive(Debug, Clone)]
pub struct Runs<'a, T, F> {
    rest: &'a [T],
    key: F,
}

/// Partition `items` into contiguous runs keyed by `key`.
pub fn runs<'a, T, K, F>(items: &'a [T], key: F) -> Runs<'a, T, F>
where
    K: PartialEq,
    F: Fn(&'a T) -> K,
{
    Runs { rest: items, key }
}

impl<'a, T, K, F> Iterator for Runs<'a, T, F>
where
    K: PartialEq,
    F: Fn(&'a T) -> K,
{
    type Item = &'a [T];

    fn next(&mut self) -> Option<Self::Item> {
        let items: &'a [T] = self.rest;
        let key = (self.key)(items.first()?);
        let len = items
            .iter()
            .position(|item| (self.key)(item) != key)
            .unwrap_or(items.len());
        let (run, rest) = items.split_at(len);
        self.rest = rest;
        Some(run)
    }
}

/// Distinct tables in first-seen order.
pub fn distinct_tables(columns: &[ColumnMeta]) -> Vec<TableIdentity> {
    runs(columns, |c| (c.schema.as_str(), c.table.as_str()))
        .map(|run| run[0].identity())
        .fold(Vec::new(), |mut tables, table| {
            if !tables.contains(&table) {
                tables.push(table);
            }
            tables
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(schema: &str, table: &str, name: &str) -> ColumnMeta {
        ColumnMeta {
            schema: schema.into(),
            table: table.into(),
            column: name.into(),
            nullable: false,
            default: None,
            native_type: "text".into(),
            udt_name: "text".into(),
            udt_schema: None,
        }
    }

    #[test]
    fn test_runs_split_on_key_change() {
        let items = [1, 1, 2, 3, 3, 3];
        let lens: Vec<usize> = runs(&items, |i| *i).map(|r| r.len()).collect();
        assert_eq!(lens, vec![2, 1, 3]);
    }

    #[test]
    fn test_runs_empty_and_restartable() {
        let empty: [u8; 0] = [];
        assert_eq!(runs(&empty, |i| *i).count(), 0);

        let items = ["a", "a", "b"];
        let grouped = runs(&items, |s| *s);
        assert_eq!(grouped.clone().count(), 2);
        assert_eq!(grouped.count(), 2);
    }

    #[test]
    fn test_non_adjacent_keys_form_separate_runs() {
        let items = ["a", "b", "a"];
        assert_eq!(runs(&items, |s| *s).count(), 3);
    }

    #[test]
    fn test_run_count_matches_distinct_tables() {
        let columns = vec![
            column("auth", "user", "id"),
            column("public", "post", "id"),
            column("public", "post", "title"),
            column("public", "user", "id"),
            column("public", "user", "email"),
        ];
        let tables = distinct_tables(&columns);
        assert_eq!(
            tables,
            vec![
                TableIdentity::new("auth", "user"),
                TableIdentity::new("public", "post"),
                TableIdentity::new("public", "user"),
            ]
        );
        assert_eq!(
            runs(&columns, |c| (c.schema.as_str(), c.table.as_str())).count(),
            tables.len()
        );
    }
}
