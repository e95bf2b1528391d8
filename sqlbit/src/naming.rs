//! Naming rules for derived tables and columns.
//!
//! These names are the persisted schema, changing any of them is a schema migration.

pub const CHILD_SEPARATOR: &str = "__";
pub const FLATTEN_SEPARATOR: &str = "_";

/// Table holding the elements of vector field `field` of `parent_table`.
pub fn child_table_name(parent_table: &str, field: &str) -> String {
    format!("{parent_table}{CHILD_SEPARATOR}{field}")
}

/// Column in a child table that carries the parent's primary key value.
pub fn foreign_key_column(parent_table: &str, parent_key_column: &str) -> String {
    format!("{parent_table}{CHILD_SEPARATOR}{parent_key_column}")
}

/// Column of a composite sub-field flattened into its owner's table.
pub fn flattened_column(prefix: &str, column: &str) -> String {
    format!("{prefix}{FLATTEN_SEPARATOR}{column}")
}

pub(crate) fn prefixed(prefix: Option<&str>, column: &str) -> String {
    match prefix {
        Some(p) => flattened_column(p, column),
        None => column.to_string(),
    }
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn placeholder(column: &str) -> String {
    format!(":{column}")
}
