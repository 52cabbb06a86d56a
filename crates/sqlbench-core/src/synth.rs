//! Statement synthesis for inline edits.
//!
//! Every function here is pure: it returns SQL text and never executes it.
//!
//! Values are always inlined as text literals. The empty string maps to
//! `NULL`; any other value is single-quoted with embedded quotes doubled.
//! No numeric or boolean coercion happens, so the database applies its own
//! conversion rules for the target column.
//!
//! Table names, column names and row ids are interpolated unescaped. They
//! originate from the extractor and the result schema rather than from free
//! text entry, and the query service rejects malformed statements.

use std::fmt::Display;

use crate::classify::is_id_column;

/// Column name fragments that mark server-defaulted columns.
pub const SERVER_DEFAULTED_MARKERS: [&str; 3] = ["created_at", "log_time", "timestamp"];

/// Returns the inline SQL literal for an edited value.
///
/// # Example
///
/// ```rust
/// use sqlbench_core::synth::literal;
///
/// assert_eq!(literal(""), "NULL");
/// assert_eq!(literal("it's"), "'it''s'");
/// ```
#[must_use]
pub fn literal(value: &str) -> String {
    if value.is_empty() {
        return String::from("NULL");
    }
    let escaped = value.replace('\'', "''");
    format!("'{escaped}'")
}

/// Builds `UPDATE <table> SET <column> = <literal> WHERE <id_column> = <row_id>`.
#[must_use]
pub fn synthesize_update(
    table: &str,
    id_column: &str,
    row_id: impl Display,
    column: &str,
    new_value: &str,
) -> String {
    format!(
        "UPDATE {table} SET {column} = {} WHERE {id_column} = {row_id}",
        literal(new_value)
    )
}

/// Builds `INSERT INTO <table> (<cols>) VALUES (<literals>)`.
///
/// Columns appear in the order given. With no values at all the statement
/// falls back to `INSERT INTO <table> DEFAULT VALUES`.
#[must_use]
pub fn synthesize_insert<K, V>(table: &str, values: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    if values.is_empty() {
        return format!("INSERT INTO {table} DEFAULT VALUES");
    }

    let columns: Vec<&str> = values.iter().map(|(k, _)| k.as_ref()).collect();
    let literals: Vec<String> = values.iter().map(|(_, v)| literal(v.as_ref())).collect();

    format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        columns.join(", "),
        literals.join(", ")
    )
}

/// Builds `DELETE FROM <table> WHERE <id_column> = <row_id>`.
#[must_use]
pub fn synthesize_delete(table: &str, id_column: &str, row_id: impl Display) -> String {
    format!("DELETE FROM {table} WHERE {id_column} = {row_id}")
}

/// Returns the columns a new row needs values for.
///
/// The id column and columns the server is assumed to default (names
/// containing `created_at`, `log_time` or `timestamp`) are left out.
pub fn insertable_columns<'a, I>(columns: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    columns
        .into_iter()
        .filter(|c| !is_id_column(c))
        .filter(|c| !SERVER_DEFAULTED_MARKERS.iter().any(|m| c.contains(m)))
        .cloned()
        .collect()
}
