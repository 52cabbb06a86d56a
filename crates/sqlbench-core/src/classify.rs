//! Editability classification.
//!
//! A result is editable only when every guard below clears it. The guards
//! run in a fixed order and the first failure is the one reported:
//!
//! 1. the table name can be extracted
//! 2. the result has an `id` column (any case)
//! 3. the statement does not mention `join`
//! 4. the FROM clause lists a single table
//! 5. the statement has no `group by`
//!
//! Anything not explicitly cleared stays read-only. A false negative costs
//! the user a convenience; a false positive would let an edit land on rows
//! the result never showed.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::extract::{extract_from_clause_body, extract_table};
use crate::result::ResultSet;

static GROUP_BY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)group\s+by").expect("group by pattern is valid"));

/// Why a result was classified read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadOnlyReason {
    /// No `SELECT ... FROM <table>` pattern was found.
    UnparseableTable,
    /// The result has no column named `id`.
    NoIdColumn,
    /// The statement contains a join.
    Join,
    /// The FROM clause names more than one table.
    MultipleTables,
    /// The statement aggregates rows.
    GroupBy,
}

impl ReadOnlyReason {
    /// Returns the human-readable reason.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnparseableTable => "Cannot parse table name",
            Self::NoIdColumn => "No 'id' column",
            Self::Join => "JOIN detected",
            Self::MultipleTables => "Multiple tables detected",
            Self::GroupBy => "GROUP BY detected",
        }
    }
}

impl fmt::Display for ReadOnlyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of classifying a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Rows map one-to-one onto rows of `table`, keyed by `id_column`.
    Editable {
        /// Table the result was selected from.
        table: String,
        /// Name of the id column, with its original casing.
        id_column: String,
    },
    /// The result must be shown without edit affordances.
    ReadOnly(ReadOnlyReason),
}

impl Verdict {
    /// Returns whether the verdict allows editing.
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        matches!(self, Self::Editable { .. })
    }

    /// Returns the read-only reason, if any.
    #[must_use]
    pub const fn reason(&self) -> Option<ReadOnlyReason> {
        match self {
            Self::Editable { .. } => None,
            Self::ReadOnly(reason) => Some(*reason),
        }
    }
}

/// Returns whether a column name is the row identifier (`id`, any case).
#[must_use]
pub fn is_id_column(name: &str) -> bool {
    name.eq_ignore_ascii_case("id")
}

/// Classifies a result produced by `sql`.
#[must_use]
pub fn classify(sql: &str, result: &ResultSet) -> Verdict {
    let Some(table) = extract_table(sql) else {
        return Verdict::ReadOnly(ReadOnlyReason::UnparseableTable);
    };

    let Some(id_idx) = result.column_index(is_id_column) else {
        return Verdict::ReadOnly(ReadOnlyReason::NoIdColumn);
    };

    let lower = sql.to_lowercase();
    if lower.contains("join") {
        return Verdict::ReadOnly(ReadOnlyReason::Join);
    }

    if extract_from_clause_body(sql).contains(',') {
        return Verdict::ReadOnly(ReadOnlyReason::MultipleTables);
    }

    if GROUP_BY.is_match(sql) {
        return Verdict::ReadOnly(ReadOnlyReason::GroupBy);
    }

    Verdict::Editable {
        table,
        id_column: result.columns()[id_idx].clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::Scalar;

    fn result_with(columns: &[&str]) -> ResultSet {
        let row = columns.iter().map(|_| Scalar::Int(1)).collect();
        ResultSet::new(columns.iter().map(|c| (*c).to_string()).collect(), vec![row]).unwrap()
    }

    #[test]
    fn test_editable_single_table() {
        let verdict = classify("SELECT * FROM users WHERE age > 30", &result_with(&["id", "age"]));
        assert_eq!(
            verdict,
            Verdict::Editable {
                table: "users".into(),
                id_column: "id".into()
            }
        );
    }

    #[test]
    fn test_id_column_case_is_preserved() {
        let verdict = classify("SELECT * FROM users", &result_with(&["name", "ID"]));
        assert_eq!(
            verdict,
            Verdict::Editable {
                table: "users".into(),
                id_column: "ID".into()
            }
        );
    }

    #[test]
    fn test_guards_report_first_failure() {
        // Unparseable table wins over the missing id column.
        assert_eq!(
            classify("SHOW TABLES", &result_with(&["name"])).reason(),
            Some(ReadOnlyReason::UnparseableTable)
        );
        // Missing id wins over the join.
        assert_eq!(
            classify("SELECT * FROM a JOIN b ON a.x = b.x", &result_with(&["x"])).reason(),
            Some(ReadOnlyReason::NoIdColumn)
        );
        // Join wins over group by.
        assert_eq!(
            classify(
                "SELECT a.id FROM a LEFT JOIN b ON a.id = b.a GROUP BY a.id",
                &result_with(&["id"])
            )
            .reason(),
            Some(ReadOnlyReason::Join)
        );
    }

    #[test]
    fn test_similar_names_are_not_id() {
        let verdict = classify("SELECT * FROM users", &result_with(&["user_id", "idx", "uuid"]));
        assert_eq!(verdict.reason(), Some(ReadOnlyReason::NoIdColumn));
    }

    #[test]
    fn test_implicit_join() {
        let verdict = classify("SELECT * FROM a, b", &result_with(&["id"]));
        assert_eq!(verdict, Verdict::ReadOnly(ReadOnlyReason::MultipleTables));
    }

    #[test]
    fn test_group_by_spanning_whitespace() {
        let verdict = classify(
            "SELECT id, count(*) FROM t GROUP\n  BY id",
            &result_with(&["id", "count(*)"]),
        );
        assert_eq!(verdict.reason(), Some(ReadOnlyReason::GroupBy));
    }

    #[test]
    fn test_reason_text() {
        assert_eq!(ReadOnlyReason::Join.to_string(), "JOIN detected");
        assert_eq!(ReadOnlyReason::NoIdColumn.to_string(), "No 'id' column");
    }
}
