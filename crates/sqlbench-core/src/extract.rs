//! Lexical extraction of table references.
//!
//! This is pattern matching over raw text, not parsing. Both extractors are
//! deliberately shallow: when they cannot find what they look for the
//! classifier falls back to a read-only verdict.

use std::sync::LazyLock;

use regex::Regex;

/// `SELECT ... FROM <ident>`, where the identifier may be back-quoted and
/// may contain `.`, `_` and `-`.
static TABLE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\bSELECT\b.+?\bFROM\s+`?([\w.\-]+)`?").expect("table name pattern is valid")
});

/// Everything after `FROM` up to the next clause keyword, `;`, or the end.
static FROM_BODY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)\bFROM\s+(.+?)(?:\s+(?:WHERE|GROUP|ORDER|LIMIT|HAVING|WINDOW|UNION)\b|;|$)",
    )
    .expect("from clause pattern is valid")
});

/// Returns the first table named after `FROM` in a `SELECT` statement.
///
/// Returns `None` when no `SELECT ... FROM <name>` pattern is present. That
/// is the ordinary "cannot determine" outcome.
#[must_use]
pub fn extract_table(sql: &str) -> Option<String> {
    TABLE_NAME
        .captures(sql)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Returns the text of the FROM clause, or an empty string if there is none.
///
/// The body ends before the first of `WHERE`, `GROUP`, `ORDER`, `LIMIT`,
/// `HAVING`, `WINDOW` or `UNION`, before a `;`, or at the end of the text.
#[must_use]
pub fn extract_from_clause_body(sql: &str) -> String {
    FROM_BODY
        .captures(sql)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_table() {
        assert_eq!(extract_table("SELECT * FROM users").as_deref(), Some("users"));
    }

    #[test]
    fn test_case_insensitive_and_multiline() {
        let sql = "select id,\n  name\nfrom\n  orders\nwhere id > 3";
        assert_eq!(extract_table(sql).as_deref(), Some("orders"));
    }

    #[test]
    fn test_schema_qualified_and_quoted() {
        assert_eq!(
            extract_table("SELECT * FROM public.users").as_deref(),
            Some("public.users")
        );
        assert_eq!(
            extract_table("SELECT * FROM `audit-log` LIMIT 5").as_deref(),
            Some("audit-log")
        );
    }

    #[test]
    fn test_column_containing_from_is_not_a_keyword() {
        assert_eq!(
            extract_table("SELECT datefrom FROM events").as_deref(),
            Some("events")
        );
    }

    #[test]
    fn test_no_select_means_no_table() {
        assert_eq!(extract_table("UPDATE users SET a = 1"), None);
        assert_eq!(extract_table("DELETE FROM users"), None);
        assert_eq!(extract_table("SHOW TABLES"), None);
        assert_eq!(extract_table(""), None);
    }

    #[test]
    fn test_from_body_stops_at_clause_keywords() {
        assert_eq!(extract_from_clause_body("SELECT * FROM a WHERE x = 1"), "a");
        assert_eq!(extract_from_clause_body("SELECT * FROM a, b ORDER BY 1"), "a, b");
        assert_eq!(extract_from_clause_body("SELECT * FROM a LIMIT 10"), "a");
        assert_eq!(extract_from_clause_body("SELECT * FROM a;"), "a");
        assert_eq!(extract_from_clause_body("SELECT * FROM a, b"), "a, b");
    }

    #[test]
    fn test_from_body_ignores_select_list_commas() {
        assert_eq!(
            extract_from_clause_body("SELECT id, name FROM users WHERE id IN (1, 2)"),
            "users"
        );
    }

    #[test]
    fn test_from_body_empty_without_from() {
        assert_eq!(extract_from_clause_body("SELECT 1"), "");
    }
}
