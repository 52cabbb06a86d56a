//! Property-style checks for classification and synthesis over families of
//! statements.

use sqlbench_core::{
    classify, synthesize_delete, synthesize_insert, synthesize_update, ReadOnlyReason, ResultSet,
    Scalar, Verdict,
};

fn result_with(columns: &[&str]) -> ResultSet {
    let row = columns.iter().map(|_| Scalar::Text("v".into())).collect();
    ResultSet::new(columns.iter().map(|c| (*c).to_string()).collect(), vec![row]).unwrap()
}

#[test]
fn join_in_any_case_is_read_only() {
    let with_id = result_with(&["id", "name"]);
    for sql in [
        "SELECT * FROM a JOIN b ON a.id = b.a_id",
        "select * from a join b on a.id = b.a_id",
        "SELECT * FROM a\nINNER JoIn b\nON a.id = b.a_id",
        "SELECT * FROM a LEFT OUTER JOIN b USING (id)",
        "SELECT * FROM a CROSS JOIN b",
    ] {
        assert_eq!(
            classify(sql, &with_id),
            Verdict::ReadOnly(ReadOnlyReason::Join),
            "{sql}"
        );
    }
}

#[test]
fn missing_id_is_read_only_regardless_of_sql() {
    for columns in [&["name"][..], &["user_id", "total"][..], &["identifier"][..]] {
        let result = result_with(columns);
        for sql in [
            "SELECT * FROM users",
            "SELECT * FROM a JOIN b ON 1 = 1",
            "SELECT * FROM a, b",
            "SELECT name FROM t GROUP BY name",
        ] {
            assert_eq!(
                classify(sql, &result),
                Verdict::ReadOnly(ReadOnlyReason::NoIdColumn),
                "{sql} / {columns:?}"
            );
        }
    }
}

#[test]
fn comma_separated_from_is_multiple_tables() {
    let with_id = result_with(&["id"]);
    for sql in [
        "SELECT * FROM a, b",
        "SELECT * FROM a,b WHERE a.id = b.id",
        "select a.id from a , b limit 3",
        "SELECT * FROM a, b;",
    ] {
        assert_eq!(
            classify(sql, &with_id),
            Verdict::ReadOnly(ReadOnlyReason::MultipleTables),
            "{sql}"
        );
    }
}

#[test]
fn group_by_is_read_only() {
    let result = result_with(&["id", "n"]);
    assert_eq!(
        classify("SELECT id, count(*) AS n FROM t group by id", &result),
        Verdict::ReadOnly(ReadOnlyReason::GroupBy)
    );
}

#[test]
fn plain_selects_are_editable() {
    let result = result_with(&["Id", "name"]);
    for (sql, table) in [
        ("SELECT * FROM users", "users"),
        ("SELECT id, name FROM users WHERE name LIKE 'a%' ORDER BY id", "users"),
        ("SELECT * FROM main.users LIMIT 50", "main.users"),
        ("SELECT * FROM `users`", "users"),
    ] {
        assert_eq!(
            classify(sql, &result),
            Verdict::Editable {
                table: table.into(),
                id_column: "Id".into()
            },
            "{sql}"
        );
    }
}

#[test]
fn synthesized_statements_match_exact_text() {
    assert_eq!(
        synthesize_update("users", "id", 5, "name", "O'Brien"),
        "UPDATE users SET name = 'O''Brien' WHERE id = 5"
    );
    assert!(synthesize_update("users", "id", 5, "name", "").contains("= NULL"));
    assert_eq!(
        synthesize_insert("t", &[("a", "1"), ("b", "")]),
        "INSERT INTO t (a, b) VALUES ('1', NULL)"
    );
    assert_eq!(
        synthesize_delete("t", "id", "9"),
        "DELETE FROM t WHERE id = 9"
    );
}
