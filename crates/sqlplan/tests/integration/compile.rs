//! Statements compiled end to end through the public API.
use std::collections::HashMap;

use insta::assert_snapshot;
use rstest::rstest;
use sqlplan::ast::*;
use sqlplan::{compile, compile_with, DialectKind, Features, Options};

use super::{departments, employees, options, ALL_DIALECTS};

fn by_department() -> Statement {
    let e = employees();
    SelectStmt::new()
        .from(&e)
        .columns([e.col("name")])
        .filter(e.col("dept_id").eq(Expr::param("dept")))
        .filter(e.col("id").gt(10))
        .limit(5)
        .into()
}

#[rstest]
#[case::postgres(DialectKind::Postgres, "SELECT name FROM employees AS e WHERE dept_id = $1 AND id > $2 LIMIT 5")]
#[case::mysql(DialectKind::MySql, "SELECT name FROM employees AS e WHERE dept_id = ? AND id > ? LIMIT 5")]
#[case::sqlite(DialectKind::SQLite, "SELECT name FROM employees AS e WHERE dept_id = ? AND id > ? LIMIT 5")]
#[case::mssql(DialectKind::MsSql, "SELECT TOP (5) name FROM employees AS e WHERE dept_id = @dept AND id > @p1")]
fn test_placeholders(#[case] target: DialectKind, #[case] expected: &str) {
    let out = compile(&by_department(), &options(target)).unwrap();
    assert_eq!(out.sql, expected);

    assert_eq!(out.params.len(), 2);
    assert_eq!(out.params[0].name.as_deref(), Some("dept"));
    assert_eq!(out.params[1].value, Some(Value::Int(10)));
    // positional placeholders cannot be referenced by name
    let positional = matches!(target, DialectKind::MySql | DialectKind::SQLite);
    assert_eq!(out.names.get("dept").is_none(), positional);

    let args = HashMap::from([("dept".to_string(), Value::Int(3))]);
    assert_eq!(out.bind(&args).unwrap(), vec![Value::Int(3), Value::Int(10)]);
}

#[test]
fn test_inline_constants() {
    let out = compile(
        &by_department(),
        &options(DialectKind::Postgres).inline_constants(),
    )
    .unwrap();
    assert_snapshot!(out.sql, @"SELECT name FROM employees AS e WHERE dept_id = $1 AND id > 10 LIMIT 5");
    assert_eq!(out.params.len(), 1);
}

#[test]
fn test_deterministic() {
    let e = employees();
    let d = departments();
    let stmt: Statement = SelectStmt::new()
        .from(&e)
        .inner_join(&d, e.col("dept_id").eq(d.col("id")))
        .columns([e.col("name"), d.col("title"), e.col("id")])
        .into();

    for target in ALL_DIALECTS {
        let first = compile(&stmt, &options(target)).unwrap().sql;
        let second = compile(&stmt, &options(target)).unwrap().sql;
        similar_asserts::assert_eq!(first, second);
    }
}

#[test]
fn test_simplification_keeps_ambiguous_names() {
    let e = employees();
    let d = departments();
    let stmt: Statement = SelectStmt::new()
        .from(&e)
        .inner_join(&d, e.col("dept_id").eq(d.col("id")))
        .columns([e.col("name"), d.col("title"), e.col("id")])
        .into();

    // `id` exists on both sides of the join
    assert_snapshot!(
        compile(&stmt, &options(DialectKind::Postgres)).unwrap().sql,
        @"SELECT name, title, e.id FROM employees AS e INNER JOIN departments AS d ON dept_id = d.id"
    );
    assert_snapshot!(
        compile(&stmt, &options(DialectKind::Postgres).with_simplify_references(false)).unwrap().sql,
        @"SELECT e.name, d.title, e.id FROM employees AS e INNER JOIN departments AS d ON e.dept_id = d.id"
    );
}

#[test]
fn test_set_op_branches() {
    let e = employees();
    let d = departments();
    let names = SelectStmt::new().from(&e).columns([e.col("name")]);
    let titles = SelectStmt::new()
        .from(&d)
        .select("name", d.col("title"))
        .order_by(d.col("title"))
        .limit(3);
    let stmt: Statement = names
        .union_all(titles)
        .order_by(Expr::column("name"))
        .limit(5)
        .into();

    let opts = |target| options(target).inline_constants();
    assert_snapshot!(
        compile(&stmt, &opts(DialectKind::SQLite)).unwrap().sql,
        @"SELECT name FROM employees AS e UNION ALL SELECT * FROM (SELECT title AS name FROM departments AS d ORDER BY title LIMIT 3) AS _s0 ORDER BY name LIMIT 5"
    );
    assert_snapshot!(
        compile(&stmt, &opts(DialectKind::MySql)).unwrap().sql,
        @"SELECT name FROM employees AS e UNION ALL SELECT * FROM (SELECT title AS name FROM departments AS d ORDER BY title LIMIT 3) AS _s0 ORDER BY name LIMIT 5"
    );
}

#[test]
fn test_feature_gating() {
    let e = employees();
    let stmt: Statement = DeleteStmt::new(e.clone())
        .filter(e.col("id").eq(1))
        .returning_columns(&["id"])
        .into();

    let dialect = DialectKind::Postgres
        .builder()
        .remove_support(Features::RETURNING)
        .build();
    let opts = Options::default().inline_constants();

    let err = compile_with(&stmt, &dialect, &opts).unwrap_err();
    assert_snapshot!(err, @"[E0101] RETURNING is not supported by dialect postgres");

    let out = compile_with(&stmt, &dialect, &opts.lenient()).unwrap();
    assert_snapshot!(out.sql, @"DELETE FROM employees WHERE id = 1");
    assert!(out.decoder.plan().affected_only);

    // the built-in dialect is left untouched
    assert!(DialectKind::Postgres.dialect().supports(Features::RETURNING));
}

#[test]
fn test_nested_needs_projection() {
    let e = employees();
    let d = departments();
    let nested = SelectStmt::new()
        .from(&e)
        .filter(e.col("dept_id").eq(d.col("id")));
    let stmt: Statement = SelectStmt::new()
        .from(&d)
        .select("staff", Expr::subquery(nested))
        .into();

    let err = compile(&stmt, &options(DialectKind::Postgres)).unwrap_err();
    assert_snapshot!(err, @"a nested select sub-query needs an explicit projection");
}

#[test]
fn test_options_from_json() {
    let opts: Options = serde_json::from_str(
        r#"{"target":"SQLite","format":true,"throw_error":true,"constants_as_params":false,
            "simplify_references":true,"raw":false,"array_mode":false,"affected_count":false,
            "detect":{"json":false,"date":false}}"#,
    )
    .unwrap();

    let e = employees();
    let stmt: Statement = SelectStmt::new()
        .from(&e)
        .columns([e.col("id")])
        .filter(e.col("id").gt(1))
        .into();
    assert_snapshot!(compile(&stmt, &opts).unwrap().sql, @r"
    SELECT
      id
    FROM
      employees AS e
    WHERE
      id > 1
    ");
}
