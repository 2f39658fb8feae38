//! Compiling a statement, then decoding what a driver would return for it.
use chrono::NaiveDate;
use indexmap::IndexMap;
use insta::assert_snapshot;
use sqlplan::ast::*;
use sqlplan::{compile, DetectOptions, DialectKind, RawResult};

use super::{departments, employees, options};

fn staff_of_department(shape: Shape) -> Statement {
    let (e, d) = (employees(), departments());
    let staff: Statement = SelectStmt::new()
        .from(&e)
        .columns([e.col("name"), e.col("hired")])
        .filter(e.col("dept_id").eq(d.col("id")))
        .into();
    SelectStmt::new()
        .from(&d)
        .columns([d.col("title")])
        .select("staff", Expr::subquery(staff.with_shape(shape)))
        .into()
}

#[test]
fn test_insert_returning() {
    let e = employees();
    let stmt: Statement = InsertStmt::new(e)
        .columns(["name", "hired"])
        .values(vec![Expr::constant("Ann"), Expr::typed_constant("2024-01-02", DataType::Date)])
        .returning_columns(&["id", "hired"])
        .first()
        .into();

    let out = compile(&stmt, &options(DialectKind::Postgres)).unwrap();
    assert_snapshot!(out.sql, @"INSERT INTO employees (name, hired) VALUES ($1, $2) RETURNING id, hired");

    let raw = RawResult::new([vec![Value::from("41"), Value::from("2024-01-02")]]);
    let decoded = out.decoder.decode(&raw).unwrap();
    let row = decoded.as_object().unwrap();
    assert_eq!(row["id"], Value::Int(41));
    assert_eq!(
        row["hired"],
        Value::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
    );
}

#[test]
fn test_dropped_returning_counts_rows() {
    let e = employees();
    let stmt: Statement = UpdateStmt::new(e.clone())
        .set("name", Expr::constant("x"))
        .filter(e.col("id").eq(1))
        .returning_columns(&["id"])
        .into();

    let out = compile(&stmt, &options(DialectKind::MySql).lenient()).unwrap();
    assert_snapshot!(out.sql, @"UPDATE employees SET name = ? WHERE id = ?");

    let decoded = out.decoder.decode(&RawResult::affected(2)).unwrap();
    assert_eq!(decoded, Value::UInt(2));
}

#[test]
fn test_nested_rows_postgres() {
    let out = compile(&staff_of_department(Shape::Rows), &options(DialectKind::Postgres)).unwrap();

    let raw = RawResult::new([
        vec![
            Value::from("Sales"),
            Value::Json(serde_json::json!([
                {"name": "Ann", "hired": "2020-05-01"},
                {"name": "Bo", "hired": null},
            ])),
        ],
        vec![Value::from("Empty"), Value::Json(serde_json::json!([]))],
    ]);
    let decoded = out.decoder.decode(&raw).unwrap();
    assert_snapshot!(
        decoded.to_json(),
        @r#"[{"title":"Sales","staff":[{"name":"Ann","hired":"2020-05-01"},{"name":"Bo","hired":null}]},{"title":"Empty","staff":[]}]"#
    );

    let rows = decoded.as_array().unwrap();
    let staff = rows[0].as_object().unwrap()["staff"].as_array().unwrap();
    assert!(staff[0].as_object().unwrap()["hired"].is_date());
}

#[test]
fn test_nested_list_mssql() {
    let (e, d) = (employees(), departments());
    let names = SelectStmt::new()
        .from(&e)
        .columns([e.col("hired")])
        .filter(e.col("dept_id").eq(d.col("id")))
        .list();
    let stmt: Statement = SelectStmt::new()
        .from(&d)
        .columns([d.col("title")])
        .select("hired", Expr::subquery(names))
        .into();

    let out = compile(&stmt, &options(DialectKind::MsSql)).unwrap();
    assert!(out.sql.contains("FOR JSON PATH"));

    // FOR JSON renders list elements as single-key objects
    let raw = RawResult::new([vec![
        Value::from("Sales"),
        Value::from(r#"[{"hired":"2020-05-01"},{"hired":"2021-06-02"}]"#),
    ]]);
    let decoded = out.decoder.decode(&raw).unwrap();
    assert_snapshot!(
        decoded.to_json(),
        @r#"[{"title":"Sales","hired":["2020-05-01","2021-06-02"]}]"#
    );
}

#[test]
fn test_array_mode_and_named_rows() {
    let out = compile(
        &staff_of_department(Shape::First),
        &options(DialectKind::SQLite).with_array_mode(true),
    )
    .unwrap();

    let row = IndexMap::from([
        ("staff".to_string(), Value::from(r#"{"name":"Ann","hired":"2020-05-01"}"#)),
        ("title".to_string(), Value::from("Sales")),
    ]);
    let decoded = out.decoder.decode(&RawResult::new([row])).unwrap();
    assert_snapshot!(
        decoded.to_json(),
        @r#"[["Sales",{"name":"Ann","hired":"2020-05-01"}]]"#
    );
}

#[test]
fn test_detection() {
    let logs = Table::new("logs")
        .untyped_column("at")
        .untyped_column("payload");
    let stmt: Statement = SelectStmt::new()
        .from(&logs)
        .columns([logs.col("at"), logs.col("payload")])
        .first()
        .into();

    let detect = DetectOptions::default().with_date(true).with_json(true);
    let out = compile(&stmt, &options(DialectKind::Postgres).with_detect(detect)).unwrap();

    let raw = RawResult::new([vec![
        Value::from("2024-01-02T03:04:05+01:00"),
        Value::from(r#"{"level":"warn"}"#),
    ]]);
    let decoded = out.decoder.decode(&raw).unwrap();
    let row = decoded.as_object().unwrap();
    assert!(row["at"].is_timestamp_tz());
    assert_eq!(row["payload"], Value::Json(serde_json::json!({"level": "warn"})));
}
