//! Generated SQL must be accepted by a real parser for the same dialect.
use sqlparser::dialect::{
    Dialect as ParserDialect, GenericDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect,
    SQLiteDialect,
};
use sqlparser::parser::Parser;
use sqlplan::ast::*;
use sqlplan::{compile, DialectKind};

use super::{departments, employees, options, ALL_DIALECTS};

fn parser_dialect(target: DialectKind) -> Box<dyn ParserDialect> {
    match target {
        DialectKind::Generic => Box::new(GenericDialect {}),
        DialectKind::Postgres => Box::new(PostgreSqlDialect {}),
        DialectKind::MySql => Box::new(MySqlDialect {}),
        DialectKind::MsSql => Box::new(MsSqlDialect {}),
        DialectKind::SQLite => Box::new(SQLiteDialect {}),
    }
}

fn assert_parses(stmt: &Statement, target: DialectKind) {
    let _ = env_logger::builder().is_test(true).try_init();

    let sql = compile(stmt, &options(target).inline_constants())
        .unwrap_or_else(|e| panic!("{target}: {e}"))
        .sql;
    let parsed = Parser::parse_sql(parser_dialect(target).as_ref(), &sql)
        .unwrap_or_else(|e| panic!("{target}: {e}\n{sql}"));
    assert_eq!(parsed.len(), 1, "{target}: {sql}");
}

fn selects() -> Vec<Statement> {
    let (e, d) = (employees(), departments());
    let paged = SelectStmt::new()
        .from(&e)
        .columns([e.col("id"), e.col("name")])
        .order_by(e.col("name"))
        .limit(10)
        .offset(20);
    let joined = SelectStmt::new()
        .from(&e)
        .left_join(&d, e.col("dept_id").eq(d.col("id")))
        .columns([e.col("name"), d.col("title")])
        .filter(e.col("hired").gt(Expr::typed_constant("2020-01-01", DataType::Date)));
    let grouped = SelectStmt::new()
        .from(&e)
        .columns([e.col("dept_id")])
        .select("n", Expr::count_star())
        .group_by(e.col("dept_id"))
        .having(Expr::count_star().gt(1));
    let set_op = SelectStmt::new()
        .from(&e)
        .columns([e.col("name")])
        .union(
            SelectStmt::new()
                .from(&d)
                .select("name", d.col("title"))
                .order_by(d.col("title"))
                .limit(3),
        )
        .order_by(Expr::column("name"));
    let correlated = SelectStmt::new()
        .from(&d)
        .columns([d.col("title")])
        .filter(Expr::exists(
            SelectStmt::new()
                .from(&e)
                .select("one", Expr::constant(1))
                .filter(e.col("dept_id").eq(d.col("id"))),
        ));

    vec![
        paged.into(),
        joined.into(),
        grouped.into(),
        set_op.into(),
        correlated.into(),
    ]
}

#[test]
fn test_selects_parse() {
    for stmt in selects() {
        for target in ALL_DIALECTS {
            assert_parses(&stmt, target);
        }
    }
}

#[test]
fn test_mutations_parse() {
    let users = Table::new("users")
        .column("id", DataType::Integer)
        .column("email", DataType::Text)
        .column("visits", DataType::Integer);
    let banned = Table::new("banned").column("email", DataType::Text);

    let upsert: Statement = InsertStmt::new(users.clone())
        .columns(["email", "visits"])
        .values(vec!["a@x".into(), 1.into()])
        .on_conflict_do_update(
            &["email"],
            vec![("visits", users.col("visits").add(Expr::excluded("visits")))],
        )
        .into();
    for target in [DialectKind::Postgres, DialectKind::SQLite, DialectKind::MySql] {
        assert_parses(&upsert, target);
    }

    let ignore: Statement = InsertStmt::new(users.clone())
        .columns(["email"])
        .values(vec!["a@x".into()])
        .ignore()
        .into();
    for target in [DialectKind::Postgres, DialectKind::SQLite, DialectKind::MySql] {
        assert_parses(&ignore, target);
    }

    let update: Statement = UpdateStmt::new(users.clone())
        .set("visits", 0)
        .from(&banned)
        .filter(users.col("email").eq(banned.col("email")))
        .into();
    assert_parses(&update, DialectKind::Postgres);

    let delete: Statement = DeleteStmt::new(users.clone())
        .using(&banned)
        .filter(users.col("email").eq(banned.col("email")))
        .returning_columns(&["id"])
        .into();
    assert_parses(&delete, DialectKind::Postgres);
    assert_parses(&delete, DialectKind::SQLite);
}
