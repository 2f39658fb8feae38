//! The query plan: expressions, sources and statements.
//!
//! Trees are built with consuming builder methods, each returning the grown
//! value, and are never mutated by the compiler or the decoder.

mod expr;
mod source;
mod stmt;
mod types;
mod value;

pub use expr::*;
pub use source::*;
pub use stmt::*;
pub use types::*;
pub use value::*;

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;

    #[test]
    fn test_builders_compose() {
        let users = Table::new("users")
            .alias("u")
            .column("id", DataType::Integer)
            .column("name", DataType::Text);

        let stmt = SelectStmt::new()
            .from(&users)
            .columns([users.col("id")])
            .select("upper_name", Expr::func("UPPER", vec![users.col("name")]))
            .filter(users.col("id").gt(10))
            .having(Expr::count_star().gt(1))
            .having(Expr::count_star().lt(5))
            .first();

        assert_eq!(stmt.projection[0].alias, "id");
        assert_eq!(stmt.projection[1].alias, "upper_name");
        assert_eq!(stmt.shape, Shape::First);
        assert!(matches!(
            stmt.having,
            Some(Expr::Conditions {
                op: Conjunction::And,
                ..
            })
        ));
        assert_eq!(
            users.col("id"),
            Expr::Field {
                source: "u".to_string(),
                name: "id".to_string(),
                data_type: Some(DataType::Integer)
            }
        );
    }

    #[test]
    fn test_exposed_columns() {
        let users = Table::new("users").column("id", DataType::Integer);
        let derived = Source::derived(
            "d",
            SelectStmt::new()
                .from(&users)
                .select("n", Expr::count_star()),
        );
        assert_eq!(derived.exposed_columns(), Some(vec!["n".to_string()]));
        assert_eq!(Source::from(Table::new("t")).exposed_columns(), None);

        let joined = Source::join(JoinKind::Left, &users, Some(Expr::constant(true)));
        assert_eq!(joined.alias(), "users");
        assert_eq!(joined.exposed_columns(), Some(vec!["id".to_string()]));
    }

    #[test]
    fn test_serde() {
        let stmt: Statement = InsertStmt::new(Table::new("t"))
            .columns(["a"])
            .values(vec![Expr::constant(1)])
            .into();

        let json = serde_json::to_string(&stmt).unwrap();
        assert_snapshot!(json, @r#"{"Insert":{"with":[],"table":{"schema":null,"name":"t","alias":"t","columns":[]},"columns":["a"],"source":{"Values":[[{"Constant":{"value":{"Int":1},"data_type":null}}]]},"on_conflict":null,"ignore":false,"priority":null,"returning":[],"shape":"Rows"}}"#);

        let back: Statement = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stmt);
    }
}
