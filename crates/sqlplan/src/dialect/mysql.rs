use std::sync::Arc;

use super::{
    Clause, DialectBuilder, DialectHandler, DialectKind, Features, JsonKey, Keyword, LiteralKind,
};
use crate::ast::{AggregateKind, BinaryOperator, BinaryPredicate, Interval, JoinKind, TypeKind};
use crate::{Error, Result};

#[derive(Debug)]
pub struct MySqlDialect;

impl DialectHandler for MySqlDialect {
    fn string_literal(&self, text: &str) -> String {
        let escaped = text.replace('\\', "\\\\").replace('\'', "''");
        format!("'{escaped}'")
    }

    /// MySQL intervals carry a single unit.
    fn interval_value(&self, interval: &Interval) -> Result<String> {
        match (interval.months, interval.days, interval.micros) {
            (0, 0, 0) => Ok("0 SECOND".to_string()),
            (m, 0, 0) if m % 12 == 0 => Ok(format!("{} YEAR", m / 12)),
            (m, 0, 0) => Ok(format!("{m} MONTH")),
            (0, d, 0) => Ok(format!("{d} DAY")),
            (0, 0, us) if us % 1_000_000 == 0 => Ok(format!("{} SECOND", us / 1_000_000)),
            (0, 0, us) => Ok(format!("{us} MICROSECOND")),
            _ => Err(Error::new_unsupported("INTERVAL with mixed units")),
        }
    }
}

pub(super) fn builder() -> DialectBuilder {
    DialectBuilder::new(DialectKind::MySql, Arc::new(MySqlDialect))
        .features(
            Features::UNSIGNED
                | Features::ROW_CONSTRUCTOR
                | Features::INSERT_PRIORITY
                | Features::INSERT_IGNORE
                | Features::UPSERT_ON_DUPLICATE
                | Features::LIMIT_OFFSET
                | Features::NAMED_WINDOWS
                | Features::JSON_FUNCTIONS
                | Features::MULTI_TABLE_MUTATION,
        )
        .quote('`', '`')
        .update_order(&[
            Clause::With,
            Clause::Update,
            Clause::Set,
            Clause::Where,
            Clause::OrderBy,
            Clause::Paging,
        ])
        .delete_order(&[
            Clause::With,
            Clause::Delete,
            Clause::Where,
            Clause::OrderBy,
            Clause::Paging,
        ])
        .formats(|r| {
            r.binary_ops.set_format_with_strength(
                BinaryOperator::Concat,
                "CONCAT({left:0}, {right:0})",
                100,
            );

            r.binary_predicates
                .alias(BinaryPredicate::Regex, "REGEXP")
                .alias(BinaryPredicate::IsNotDistinctFrom, "<=>")
                .set_format_with_strength(
                    BinaryPredicate::IsDistinctFrom,
                    "NOT ({left:0} <=> {right:0})",
                    4,
                )
                .set_format(
                    BinaryPredicate::ILike,
                    "LOWER({left:0}) LIKE LOWER({right:0})",
                )
                .set_format(
                    BinaryPredicate::NotILike,
                    "LOWER({left:0}) NOT LIKE LOWER({right:0})",
                );

            r.aggregates
                .alias(AggregateKind::BoolAnd, "MIN")
                .alias(AggregateKind::BoolOr, "MAX");

            r.joins.set_unsupported(&[JoinKind::Full]);

            r.keywords
                .alias(Keyword::DefaultValues, "VALUES ()")
                .set_format(Keyword::Excluded, "VALUES({column})")
                .set_format(Keyword::ValuesRow, "{keyword}({elements})")
                .set_cascading(
                    Keyword::Offset,
                    &[("unbounded", "LIMIT 18446744073709551615 {keyword} {offset}")],
                )
                .set_cascading(
                    Keyword::Delete,
                    &[("target", "{keyword} {target} FROM {table}")],
                );

            r.literals
                .alias(LiteralKind::TimestampTz, "TIMESTAMP")
                .set_format(LiteralKind::Point, "ST_GeomFromText('POINT({x} {y})')")
                .set_unsupported(&[LiteralKind::Array]);

            r.types
                .alias(TypeKind::Boolean, "SIGNED")
                .alias(TypeKind::SmallInt, "SIGNED")
                .alias(TypeKind::Integer, "SIGNED")
                .alias(TypeKind::BigInt, "SIGNED")
                .alias(TypeKind::UnsignedInteger, "UNSIGNED")
                .alias(TypeKind::UnsignedBigInt, "UNSIGNED")
                .alias(TypeKind::Real, "FLOAT")
                .alias(TypeKind::Double, "DOUBLE")
                .alias(TypeKind::Text, "CHAR")
                .alias(TypeKind::Varchar, "CHAR")
                .alias(TypeKind::Bytes, "BINARY")
                .set_format(TypeKind::Uuid, "CHAR(36)")
                .alias(TypeKind::Timestamp, "DATETIME")
                .alias(TypeKind::TimestampTz, "DATETIME")
                .set_unsupported(&[TypeKind::Interval, TypeKind::Array]);

            r.json
                .set_format(JsonKey::Pair, "{key}, {value}")
                .set_format(JsonKey::Geometry, "ST_AsGeoJSON({value})")
                .set_format(JsonKey::Binary, "HEX({value})");
        })
}
