use std::sync::Arc;

use super::{
    Clause, DialectBuilder, DialectHandler, DialectKind, Features, JsonKey, Keyword, LiteralKind,
};
use crate::ast::{AggregateKind, BinaryPredicate, SetOperator, TypeKind};

#[derive(Debug)]
pub struct SQLiteDialect;

impl DialectHandler for SQLiteDialect {
    fn derived_column_aliases(&self) -> bool {
        false
    }
}

pub(super) fn builder() -> DialectBuilder {
    DialectBuilder::new(DialectKind::SQLite, Arc::new(SQLiteDialect))
        .features(
            Features::AGGREGATE_FILTER
                | Features::ON_CONFLICT
                | Features::INSERT_IGNORE
                | Features::RETURNING
                | Features::LIMIT_OFFSET
                | Features::NULLS_ORDERING
                | Features::NAMED_WINDOWS
                | Features::JSON_FUNCTIONS
                | Features::UPDATE_FROM,
        )
        .delete_order(&[Clause::With, Clause::Delete, Clause::Where, Clause::Returning])
        .formats(|r| {
            r.binary_predicates
                .set_format(
                    BinaryPredicate::ILike,
                    "LOWER({left:0}) LIKE LOWER({right:0})",
                )
                .set_format(
                    BinaryPredicate::NotILike,
                    "LOWER({left:0}) NOT LIKE LOWER({right:0})",
                )
                .alias(BinaryPredicate::Regex, "REGEXP")
                .alias(BinaryPredicate::IsDistinctFrom, "IS NOT")
                .alias(BinaryPredicate::IsNotDistinctFrom, "IS");

            r.aggregates
                .alias(AggregateKind::BoolAnd, "MIN")
                .alias(AggregateKind::BoolOr, "MAX")
                .set_unsupported(&[AggregateKind::StdDev, AggregateKind::Variance]);

            r.set_ops
                .set_unsupported(&[SetOperator::IntersectAll, SetOperator::ExceptAll]);

            r.keywords
                .alias(Keyword::InsertIgnore, "OR IGNORE")
                .alias(Keyword::Excluded, "excluded")
                .set_cascading(
                    Keyword::Offset,
                    &[("unbounded", "LIMIT -1 {keyword} {offset}")],
                );

            // dates and times are stored as text
            r.literals
                .set_format(LiteralKind::Date, "{value}")
                .set_format(LiteralKind::Time, "{value}")
                .set_format(LiteralKind::Timestamp, "{value}")
                .set_format(LiteralKind::TimestampTz, "{value}")
                .set_format(LiteralKind::Json, "json({value})")
                .set_unsupported(&[
                    LiteralKind::Interval,
                    LiteralKind::Point,
                    LiteralKind::Array,
                ]);

            r.types
                .alias(TypeKind::Boolean, "INTEGER")
                .alias(TypeKind::SmallInt, "INTEGER")
                .alias(TypeKind::BigInt, "INTEGER")
                .alias(TypeKind::Double, "REAL")
                .alias(TypeKind::Decimal, "NUMERIC")
                .alias(TypeKind::Varchar, "TEXT")
                .alias(TypeKind::Uuid, "TEXT")
                .alias(TypeKind::Date, "TEXT")
                .alias(TypeKind::Time, "TEXT")
                .alias(TypeKind::Timestamp, "TEXT")
                .alias(TypeKind::TimestampTz, "TEXT")
                .alias(TypeKind::Json, "TEXT")
                .alias(TypeKind::Bytes, "BLOB")
                .set_unsupported(&[TypeKind::Interval, TypeKind::Point, TypeKind::Array]);

            r.json
                .alias(JsonKey::Object, "json_object")
                .set_format(JsonKey::Pair, "{key}, {value}")
                .set_format(
                    JsonKey::Rows,
                    "coalesce(json_group_array({value}), json_array())",
                )
                .set_format(JsonKey::Nested, "json({value})")
                .set_format(JsonKey::Binary, "hex({value})");
        })
}
