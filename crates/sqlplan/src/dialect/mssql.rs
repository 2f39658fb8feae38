use std::sync::Arc;

use super::{
    Clause, DialectBuilder, DialectHandler, DialectKind, Features, JsonKey, Keyword, LiteralKind,
    PlaceholderStyle,
};
use crate::ast::{
    AggregateKind, BinaryOperator, BinaryPredicate, SetOperator, TypeKind, UnaryPredicate,
};

#[derive(Debug)]
pub struct MsSqlDialect;

impl DialectHandler for MsSqlDialect {
    fn fetch_requires_order(&self) -> bool {
        true
    }
}

pub(super) fn builder() -> DialectBuilder {
    DialectBuilder::new(DialectKind::MsSql, Arc::new(MsSqlDialect))
        .features(
            Features::TOP | Features::RETURNING | Features::UPDATE_FROM | Features::DELETE_USING,
        )
        .quote('[', ']')
        .placeholder(PlaceholderStyle::Named)
        .select_order(&[
            Clause::With,
            Clause::Select,
            Clause::Distinct,
            Clause::Top,
            Clause::Projection,
            Clause::From,
            Clause::Joins,
            Clause::Where,
            Clause::GroupBy,
            Clause::Having,
            Clause::OrderBy,
            Clause::Paging,
            Clause::ForJson,
        ])
        .insert_order(&[Clause::With, Clause::Insert, Clause::Output, Clause::Values])
        .update_order(&[
            Clause::With,
            Clause::Update,
            Clause::Set,
            Clause::Output,
            Clause::From,
            Clause::Where,
        ])
        .delete_order(&[
            Clause::With,
            Clause::Delete,
            Clause::Output,
            Clause::Using,
            Clause::Where,
        ])
        .formats(|r| {
            r.binary_ops
                .alias(BinaryOperator::Concat, "+")
                .set_unsupported(&[BinaryOperator::JsonGet, BinaryOperator::JsonGetText]);

            r.unary_predicates
                .set_format_with_strength(UnaryPredicate::IsTrue, "{operand} = 1", 6)
                .set_format_with_strength(UnaryPredicate::IsFalse, "{operand} = 0", 6);

            r.binary_predicates
                .alias(BinaryPredicate::ILike, "LIKE")
                .alias(BinaryPredicate::NotILike, "NOT LIKE")
                .set_unsupported(&[BinaryPredicate::Regex]);

            r.aggregates
                .alias(AggregateKind::StdDev, "STDEV")
                .alias(AggregateKind::Variance, "VAR")
                .alias(AggregateKind::BoolAnd, "MIN")
                .alias(AggregateKind::BoolOr, "MAX");

            r.set_ops
                .set_unsupported(&[SetOperator::IntersectAll, SetOperator::ExceptAll]);

            r.keywords
                .alias(Keyword::WithRecursive, "WITH")
                .alias(Keyword::Using, "FROM")
                // no boolean literals in a search condition
                .set_format_with_strength(Keyword::TruePredicate, "1 = 1", 6)
                .set_format_with_strength(Keyword::FalsePredicate, "1 = 0", 6);

            r.literals
                .alias(LiteralKind::True, "1")
                .alias(LiteralKind::False, "0")
                .set_format(LiteralKind::Text, "N{value}")
                .set_format(LiteralKind::Date, "CAST({value} AS DATE)")
                .set_format(LiteralKind::Time, "CAST({value} AS TIME)")
                .set_format(LiteralKind::Timestamp, "CAST({value} AS DATETIME2)")
                .set_format(LiteralKind::TimestampTz, "CAST({value} AS DATETIMEOFFSET)")
                .set_format(LiteralKind::Point, "geometry::Point({x}, {y}, 0)")
                .set_format(LiteralKind::Json, "{value}")
                .set_format(LiteralKind::Bytes, "0x{hex}")
                .set_unsupported(&[LiteralKind::Interval, LiteralKind::Array]);

            r.types
                .alias(TypeKind::Boolean, "BIT")
                .alias(TypeKind::Double, "FLOAT")
                .set_format(TypeKind::Text, "NVARCHAR(MAX)")
                .alias(TypeKind::Varchar, "NVARCHAR")
                .set_format(TypeKind::Bytes, "VARBINARY(MAX)")
                .alias(TypeKind::Uuid, "UNIQUEIDENTIFIER")
                .alias(TypeKind::Timestamp, "DATETIME2")
                .alias(TypeKind::TimestampTz, "DATETIMEOFFSET")
                .set_format(TypeKind::Json, "NVARCHAR(MAX)")
                .alias(TypeKind::Point, "GEOMETRY")
                .set_unsupported(&[TypeKind::Interval, TypeKind::Array]);

            r.json
                .set_format(JsonKey::Nested, "JSON_QUERY({value})")
                .set_format(JsonKey::Geometry, "{value}.STAsText()")
                .set_format(JsonKey::Binary, "CONVERT(VARCHAR(MAX), {value}, 2)");
        })
}
