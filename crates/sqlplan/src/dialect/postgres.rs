use std::sync::Arc;

use super::{
    DialectBuilder, DialectHandler, DialectKind, Features, JsonKey, LiteralKind, PlaceholderStyle,
};
use crate::ast::{BinaryOperator, TypeKind};

#[derive(Debug)]
pub struct PostgresDialect;

impl DialectHandler for PostgresDialect {}

pub(super) fn builder() -> DialectBuilder {
    DialectBuilder::new(DialectKind::Postgres, Arc::new(PostgresDialect))
        .features(
            Features::AGGREGATE_FILTER
                | Features::DISTINCT_ON
                | Features::ROW_CONSTRUCTOR
                | Features::ON_CONFLICT
                | Features::RETURNING
                | Features::LIMIT_OFFSET
                | Features::NULLS_ORDERING
                | Features::NAMED_WINDOWS
                | Features::JSON_FUNCTIONS
                | Features::UPDATE_FROM
                | Features::DELETE_USING
                | Features::MUTATION_CTE,
        )
        .placeholder(PlaceholderStyle::Numbered)
        .formats(|r| {
            r.binary_ops.alias(BinaryOperator::BitXor, "#");

            r.literals
                .alias(LiteralKind::TimestampTz, "TIMESTAMPTZ")
                .set_format(LiteralKind::Interval, "{keyword} {value}")
                .set_format(LiteralKind::Point, "point({x}, {y})")
                .set_format(LiteralKind::Bytes, "decode('{hex}', 'hex')")
                .set_format(LiteralKind::Json, "{value}::json");

            r.types
                .alias(TypeKind::TimestampTz, "TIMESTAMPTZ")
                .alias(TypeKind::Bytes, "BYTEA")
                .set_format(TypeKind::Array, "{element}[]");

            r.json
                .alias(JsonKey::Object, "json_build_object")
                .set_format(JsonKey::Pair, "{key}, {value}")
                .set_format(JsonKey::Rows, "coalesce(json_agg({value}), '[]')");
        })
}
