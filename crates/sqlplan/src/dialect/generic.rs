//! The generic template every dialect starts from: ANSI spellings, FETCH
//! paging and JSON_* building functions.
use std::sync::Arc;

use strum::IntoEnumIterator;

use super::{
    Clause, DialectBuilder, DialectHandler, DialectKind, Features, JsonKey, Keyword, LiteralKind,
    Registries,
};
use crate::ast::{AggregateKind, JoinKind, TypeKind};
use crate::format::FormatRegistry;

#[derive(Debug)]
pub struct GenericDialect;

impl DialectHandler for GenericDialect {}

pub(super) const FEATURES: Features = Features::AGGREGATE_FILTER
    .union(Features::ROW_CONSTRUCTOR)
    .union(Features::NULLS_ORDERING)
    .union(Features::NAMED_WINDOWS)
    .union(Features::JSON_FUNCTIONS);

pub(super) const SELECT_ORDER: [Clause; 12] = [
    Clause::With,
    Clause::Select,
    Clause::Distinct,
    Clause::Projection,
    Clause::From,
    Clause::Joins,
    Clause::Where,
    Clause::GroupBy,
    Clause::Having,
    Clause::Windows,
    Clause::OrderBy,
    Clause::Paging,
];

pub(super) const INSERT_ORDER: [Clause; 5] = [
    Clause::With,
    Clause::Insert,
    Clause::Values,
    Clause::Upsert,
    Clause::Returning,
];

pub(super) const UPDATE_ORDER: [Clause; 6] = [
    Clause::With,
    Clause::Update,
    Clause::Set,
    Clause::From,
    Clause::Where,
    Clause::Returning,
];

pub(super) const DELETE_ORDER: [Clause; 5] = [
    Clause::With,
    Clause::Delete,
    Clause::Using,
    Clause::Where,
    Clause::Returning,
];

pub(super) fn builder() -> DialectBuilder {
    DialectBuilder::new(DialectKind::Generic, Arc::new(GenericDialect))
}

pub(super) fn registries() -> Registries {
    let mut aggregates = FormatRegistry::new("{keyword}({distinct}{arg})");
    for kind in AggregateKind::iter() {
        // `filter` is passed when the dialect has FILTER, `filter_case` otherwise
        aggregates.set_cascading(
            kind,
            &[
                ("filter", "{keyword}({distinct}{arg}) FILTER (WHERE {filter})"),
                (
                    "filter_case",
                    "{keyword}({distinct}CASE WHEN {filter_case} THEN {arg} END)",
                ),
            ],
        );
    }

    let mut joins = FormatRegistry::new("{keyword} {source}");
    for kind in JoinKind::iter() {
        joins.set_cascading(kind, &[("condition", "{keyword} {source} ON {condition}")]);
    }

    Registries {
        unary_ops: FormatRegistry::new("{keyword}{operand}"),
        binary_ops: FormatRegistry::new("{left} {keyword} {right}"),
        unary_predicates: FormatRegistry::new("{operand} {keyword}"),
        binary_predicates: FormatRegistry::new("{left} {keyword} {right}"),
        aggregates,
        joins,
        set_ops: FormatRegistry::new("{keyword}"),
        keywords: keywords(),
        literals: literals(),
        types: types(),
        json: json(),
    }
}

fn keywords() -> FormatRegistry<Keyword> {
    let mut r = FormatRegistry::new("{keyword}");
    r.set_format(Keyword::DistinctOn, "{keyword} ({exprs})")
        .set_format(Keyword::Top, "{keyword} ({limit})")
        .set_format(Keyword::Limit, "{keyword} {limit}")
        .set_format(Keyword::Offset, "{keyword} {offset}")
        .set_cascading(
            Keyword::Fetch,
            &[
                ("limit", "OFFSET {offset} ROWS FETCH NEXT {limit} ROWS ONLY"),
                ("*", "OFFSET {offset} ROWS"),
            ],
        )
        .set_format(Keyword::FetchOrder, "{keyword} (SELECT NULL)")
        .set_cascading(
            Keyword::ForJson,
            &[
                (
                    "single",
                    "{keyword} PATH, INCLUDE_NULL_VALUES, WITHOUT_ARRAY_WRAPPER",
                ),
                ("*", "{keyword} PATH, INCLUDE_NULL_VALUES"),
            ],
        )
        .set_format(Keyword::Insert, "{keyword}{modifiers} INTO {table}{columns}")
        .set_format(Keyword::OnConflict, "{keyword}{target} {action}")
        .set_format(Keyword::OnDuplicateKey, "{keyword} {assignments}")
        .set_format(Keyword::Excluded, "{keyword}.{column}")
        .set_format(Keyword::Update, "{keyword} {table}")
        .set_format(Keyword::Set, "{keyword} {assignments}")
        .set_format(Keyword::Delete, "{keyword} FROM {table}")
        .set_format(Keyword::Cast, "{keyword}({operand:0} AS {type})")
        .set_format(Keyword::Not, "{keyword} {operand}")
        .set_format(Keyword::Exists, "{keyword} ({query})")
        .set_format(Keyword::NotExists, "{keyword} ({query})")
        .set_format(Keyword::In, "{value} {keyword} ({list})")
        .set_format(Keyword::NotIn, "{value} {keyword} ({list})")
        .set_format(Keyword::Between, "{value} {keyword} {low} AND {high}")
        .set_format(Keyword::NotBetween, "{value} {keyword} {low} AND {high}")
        .set_format(Keyword::Row, "{keyword}({elements})")
        .set_format(Keyword::ValuesRow, "({elements})")
        .set_format(Keyword::Over, "{expr} {keyword} {window}");
    r
}

fn literals() -> FormatRegistry<LiteralKind> {
    let mut r = FormatRegistry::new("{keyword} {value}");
    r.set_format(LiteralKind::Null, "{keyword}")
        .set_format(LiteralKind::True, "{keyword}")
        .set_format(LiteralKind::False, "{keyword}")
        .set_format(LiteralKind::Text, "{value}")
        .set_format(LiteralKind::Bytes, "X'{hex}'")
        .set_format(LiteralKind::Point, "{keyword}({x}, {y})")
        .set_format(LiteralKind::Json, "CAST({value} AS {keyword})")
        .set_format(LiteralKind::Array, "{keyword}[{elements}]");
    r
}

fn types() -> FormatRegistry<TypeKind> {
    let mut r = FormatRegistry::new("{keyword}{args}");
    r.set_format(TypeKind::Custom, "{name}{args}")
        .set_format(TypeKind::Array, "{element} {keyword}");
    r
}

fn json() -> FormatRegistry<JsonKey> {
    let mut r = FormatRegistry::new("{keyword}({args})");
    r.set_format(JsonKey::Object, "{keyword}({pairs})")
        .set_format(JsonKey::Pair, "{key} VALUE {value}")
        .set_format(JsonKey::Rows, "COALESCE({keyword}({value}), JSON_ARRAY())")
        .set_format(JsonKey::Nested, "{value}")
        .set_format(JsonKey::Geometry, "{value}")
        .set_format(JsonKey::Binary, "{value}");
    r
}
