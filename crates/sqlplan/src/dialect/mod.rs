//! Dialects: how each node and clause is printed for one target engine.
//!
//! A [Dialect] bundles a [FormatRegistry] per node family with a feature
//! bitmask, identifier quoting, the placeholder style and the clause order of
//! each statement kind. Dialects are built once through a [DialectBuilder],
//! starting from the generic template, and are immutable afterwards.
//!
//! The general principle is to render constructs the way the generic dialect
//! does and only override what a target lacks or spells differently. When a
//! target lacks a feature, the compiler either picks the documented
//! equivalent rendering or raises an unsupported-feature error.
use std::collections::HashSet;
use std::fmt::{self, Debug};
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};
use std::sync::{Arc, OnceLock};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::ast::{
    AggregateKind, BinaryOperator, BinaryPredicate, Interval, JoinKind, SetOperator, TypeKind,
    UnaryOperator, UnaryPredicate,
};
use crate::format::{FormatKey, FormatRegistry};
use crate::utils::valid_ident;
use crate::Result;

mod generic;
mod keywords;
mod mssql;
mod mysql;
mod postgres;
mod sqlite;

pub use generic::GenericDialect;
pub use mssql::MsSqlDialect;
pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SQLiteDialect;

/// Built-in SQL dialects.
#[derive(
    Debug,
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
    Serialize,
    Default,
    Deserialize,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
    strum::VariantNames,
)]
#[strum(serialize_all = "lowercase")]
pub enum DialectKind {
    #[default]
    Generic,
    Postgres,
    MySql,
    MsSql,
    SQLite,
}

impl DialectKind {
    /// The process-wide instance of a built-in dialect.
    pub fn dialect(self) -> &'static Dialect {
        static GENERIC: OnceLock<Dialect> = OnceLock::new();
        static POSTGRES: OnceLock<Dialect> = OnceLock::new();
        static MYSQL: OnceLock<Dialect> = OnceLock::new();
        static MSSQL: OnceLock<Dialect> = OnceLock::new();
        static SQLITE: OnceLock<Dialect> = OnceLock::new();

        let cell = match self {
            DialectKind::Generic => &GENERIC,
            DialectKind::Postgres => &POSTGRES,
            DialectKind::MySql => &MYSQL,
            DialectKind::MsSql => &MSSQL,
            DialectKind::SQLite => &SQLITE,
        };
        cell.get_or_init(|| self.builder().build())
    }

    /// A builder preloaded with this dialect, for deriving a customised one.
    pub fn builder(self) -> DialectBuilder {
        match self {
            DialectKind::Generic => generic::builder(),
            DialectKind::Postgres => postgres::builder(),
            DialectKind::MySql => mysql::builder(),
            DialectKind::MsSql => mssql::builder(),
            DialectKind::SQLite => sqlite::builder(),
        }
    }
}

/// Capability bits of a dialect.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Features(u32);

impl Features {
    pub const UNSIGNED: Features = Features(1 << 0);
    /// `agg(x) FILTER (WHERE ...)`
    pub const AGGREGATE_FILTER: Features = Features(1 << 1);
    pub const DISTINCT_ON: Features = Features(1 << 2);
    /// `ROW(a, b)`
    pub const ROW_CONSTRUCTOR: Features = Features(1 << 3);
    /// `INSERT LOW_PRIORITY | DELAYED | HIGH_PRIORITY`
    pub const INSERT_PRIORITY: Features = Features(1 << 4);
    pub const INSERT_IGNORE: Features = Features(1 << 5);
    /// `ON DUPLICATE KEY UPDATE`
    pub const UPSERT_ON_DUPLICATE: Features = Features(1 << 6);
    /// `ON CONFLICT (...) DO ...`
    pub const ON_CONFLICT: Features = Features(1 << 7);
    pub const RETURNING: Features = Features(1 << 8);
    /// `LIMIT n OFFSET m`, rather than `OFFSET m ROWS FETCH NEXT n ROWS ONLY`.
    pub const LIMIT_OFFSET: Features = Features(1 << 9);
    /// `SELECT TOP (n)`
    pub const TOP: Features = Features(1 << 10);
    pub const NULLS_ORDERING: Features = Features(1 << 11);
    /// `WINDOW w AS (...)`
    pub const NAMED_WINDOWS: Features = Features(1 << 12);
    /// JSON building functions, used to nest sub-queries.
    pub const JSON_FUNCTIONS: Features = Features(1 << 13);
    pub const UPDATE_FROM: Features = Features(1 << 14);
    pub const DELETE_USING: Features = Features(1 << 15);
    /// `UPDATE a JOIN b ...` / `DELETE a FROM a JOIN b ...`
    pub const MULTI_TABLE_MUTATION: Features = Features(1 << 16);
    /// INSERT / UPDATE / DELETE inside WITH.
    pub const MUTATION_CTE: Features = Features(1 << 17);

    const NAMES: [(Features, &'static str); 18] = [
        (Features::UNSIGNED, "UNSIGNED"),
        (Features::AGGREGATE_FILTER, "AGGREGATE_FILTER"),
        (Features::DISTINCT_ON, "DISTINCT_ON"),
        (Features::ROW_CONSTRUCTOR, "ROW_CONSTRUCTOR"),
        (Features::INSERT_PRIORITY, "INSERT_PRIORITY"),
        (Features::INSERT_IGNORE, "INSERT_IGNORE"),
        (Features::UPSERT_ON_DUPLICATE, "UPSERT_ON_DUPLICATE"),
        (Features::ON_CONFLICT, "ON_CONFLICT"),
        (Features::RETURNING, "RETURNING"),
        (Features::LIMIT_OFFSET, "LIMIT_OFFSET"),
        (Features::TOP, "TOP"),
        (Features::NULLS_ORDERING, "NULLS_ORDERING"),
        (Features::NAMED_WINDOWS, "NAMED_WINDOWS"),
        (Features::JSON_FUNCTIONS, "JSON_FUNCTIONS"),
        (Features::UPDATE_FROM, "UPDATE_FROM"),
        (Features::DELETE_USING, "DELETE_USING"),
        (Features::MULTI_TABLE_MUTATION, "MULTI_TABLE_MUTATION"),
        (Features::MUTATION_CTE, "MUTATION_CTE"),
    ];

    pub const fn empty() -> Self {
        Features(0)
    }

    pub const fn all() -> Self {
        Features((1 << Self::NAMES.len()) - 1)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Features) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Features) -> Self {
        Features(self.0 | other.0)
    }

    pub const fn difference(self, other: Features) -> Self {
        Features(self.0 & !other.0)
    }

    pub fn names(self) -> impl Iterator<Item = &'static str> {
        Self::NAMES
            .into_iter()
            .filter(move |(f, _)| self.contains(*f))
            .map(|(_, name)| name)
    }
}

impl Debug for Features {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Features({})", self.names().join(" | "))
    }
}

impl BitOr for Features {
    type Output = Features;
    fn bitor(self, rhs: Features) -> Features {
        self.union(rhs)
    }
}

impl BitOrAssign for Features {
    fn bitor_assign(&mut self, rhs: Features) {
        *self = self.union(rhs);
    }
}

impl BitAnd for Features {
    type Output = Features;
    fn bitand(self, rhs: Features) -> Features {
        Features(self.0 & rhs.0)
    }
}

impl Not for Features {
    type Output = Features;
    fn not(self) -> Features {
        Features::all().difference(self)
    }
}

/// Clause tokens, arranged per statement kind by each dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Clause {
    With,
    Select,
    Distinct,
    Top,
    Projection,
    From,
    Joins,
    Where,
    GroupBy,
    Having,
    Windows,
    OrderBy,
    Paging,
    ForJson,
    Insert,
    Values,
    Upsert,
    Update,
    Set,
    Delete,
    Using,
    Output,
    Returning,
}

/// Keywords and clause templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::IntoStaticStr, strum::EnumIter)]
pub enum Keyword {
    #[strum(serialize = "WITH")]
    With,
    #[strum(serialize = "WITH RECURSIVE")]
    WithRecursive,
    #[strum(serialize = "SELECT")]
    Select,
    #[strum(serialize = "DISTINCT")]
    Distinct,
    #[strum(serialize = "DISTINCT ON")]
    DistinctOn,
    #[strum(serialize = "TOP")]
    Top,
    #[strum(serialize = "FROM")]
    From,
    #[strum(serialize = "WHERE")]
    Where,
    #[strum(serialize = "GROUP BY")]
    GroupBy,
    #[strum(serialize = "HAVING")]
    Having,
    #[strum(serialize = "WINDOW")]
    Window,
    #[strum(serialize = "ORDER BY")]
    OrderBy,
    #[strum(serialize = "LIMIT")]
    Limit,
    #[strum(serialize = "OFFSET")]
    Offset,
    #[strum(serialize = "FETCH")]
    Fetch,
    /// Ordering added when paging requires one and the statement has none.
    #[strum(serialize = "ORDER BY")]
    FetchOrder,
    #[strum(serialize = "FOR JSON")]
    ForJson,
    #[strum(serialize = "INSERT")]
    Insert,
    #[strum(serialize = "IGNORE")]
    InsertIgnore,
    #[strum(serialize = "LOW_PRIORITY")]
    LowPriority,
    #[strum(serialize = "DELAYED")]
    Delayed,
    #[strum(serialize = "HIGH_PRIORITY")]
    HighPriority,
    #[strum(serialize = "VALUES")]
    Values,
    #[strum(serialize = "DEFAULT VALUES")]
    DefaultValues,
    #[strum(serialize = "ON CONFLICT")]
    OnConflict,
    #[strum(serialize = "ON DUPLICATE KEY UPDATE")]
    OnDuplicateKey,
    #[strum(serialize = "EXCLUDED")]
    Excluded,
    #[strum(serialize = "UPDATE")]
    Update,
    #[strum(serialize = "SET")]
    Set,
    #[strum(serialize = "DELETE")]
    Delete,
    #[strum(serialize = "USING")]
    Using,
    #[strum(serialize = "RETURNING")]
    Returning,
    #[strum(serialize = "OUTPUT")]
    Output,
    /// Pseudo table of an OUTPUT clause holding the new row values.
    #[strum(serialize = "inserted")]
    Inserted,
    /// Pseudo table of an OUTPUT clause holding the old row values.
    #[strum(serialize = "deleted")]
    Deleted,
    #[strum(serialize = "CAST")]
    Cast,
    #[strum(serialize = "NOT")]
    Not,
    #[strum(serialize = "DEFAULT")]
    Default,
    #[strum(serialize = "EXISTS")]
    Exists,
    #[strum(serialize = "NOT EXISTS")]
    NotExists,
    #[strum(serialize = "IN")]
    In,
    #[strum(serialize = "NOT IN")]
    NotIn,
    #[strum(serialize = "BETWEEN")]
    Between,
    #[strum(serialize = "NOT BETWEEN")]
    NotBetween,
    #[strum(serialize = "ROW")]
    Row,
    #[strum(serialize = "OVER")]
    Over,
    #[strum(serialize = "PARTITION BY")]
    PartitionBy,
    #[strum(serialize = "NULLS FIRST")]
    NullsFirst,
    #[strum(serialize = "NULLS LAST")]
    NullsLast,
    /// One row of an inline VALUES source.
    #[strum(serialize = "ROW")]
    ValuesRow,
    /// An empty conjunction.
    #[strum(serialize = "TRUE")]
    TruePredicate,
    /// An empty disjunction.
    #[strum(serialize = "FALSE")]
    FalsePredicate,
}

/// Literal forms, keyed by value kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::IntoStaticStr, strum::EnumIter)]
pub enum LiteralKind {
    #[strum(serialize = "NULL")]
    Null,
    #[strum(serialize = "TRUE")]
    True,
    #[strum(serialize = "FALSE")]
    False,
    #[strum(serialize = "")]
    Text,
    #[strum(serialize = "")]
    Bytes,
    #[strum(serialize = "DATE")]
    Date,
    #[strum(serialize = "TIME")]
    Time,
    #[strum(serialize = "TIMESTAMP")]
    Timestamp,
    #[strum(serialize = "TIMESTAMP WITH TIME ZONE")]
    TimestampTz,
    #[strum(serialize = "INTERVAL")]
    Interval,
    #[strum(serialize = "POINT")]
    Point,
    #[strum(serialize = "JSON")]
    Json,
    #[strum(serialize = "ARRAY")]
    Array,
}

/// Pieces used to nest a sub-query's rows as JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::IntoStaticStr, strum::EnumIter)]
pub enum JsonKey {
    /// An object built from `{pairs}`.
    #[strum(serialize = "JSON_OBJECT")]
    Object,
    /// One `{key}` / `{value}` entry of an object.
    #[strum(serialize = "")]
    Pair,
    /// Aggregates `{value}` over rows into an array, empty when there are no rows.
    #[strum(serialize = "JSON_ARRAYAGG")]
    Rows,
    /// Wraps a JSON-valued column so it embeds as JSON rather than as text.
    #[strum(serialize = "")]
    Nested,
    /// Wraps a geometry column so it can be embedded in JSON.
    #[strum(serialize = "")]
    Geometry,
    /// Wraps a binary column so it can be embedded in JSON.
    #[strum(serialize = "")]
    Binary,
}

impl FormatKey for Keyword {}
impl FormatKey for LiteralKind {}
impl FormatKey for JsonKey {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaceholderStyle {
    /// `?` for every parameter occurrence.
    Positional,
    /// `$1`, `$2`, ...; repeated named parameters reuse their number.
    Numbered,
    /// `@name`; inline values become `@p1`, `@p2`, ...
    Named,
}

/// Node kinds whose rendering needs code rather than a template.
pub trait DialectHandler: Debug + Send + Sync {
    /// A quoted string literal.
    fn string_literal(&self, text: &str) -> String {
        format!("'{}'", text.replace('\'', "''"))
    }

    /// Text substituted for `{value}` in an interval literal.
    fn interval_value(&self, interval: &Interval) -> Result<String> {
        Ok(self.string_literal(&interval.to_string()))
    }

    /// Whether OFFSET / FETCH is only valid after an ORDER BY.
    fn fetch_requires_order(&self) -> bool {
        false
    }

    /// Whether a derived table may rename its columns, `AS v (a, b)`.
    fn derived_column_aliases(&self) -> bool {
        true
    }
}

/// Every format registry of a dialect.
#[derive(Debug, Clone)]
pub struct Registries {
    pub unary_ops: FormatRegistry<UnaryOperator>,
    pub binary_ops: FormatRegistry<BinaryOperator>,
    pub unary_predicates: FormatRegistry<UnaryPredicate>,
    pub binary_predicates: FormatRegistry<BinaryPredicate>,
    pub aggregates: FormatRegistry<AggregateKind>,
    pub joins: FormatRegistry<JoinKind>,
    pub set_ops: FormatRegistry<SetOperator>,
    pub keywords: FormatRegistry<Keyword>,
    pub literals: FormatRegistry<LiteralKind>,
    pub types: FormatRegistry<TypeKind>,
    pub json: FormatRegistry<JsonKey>,
}

#[derive(Debug, Clone)]
pub struct Dialect {
    kind: DialectKind,
    features: Features,
    reserved: HashSet<String>,
    quote: (char, char),
    placeholder: PlaceholderStyle,
    registries: Registries,
    select_order: Vec<Clause>,
    insert_order: Vec<Clause>,
    update_order: Vec<Clause>,
    delete_order: Vec<Clause>,
    handler: Arc<dyn DialectHandler>,
}

impl Dialect {
    pub fn kind(&self) -> DialectKind {
        self.kind
    }

    pub fn features(&self) -> Features {
        self.features
    }

    pub fn supports(&self, feature: Features) -> bool {
        self.features.contains(feature)
    }

    pub fn placeholder(&self) -> PlaceholderStyle {
        self.placeholder
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    pub fn handler(&self) -> &dyn DialectHandler {
        self.handler.as_ref()
    }

    pub fn select_order(&self) -> &[Clause] {
        &self.select_order
    }

    pub fn insert_order(&self) -> &[Clause] {
        &self.insert_order
    }

    pub fn update_order(&self) -> &[Clause] {
        &self.update_order
    }

    pub fn delete_order(&self) -> &[Clause] {
        &self.delete_order
    }

    pub fn is_reserved(&self, word: &str) -> bool {
        keywords::is_keyword(word) || self.reserved.contains(&word.to_ascii_lowercase())
    }

    /// Quotes an identifier unless it is a plain lowercase name that isn't
    /// reserved.
    pub fn quote_ident(&self, ident: &str) -> String {
        if valid_ident().is_match(ident) && !self.is_reserved(ident) {
            return ident.to_string();
        }
        let (open, close) = self.quote;
        let escaped = ident.replace(close, &format!("{close}{close}"));
        format!("{open}{escaped}{close}")
    }
}

/// Builds a [Dialect], starting from the generic template.
#[derive(Debug, Clone)]
pub struct DialectBuilder {
    dialect: Dialect,
}

impl DialectBuilder {
    pub fn new(kind: DialectKind, handler: Arc<dyn DialectHandler>) -> Self {
        DialectBuilder {
            dialect: Dialect {
                kind,
                features: generic::FEATURES,
                reserved: HashSet::new(),
                quote: ('"', '"'),
                placeholder: PlaceholderStyle::Positional,
                registries: generic::registries(),
                select_order: generic::SELECT_ORDER.to_vec(),
                insert_order: generic::INSERT_ORDER.to_vec(),
                update_order: generic::UPDATE_ORDER.to_vec(),
                delete_order: generic::DELETE_ORDER.to_vec(),
                handler,
            },
        }
    }

    pub fn features(mut self, features: Features) -> Self {
        self.dialect.features = features;
        self
    }

    pub fn add_support(mut self, features: Features) -> Self {
        self.dialect.features |= features;
        self
    }

    pub fn remove_support(mut self, features: Features) -> Self {
        self.dialect.features = self.dialect.features.difference(features);
        self
    }

    pub fn quote(mut self, open: char, close: char) -> Self {
        self.dialect.quote = (open, close);
        self
    }

    pub fn placeholder(mut self, style: PlaceholderStyle) -> Self {
        self.dialect.placeholder = style;
        self
    }

    /// Additional words that must be quoted when used as identifiers.
    pub fn reserve<I: IntoIterator<Item = S>, S: AsRef<str>>(mut self, words: I) -> Self {
        self.dialect
            .reserved
            .extend(words.into_iter().map(|w| w.as_ref().to_ascii_lowercase()));
        self
    }

    pub fn select_order(mut self, order: &[Clause]) -> Self {
        self.dialect.select_order = order.to_vec();
        self
    }

    pub fn insert_order(mut self, order: &[Clause]) -> Self {
        self.dialect.insert_order = order.to_vec();
        self
    }

    pub fn update_order(mut self, order: &[Clause]) -> Self {
        self.dialect.update_order = order.to_vec();
        self
    }

    pub fn delete_order(mut self, order: &[Clause]) -> Self {
        self.dialect.delete_order = order.to_vec();
        self
    }

    /// Edits the format registries.
    pub fn formats(mut self, edit: impl FnOnce(&mut Registries)) -> Self {
        edit(&mut self.dialect.registries);
        self
    }

    pub fn handler(mut self, handler: Arc<dyn DialectHandler>) -> Self {
        self.dialect.handler = handler;
        self
    }

    pub fn build(self) -> Dialect {
        log::debug!(
            "built dialect {} with {:?}",
            self.dialect.kind,
            self.dialect.features
        );
        self.dialect
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use insta::assert_debug_snapshot;
    use strum::IntoEnumIterator;

    use super::*;
    use crate::format::Params;

    #[test]
    fn test_dialect_names() {
        assert_eq!(DialectKind::from_str("mssql").unwrap(), DialectKind::MsSql);
        assert_eq!(DialectKind::SQLite.to_string(), "sqlite");
        assert!(DialectKind::from_str("oracle").is_err());
    }

    #[test]
    fn test_builtins_are_shared() {
        for kind in DialectKind::iter() {
            assert!(std::ptr::eq(kind.dialect(), kind.dialect()));
            assert_eq!(kind.dialect().kind(), kind);
        }
    }

    #[test]
    fn test_features() {
        let f = Features::LIMIT_OFFSET | Features::RETURNING;
        assert!(f.contains(Features::RETURNING));
        assert!(!f.contains(Features::TOP));
        assert!(!f.contains(Features::RETURNING | Features::TOP));
        assert_eq!((!f & f), Features::empty());
        assert!(Features::all().contains(Features::MUTATION_CTE));
        assert_debug_snapshot!(f, @"Features(RETURNING | LIMIT_OFFSET)");
    }

    #[test]
    fn test_remove_support() {
        let dialect = DialectKind::Postgres
            .builder()
            .remove_support(Features::DISTINCT_ON | Features::RETURNING)
            .build();
        assert!(!dialect.supports(Features::DISTINCT_ON));
        assert!(!dialect.supports(Features::RETURNING));
        assert!(dialect.supports(Features::LIMIT_OFFSET));

        // the shared instance is untouched
        assert!(DialectKind::Postgres.dialect().supports(Features::RETURNING));
    }

    #[test]
    fn test_quote_ident() {
        let pg = DialectKind::Postgres.dialect();
        assert_eq!(pg.quote_ident("users"), "users");
        assert_eq!(pg.quote_ident("order"), r#""order""#);
        assert_eq!(pg.quote_ident("UserId"), r#""UserId""#);
        assert_eq!(pg.quote_ident(r#"a"b"#), r#""a""b""#);

        let mysql = DialectKind::MySql.dialect();
        assert_eq!(mysql.quote_ident("select"), "`select`");

        let mssql = DialectKind::MsSql.dialect();
        assert_eq!(mssql.quote_ident("Order Id"), "[Order Id]");
        assert_eq!(mssql.quote_ident("a]b"), "[a]]b]");

        let custom = DialectKind::Generic.builder().reserve(["users"]).build();
        assert_eq!(custom.quote_ident("users"), r#""users""#);
    }

    #[test]
    fn test_formats_edit() {
        let dialect = DialectKind::Generic
            .builder()
            .formats(|r| {
                r.binary_ops.alias(BinaryOperator::Concat, "+");
            })
            .build();
        let params = Params::new().with("left", "a").with("right", "b");
        let text = dialect
            .registries()
            .binary_ops
            .get(BinaryOperator::Concat, &params, true)
            .unwrap();
        assert_eq!(text, "a + b");
    }
}
