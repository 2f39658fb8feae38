use enum_as_inner::EnumAsInner;
use serde::{Deserialize, Serialize};

use crate::ast::{DataType, Statement, Value};
use crate::format::FormatKey;

/// A scalar, predicate or aggregate expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, EnumAsInner)]
pub enum Expr {
    Constant {
        value: Value,
        data_type: Option<DataType>,
    },
    /// Column of a source in scope. An empty `source` refers to an output
    /// column by name (e.g. in the ORDER BY of a set operation).
    Field {
        source: String,
        name: String,
        data_type: Option<DataType>,
    },
    /// Placeholder whose value is supplied when the compiled statement is bound.
    Param {
        name: String,
        data_type: Option<DataType>,
    },
    Function {
        name: String,
        args: Vec<Expr>,
        data_type: Option<DataType>,
    },
    Aggregate {
        kind: AggregateKind,
        distinct: bool,
        /// `None` means `*`.
        arg: Option<Box<Expr>>,
        filter: Option<Box<Expr>>,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    UnaryPredicate {
        op: UnaryPredicate,
        operand: Box<Expr>,
    },
    BinaryPredicate {
        op: BinaryPredicate,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditions {
        op: Conjunction,
        operands: Vec<Expr>,
    },
    Not(Box<Expr>),
    Case {
        subject: Option<Box<Expr>>,
        arms: Vec<(Expr, Expr)>,
        otherwise: Option<Box<Expr>>,
    },
    Cast {
        data_type: DataType,
        operand: Box<Expr>,
    },
    Between {
        value: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    In {
        value: Box<Expr>,
        list: InList,
        negated: bool,
    },
    Exists {
        query: Box<Statement>,
        negated: bool,
    },
    Row(Vec<Expr>),
    /// Backend text inserted verbatim.
    Raw(String),
    /// The `DEFAULT` marker of INSERT values and UPDATE assignments.
    Default,
    /// A sub-query used as a value. Its [crate::ast::Shape] decides whether it
    /// renders as a scalar sub-query or is wrapped as JSON.
    Query(Box<Statement>),
    Over {
        expr: Box<Expr>,
        window: WindowRef,
    },
    /// Column of the row proposed for insertion, inside an upsert assignment.
    Excluded(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InList {
    Exprs(Vec<Expr>),
    Query(Box<Statement>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WindowRef {
    Named(String),
    Inline(WindowSpec),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WindowSpec {
    pub partition_by: Vec<Expr>,
    pub order_by: Vec<OrderBy>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub expr: Expr,
    pub direction: Direction,
    pub nulls: Option<Nulls>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::AsRefStr)]
pub enum Direction {
    #[default]
    #[strum(serialize = "ASC")]
    Asc,
    #[strum(serialize = "DESC")]
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Nulls {
    First,
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::AsRefStr)]
pub enum Conjunction {
    #[strum(serialize = "AND")]
    And,
    #[strum(serialize = "OR")]
    Or,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::IntoStaticStr, strum::EnumIter,
)]
pub enum UnaryOperator {
    #[strum(serialize = "-")]
    Neg,
    #[strum(serialize = "~")]
    BitNot,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::IntoStaticStr, strum::EnumIter,
)]
pub enum BinaryOperator {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "%")]
    Mod,
    #[strum(serialize = "||")]
    Concat,
    #[strum(serialize = "&")]
    BitAnd,
    #[strum(serialize = "|")]
    BitOr,
    #[strum(serialize = "^")]
    BitXor,
    /// JSON member access, yielding JSON.
    #[strum(serialize = "->")]
    JsonGet,
    /// JSON member access, yielding text.
    #[strum(serialize = "->>")]
    JsonGetText,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::IntoStaticStr, strum::EnumIter,
)]
pub enum UnaryPredicate {
    #[strum(serialize = "IS NULL")]
    IsNull,
    #[strum(serialize = "IS NOT NULL")]
    IsNotNull,
    #[strum(serialize = "IS TRUE")]
    IsTrue,
    #[strum(serialize = "IS FALSE")]
    IsFalse,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::IntoStaticStr, strum::EnumIter,
)]
pub enum BinaryPredicate {
    #[strum(serialize = "=")]
    Eq,
    #[strum(serialize = "<>")]
    Ne,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Lte,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Gte,
    #[strum(serialize = "LIKE")]
    Like,
    #[strum(serialize = "NOT LIKE")]
    NotLike,
    #[strum(serialize = "ILIKE")]
    ILike,
    #[strum(serialize = "NOT ILIKE")]
    NotILike,
    #[strum(serialize = "~")]
    Regex,
    #[strum(serialize = "IS DISTINCT FROM")]
    IsDistinctFrom,
    #[strum(serialize = "IS NOT DISTINCT FROM")]
    IsNotDistinctFrom,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::IntoStaticStr, strum::EnumIter,
)]
pub enum AggregateKind {
    #[strum(serialize = "COUNT")]
    Count,
    #[strum(serialize = "SUM")]
    Sum,
    #[strum(serialize = "AVG")]
    Avg,
    #[strum(serialize = "MIN")]
    Min,
    #[strum(serialize = "MAX")]
    Max,
    #[strum(serialize = "BOOL_AND")]
    BoolAnd,
    #[strum(serialize = "BOOL_OR")]
    BoolOr,
    #[strum(serialize = "STDDEV_SAMP")]
    StdDev,
    #[strum(serialize = "VAR_SAMP")]
    Variance,
}

impl FormatKey for UnaryOperator {}
impl FormatKey for BinaryOperator {}
impl FormatKey for UnaryPredicate {}
impl FormatKey for BinaryPredicate {}
impl FormatKey for AggregateKind {}

impl Expr {
    pub fn constant<V: Into<Value>>(value: V) -> Expr {
        Expr::Constant {
            value: value.into(),
            data_type: None,
        }
    }

    pub fn typed_constant<V: Into<Value>>(value: V, data_type: DataType) -> Expr {
        Expr::Constant {
            value: value.into(),
            data_type: Some(data_type),
        }
    }

    pub fn null() -> Expr {
        Expr::constant(Value::Null)
    }

    pub fn field(source: &str, name: &str) -> Expr {
        Expr::Field {
            source: source.to_string(),
            name: name.to_string(),
            data_type: None,
        }
    }

    /// Reference to an output column, never qualified.
    pub fn column(name: &str) -> Expr {
        Expr::field("", name)
    }

    pub fn param(name: &str) -> Expr {
        Expr::Param {
            name: name.to_string(),
            data_type: None,
        }
    }

    pub fn typed_param(name: &str, data_type: DataType) -> Expr {
        Expr::Param {
            name: name.to_string(),
            data_type: Some(data_type),
        }
    }

    pub fn raw(sql: &str) -> Expr {
        Expr::Raw(sql.to_string())
    }

    pub fn func(name: &str, args: Vec<Expr>) -> Expr {
        Expr::Function {
            name: name.to_string(),
            args,
            data_type: None,
        }
    }

    pub fn count_star() -> Expr {
        Expr::Aggregate {
            kind: AggregateKind::Count,
            distinct: false,
            arg: None,
            filter: None,
        }
    }

    pub fn aggregate(kind: AggregateKind, arg: Expr) -> Expr {
        Expr::Aggregate {
            kind,
            distinct: false,
            arg: Some(Box::new(arg)),
            filter: None,
        }
    }

    pub fn exists<S: Into<Statement>>(query: S) -> Expr {
        Expr::Exists {
            query: Box::new(query.into()),
            negated: false,
        }
    }

    pub fn not_exists<S: Into<Statement>>(query: S) -> Expr {
        Expr::Exists {
            query: Box::new(query.into()),
            negated: true,
        }
    }

    pub fn subquery<S: Into<Statement>>(query: S) -> Expr {
        Expr::Query(Box::new(query.into()))
    }

    pub fn row(elements: Vec<Expr>) -> Expr {
        Expr::Row(elements)
    }

    pub fn excluded(column: &str) -> Expr {
        Expr::Excluded(column.to_string())
    }

    pub fn all(operands: Vec<Expr>) -> Expr {
        Expr::Conditions {
            op: Conjunction::And,
            operands,
        }
    }

    pub fn any(operands: Vec<Expr>) -> Expr {
        Expr::Conditions {
            op: Conjunction::Or,
            operands,
        }
    }

    pub fn negate(operand: Expr) -> Expr {
        Expr::Not(Box::new(operand))
    }

    pub fn case(arms: Vec<(Expr, Expr)>, otherwise: Option<Expr>) -> Expr {
        Expr::Case {
            subject: None,
            arms,
            otherwise: otherwise.map(Box::new),
        }
    }

    pub fn simple_case(subject: Expr, arms: Vec<(Expr, Expr)>, otherwise: Option<Expr>) -> Expr {
        Expr::Case {
            subject: Some(Box::new(subject)),
            arms,
            otherwise: otherwise.map(Box::new),
        }
    }

    pub fn unary(self, op: UnaryOperator) -> Expr {
        Expr::Unary {
            op,
            operand: Box::new(self),
        }
    }

    pub fn binary<E: Into<Expr>>(self, op: BinaryOperator, right: E) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(self),
            right: Box::new(right.into()),
        }
    }

    pub fn predicate<E: Into<Expr>>(self, op: BinaryPredicate, right: E) -> Expr {
        Expr::BinaryPredicate {
            op,
            left: Box::new(self),
            right: Box::new(right.into()),
        }
    }

    pub fn is(self, op: UnaryPredicate) -> Expr {
        Expr::UnaryPredicate {
            op,
            operand: Box::new(self),
        }
    }

    pub fn add<E: Into<Expr>>(self, right: E) -> Expr {
        self.binary(BinaryOperator::Add, right)
    }

    pub fn sub<E: Into<Expr>>(self, right: E) -> Expr {
        self.binary(BinaryOperator::Sub, right)
    }

    pub fn mul<E: Into<Expr>>(self, right: E) -> Expr {
        self.binary(BinaryOperator::Mul, right)
    }

    pub fn div<E: Into<Expr>>(self, right: E) -> Expr {
        self.binary(BinaryOperator::Div, right)
    }

    pub fn concat<E: Into<Expr>>(self, right: E) -> Expr {
        self.binary(BinaryOperator::Concat, right)
    }

    pub fn eq<E: Into<Expr>>(self, right: E) -> Expr {
        self.predicate(BinaryPredicate::Eq, right)
    }

    pub fn ne<E: Into<Expr>>(self, right: E) -> Expr {
        self.predicate(BinaryPredicate::Ne, right)
    }

    pub fn lt<E: Into<Expr>>(self, right: E) -> Expr {
        self.predicate(BinaryPredicate::Lt, right)
    }

    pub fn lte<E: Into<Expr>>(self, right: E) -> Expr {
        self.predicate(BinaryPredicate::Lte, right)
    }

    pub fn gt<E: Into<Expr>>(self, right: E) -> Expr {
        self.predicate(BinaryPredicate::Gt, right)
    }

    pub fn gte<E: Into<Expr>>(self, right: E) -> Expr {
        self.predicate(BinaryPredicate::Gte, right)
    }

    pub fn like<E: Into<Expr>>(self, right: E) -> Expr {
        self.predicate(BinaryPredicate::Like, right)
    }

    pub fn ilike<E: Into<Expr>>(self, right: E) -> Expr {
        self.predicate(BinaryPredicate::ILike, right)
    }

    pub fn is_null(self) -> Expr {
        self.is(UnaryPredicate::IsNull)
    }

    pub fn is_not_null(self) -> Expr {
        self.is(UnaryPredicate::IsNotNull)
    }

    pub fn and<E: Into<Expr>>(self, right: E) -> Expr {
        Expr::all(vec![self, right.into()])
    }

    pub fn or<E: Into<Expr>>(self, right: E) -> Expr {
        Expr::any(vec![self, right.into()])
    }

    pub fn between<L: Into<Expr>, H: Into<Expr>>(self, low: L, high: H) -> Expr {
        Expr::Between {
            value: Box::new(self),
            low: Box::new(low.into()),
            high: Box::new(high.into()),
            negated: false,
        }
    }

    pub fn in_list<E: Into<Expr>>(self, list: impl IntoIterator<Item = E>) -> Expr {
        Expr::In {
            value: Box::new(self),
            list: InList::Exprs(list.into_iter().map(Into::into).collect()),
            negated: false,
        }
    }

    pub fn not_in_list<E: Into<Expr>>(self, list: impl IntoIterator<Item = E>) -> Expr {
        Expr::In {
            value: Box::new(self),
            list: InList::Exprs(list.into_iter().map(Into::into).collect()),
            negated: true,
        }
    }

    pub fn in_query<S: Into<Statement>>(self, query: S) -> Expr {
        Expr::In {
            value: Box::new(self),
            list: InList::Query(Box::new(query.into())),
            negated: false,
        }
    }

    pub fn cast(self, data_type: DataType) -> Expr {
        Expr::Cast {
            data_type,
            operand: Box::new(self),
        }
    }

    pub fn distinct(mut self) -> Expr {
        if let Expr::Aggregate { distinct, .. } = &mut self {
            *distinct = true;
        }
        self
    }

    /// Attaches a FILTER predicate to an aggregate; other expressions are
    /// returned unchanged.
    pub fn filter(mut self, predicate: Expr) -> Expr {
        if let Expr::Aggregate { filter, .. } = &mut self {
            *filter = Some(Box::new(predicate));
        }
        self
    }

    pub fn with_type(mut self, ty: DataType) -> Expr {
        match &mut self {
            Expr::Constant { data_type, .. }
            | Expr::Field { data_type, .. }
            | Expr::Param { data_type, .. }
            | Expr::Function { data_type, .. } => *data_type = Some(ty),
            _ => {}
        }
        self
    }

    pub fn over(self, window: &str) -> Expr {
        Expr::Over {
            expr: Box::new(self),
            window: WindowRef::Named(window.to_string()),
        }
    }

    pub fn over_spec(self, spec: WindowSpec) -> Expr {
        Expr::Over {
            expr: Box::new(self),
            window: WindowRef::Inline(spec),
        }
    }

    pub fn asc(self) -> OrderBy {
        OrderBy {
            expr: self,
            direction: Direction::Asc,
            nulls: None,
        }
    }

    pub fn desc(self) -> OrderBy {
        OrderBy {
            expr: self,
            direction: Direction::Desc,
            nulls: None,
        }
    }

    /// The declared type, where the node carries one. Window functions take
    /// the type of the function they wrap.
    pub fn data_type(&self) -> Option<&DataType> {
        match self {
            Expr::Constant { data_type, .. }
            | Expr::Field { data_type, .. }
            | Expr::Param { data_type, .. }
            | Expr::Function { data_type, .. } => data_type.as_ref(),
            Expr::Cast { data_type, .. } => Some(data_type),
            Expr::Over { expr, .. } => expr.data_type(),
            _ => None,
        }
    }

    /// Name a projection of this expression gets when no alias is given.
    pub(crate) fn implied_alias(&self) -> Option<&str> {
        match self {
            Expr::Field { name, .. } => Some(name),
            _ => None,
        }
    }
}

impl OrderBy {
    pub fn nulls_first(mut self) -> Self {
        self.nulls = Some(Nulls::First);
        self
    }

    pub fn nulls_last(mut self) -> Self {
        self.nulls = Some(Nulls::Last);
        self
    }
}

impl From<Expr> for OrderBy {
    fn from(expr: Expr) -> Self {
        expr.asc()
    }
}

impl WindowSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn partition_by(mut self, expr: Expr) -> Self {
        self.partition_by.push(expr);
        self
    }

    pub fn order_by<O: Into<OrderBy>>(mut self, order: O) -> Self {
        self.order_by.push(order.into());
        self
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Expr::constant(value)
    }
}

macro_rules! constant_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Expr {
                fn from(value: $t) -> Self {
                    Expr::constant(value)
                }
            }
        )*
    };
}

constant_from!(bool, i32, i64, u64, f64, &str, String);
