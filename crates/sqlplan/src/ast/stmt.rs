use enum_as_inner::EnumAsInner;
use serde::{Deserialize, Serialize};

use crate::ast::{Expr, JoinKind, OrderBy, Source, Table, WindowSpec};
use crate::format::FormatKey;

/// A complete query-plan root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, EnumAsInner)]
pub enum Statement {
    Select(SelectStmt),
    Insert(InsertStmt),
    Update(UpdateStmt),
    Delete(DeleteStmt),
    SetOp(SetOpStmt),
}

/// How the rows a statement returns are handed back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Shape {
    /// Every row, as an object (or an array in array mode).
    #[default]
    Rows,
    /// The first row, or null when there is none.
    First,
    /// The single projected column of the first row.
    Value,
    /// The single projected column of every row.
    List,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cte {
    pub alias: String,
    pub statement: Statement,
    pub recursive: bool,
}

/// An aliased expression in an output column list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub alias: String,
    pub expr: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedWindow {
    pub name: String,
    pub spec: WindowSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Distinct {
    All,
    On(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SelectStmt {
    pub with: Vec<Cte>,
    pub distinct: Option<Distinct>,
    pub projection: Vec<Projection>,
    pub sources: Vec<Source>,
    /// AND-ed together.
    pub predicates: Vec<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub windows: Vec<NamedWindow>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub shape: Shape,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::IntoStaticStr, strum::EnumIter,
)]
pub enum SetOperator {
    #[strum(serialize = "UNION")]
    Union,
    #[strum(serialize = "UNION ALL")]
    UnionAll,
    #[strum(serialize = "INTERSECT")]
    Intersect,
    #[strum(serialize = "INTERSECT ALL")]
    IntersectAll,
    #[strum(serialize = "EXCEPT")]
    Except,
    #[strum(serialize = "EXCEPT ALL")]
    ExceptAll,
}

impl FormatKey for SetOperator {}

/// A chain of statements with identical projection shape, combined left to
/// right. Ordering and paging apply to the combined result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetOpStmt {
    pub with: Vec<Cte>,
    pub first: Box<Statement>,
    pub rest: Vec<(SetOperator, Statement)>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub shape: Shape,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub column: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InsertSource {
    Values(Vec<Vec<Expr>>),
    Query(Box<Statement>),
    DefaultValues,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsertPriority {
    Low,
    Delayed,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnConflict {
    /// Conflict target columns. Required by some dialects for DO UPDATE.
    pub target: Vec<String>,
    pub action: ConflictAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConflictAction {
    DoNothing,
    DoUpdate(Vec<Assignment>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertStmt {
    pub with: Vec<Cte>,
    pub table: Table,
    pub columns: Vec<String>,
    pub source: InsertSource,
    pub on_conflict: Option<OnConflict>,
    pub ignore: bool,
    pub priority: Option<InsertPriority>,
    pub returning: Vec<Projection>,
    pub shape: Shape,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateStmt {
    pub with: Vec<Cte>,
    pub table: Table,
    pub assignments: Vec<Assignment>,
    /// Additional sources the assignments and predicates may read.
    pub sources: Vec<Source>,
    pub predicates: Vec<Expr>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub returning: Vec<Projection>,
    pub shape: Shape,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteStmt {
    pub with: Vec<Cte>,
    pub table: Table,
    pub sources: Vec<Source>,
    pub predicates: Vec<Expr>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub returning: Vec<Projection>,
    pub shape: Shape,
}

impl Statement {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Statement::Select(_) => "select",
            Statement::Insert(_) => "insert",
            Statement::Update(_) => "update",
            Statement::Delete(_) => "delete",
            Statement::SetOp(_) => "set operation",
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            Statement::Select(s) => s.shape,
            Statement::Insert(s) => s.shape,
            Statement::Update(s) => s.shape,
            Statement::Delete(s) => s.shape,
            Statement::SetOp(s) => s.shape,
        }
    }

    pub fn with_shape(mut self, shape: Shape) -> Self {
        match &mut self {
            Statement::Select(s) => s.shape = shape,
            Statement::Insert(s) => s.shape = shape,
            Statement::Update(s) => s.shape = shape,
            Statement::Delete(s) => s.shape = shape,
            Statement::SetOp(s) => s.shape = shape,
        }
        self
    }

    /// Output columns: the select list, the first branch's select list for
    /// set operations, or the RETURNING list of a mutation.
    pub fn projection(&self) -> &[Projection] {
        match self {
            Statement::Select(s) => &s.projection,
            Statement::SetOp(s) => s.first.projection(),
            Statement::Insert(s) => &s.returning,
            Statement::Update(s) => &s.returning,
            Statement::Delete(s) => &s.returning,
        }
    }

    pub fn ctes(&self) -> &[Cte] {
        match self {
            Statement::Select(s) => &s.with,
            Statement::SetOp(s) => &s.with,
            Statement::Insert(s) => &s.with,
            Statement::Update(s) => &s.with,
            Statement::Delete(s) => &s.with,
        }
    }

    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Statement::Insert(_) | Statement::Update(_) | Statement::Delete(_)
        )
    }

    pub fn order_by(&self) -> &[OrderBy] {
        match self {
            Statement::Select(s) => &s.order_by,
            Statement::SetOp(s) => &s.order_by,
            Statement::Update(s) => &s.order_by,
            Statement::Delete(s) => &s.order_by,
            Statement::Insert(_) => &[],
        }
    }

    pub fn limit(&self) -> Option<u64> {
        match self {
            Statement::Select(s) => s.limit,
            Statement::SetOp(s) => s.limit,
            Statement::Update(s) => s.limit,
            Statement::Delete(s) => s.limit,
            Statement::Insert(_) => None,
        }
    }

    pub fn offset(&self) -> Option<u64> {
        match self {
            Statement::Select(s) => s.offset,
            Statement::SetOp(s) => s.offset,
            _ => None,
        }
    }
}

fn and_merge(existing: Option<Expr>, predicate: Expr) -> Option<Expr> {
    Some(match existing {
        Some(e) => e.and(predicate),
        None => predicate,
    })
}

fn cte<S: Into<Statement>>(alias: &str, statement: S, recursive: bool) -> Cte {
    Cte {
        alias: alias.to_string(),
        statement: statement.into(),
        recursive,
    }
}

fn projection(alias: &str, expr: Expr) -> Projection {
    Projection {
        alias: alias.to_string(),
        expr,
    }
}

impl SelectStmt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<S: Into<Statement>>(mut self, alias: &str, statement: S) -> Self {
        self.with.push(cte(alias, statement, false));
        self
    }

    pub fn with_recursive<S: Into<Statement>>(mut self, alias: &str, statement: S) -> Self {
        self.with.push(cte(alias, statement, true));
        self
    }

    pub fn from<S: Into<Source>>(mut self, source: S) -> Self {
        self.sources.push(source.into());
        self
    }

    pub fn join<S: Into<Source>>(mut self, kind: JoinKind, source: S, condition: Expr) -> Self {
        self.sources
            .push(Source::join(kind, source, Some(condition)));
        self
    }

    pub fn inner_join<S: Into<Source>>(self, source: S, condition: Expr) -> Self {
        self.join(JoinKind::Inner, source, condition)
    }

    pub fn left_join<S: Into<Source>>(self, source: S, condition: Expr) -> Self {
        self.join(JoinKind::Left, source, condition)
    }

    pub fn cross_join<S: Into<Source>>(mut self, source: S) -> Self {
        self.sources.push(Source::join(JoinKind::Cross, source, None));
        self
    }

    pub fn select(mut self, alias: &str, expr: Expr) -> Self {
        self.projection.push(projection(alias, expr));
        self
    }

    /// Selects columns under their own names. Expressions that are not plain
    /// column references are named `_N` after their position.
    pub fn columns(mut self, exprs: impl IntoIterator<Item = Expr>) -> Self {
        for expr in exprs {
            let alias = match expr.implied_alias() {
                Some(name) => name.to_string(),
                None => format!("_{}", self.projection.len()),
            };
            self.projection.push(Projection { alias, expr });
        }
        self
    }

    pub fn filter(mut self, predicate: Expr) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn group_by(mut self, expr: Expr) -> Self {
        self.group_by.push(expr);
        self
    }

    /// AND-ed with any previous HAVING predicate.
    pub fn having(mut self, predicate: Expr) -> Self {
        self.having = and_merge(self.having.take(), predicate);
        self
    }

    pub fn window(mut self, name: &str, spec: WindowSpec) -> Self {
        self.windows.push(NamedWindow {
            name: name.to_string(),
            spec,
        });
        self
    }

    pub fn order_by<O: Into<OrderBy>>(mut self, order: O) -> Self {
        self.order_by.push(order.into());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = Some(Distinct::All);
        self
    }

    pub fn distinct_on(mut self, exprs: Vec<Expr>) -> Self {
        self.distinct = Some(Distinct::On(exprs));
        self
    }

    pub fn first(mut self) -> Self {
        self.shape = Shape::First;
        self
    }

    pub fn value(mut self) -> Self {
        self.shape = Shape::Value;
        self
    }

    pub fn list(mut self) -> Self {
        self.shape = Shape::List;
        self
    }

    pub fn union<S: Into<Statement>>(self, other: S) -> SetOpStmt {
        SetOpStmt::new(self).union(other)
    }

    pub fn union_all<S: Into<Statement>>(self, other: S) -> SetOpStmt {
        SetOpStmt::new(self).union_all(other)
    }

    pub fn intersect<S: Into<Statement>>(self, other: S) -> SetOpStmt {
        SetOpStmt::new(self).intersect(other)
    }

    pub fn except<S: Into<Statement>>(self, other: S) -> SetOpStmt {
        SetOpStmt::new(self).except(other)
    }
}

impl SetOpStmt {
    pub fn new<S: Into<Statement>>(first: S) -> Self {
        SetOpStmt {
            with: Vec::new(),
            first: Box::new(first.into()),
            rest: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            shape: Shape::Rows,
        }
    }

    pub fn then<S: Into<Statement>>(mut self, op: SetOperator, other: S) -> Self {
        self.rest.push((op, other.into()));
        self
    }

    pub fn union<S: Into<Statement>>(self, other: S) -> Self {
        self.then(SetOperator::Union, other)
    }

    pub fn union_all<S: Into<Statement>>(self, other: S) -> Self {
        self.then(SetOperator::UnionAll, other)
    }

    pub fn intersect<S: Into<Statement>>(self, other: S) -> Self {
        self.then(SetOperator::Intersect, other)
    }

    pub fn except<S: Into<Statement>>(self, other: S) -> Self {
        self.then(SetOperator::Except, other)
    }

    pub fn with<S: Into<Statement>>(mut self, alias: &str, statement: S) -> Self {
        self.with.push(cte(alias, statement, false));
        self
    }

    pub fn order_by<O: Into<OrderBy>>(mut self, order: O) -> Self {
        self.order_by.push(order.into());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn first(mut self) -> Self {
        self.shape = Shape::First;
        self
    }

    pub fn list(mut self) -> Self {
        self.shape = Shape::List;
        self
    }

    pub fn branches(&self) -> impl Iterator<Item = &Statement> {
        std::iter::once(self.first.as_ref()).chain(self.rest.iter().map(|(_, s)| s))
    }
}

impl InsertStmt {
    pub fn new(table: Table) -> Self {
        InsertStmt {
            with: Vec::new(),
            table,
            columns: Vec::new(),
            source: InsertSource::Values(Vec::new()),
            on_conflict: None,
            ignore: false,
            priority: None,
            returning: Vec::new(),
            shape: Shape::Rows,
        }
    }

    pub fn with<S: Into<Statement>>(mut self, alias: &str, statement: S) -> Self {
        self.with.push(cte(alias, statement, false));
        self
    }

    pub fn columns<I: IntoIterator<Item = S>, S: AsRef<str>>(mut self, columns: I) -> Self {
        self.columns = columns.into_iter().map(|c| c.as_ref().to_string()).collect();
        self
    }

    /// Appends a row of values.
    pub fn values(mut self, row: Vec<Expr>) -> Self {
        match &mut self.source {
            InsertSource::Values(rows) => rows.push(row),
            _ => self.source = InsertSource::Values(vec![row]),
        }
        self
    }

    pub fn query<S: Into<Statement>>(mut self, statement: S) -> Self {
        self.source = InsertSource::Query(Box::new(statement.into()));
        self
    }

    pub fn default_values(mut self) -> Self {
        self.source = InsertSource::DefaultValues;
        self
    }

    pub fn on_conflict_do_nothing<S: AsRef<str>>(mut self, target: &[S]) -> Self {
        self.on_conflict = Some(OnConflict {
            target: target.iter().map(|c| c.as_ref().to_string()).collect(),
            action: ConflictAction::DoNothing,
        });
        self
    }

    pub fn on_conflict_do_update<S: AsRef<str>>(
        mut self,
        target: &[S],
        assignments: Vec<(&str, Expr)>,
    ) -> Self {
        self.on_conflict = Some(OnConflict {
            target: target.iter().map(|c| c.as_ref().to_string()).collect(),
            action: ConflictAction::DoUpdate(
                assignments
                    .into_iter()
                    .map(|(column, value)| Assignment {
                        column: column.to_string(),
                        value,
                    })
                    .collect(),
            ),
        });
        self
    }

    pub fn ignore(mut self) -> Self {
        self.ignore = true;
        self
    }

    pub fn priority(mut self, priority: InsertPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn returning(mut self, alias: &str, expr: Expr) -> Self {
        self.returning.push(projection(alias, expr));
        self
    }

    pub fn returning_columns<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        for column in columns {
            let expr = self.table.col(column.as_ref());
            self.returning.push(projection(column.as_ref(), expr));
        }
        self
    }

    pub fn first(mut self) -> Self {
        self.shape = Shape::First;
        self
    }
}

impl UpdateStmt {
    pub fn new(table: Table) -> Self {
        UpdateStmt {
            with: Vec::new(),
            table,
            assignments: Vec::new(),
            sources: Vec::new(),
            predicates: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            returning: Vec::new(),
            shape: Shape::Rows,
        }
    }

    pub fn with<S: Into<Statement>>(mut self, alias: &str, statement: S) -> Self {
        self.with.push(cte(alias, statement, false));
        self
    }

    pub fn set<E: Into<Expr>>(mut self, column: &str, value: E) -> Self {
        self.assignments.push(Assignment {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn from<S: Into<Source>>(mut self, source: S) -> Self {
        self.sources.push(source.into());
        self
    }

    pub fn join<S: Into<Source>>(mut self, kind: JoinKind, source: S, condition: Expr) -> Self {
        self.sources
            .push(Source::join(kind, source, Some(condition)));
        self
    }

    pub fn filter(mut self, predicate: Expr) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn order_by<O: Into<OrderBy>>(mut self, order: O) -> Self {
        self.order_by.push(order.into());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn returning(mut self, alias: &str, expr: Expr) -> Self {
        self.returning.push(projection(alias, expr));
        self
    }

    pub fn returning_columns<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        for column in columns {
            let expr = self.table.col(column.as_ref());
            self.returning.push(projection(column.as_ref(), expr));
        }
        self
    }
}

impl DeleteStmt {
    pub fn new(table: Table) -> Self {
        DeleteStmt {
            with: Vec::new(),
            table,
            sources: Vec::new(),
            predicates: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            returning: Vec::new(),
            shape: Shape::Rows,
        }
    }

    pub fn with<S: Into<Statement>>(mut self, alias: &str, statement: S) -> Self {
        self.with.push(cte(alias, statement, false));
        self
    }

    pub fn using<S: Into<Source>>(mut self, source: S) -> Self {
        self.sources.push(source.into());
        self
    }

    pub fn join<S: Into<Source>>(mut self, kind: JoinKind, source: S, condition: Expr) -> Self {
        self.sources
            .push(Source::join(kind, source, Some(condition)));
        self
    }

    pub fn filter(mut self, predicate: Expr) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn order_by<O: Into<OrderBy>>(mut self, order: O) -> Self {
        self.order_by.push(order.into());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn returning(mut self, alias: &str, expr: Expr) -> Self {
        self.returning.push(projection(alias, expr));
        self
    }

    pub fn returning_columns<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        for column in columns {
            let expr = self.table.col(column.as_ref());
            self.returning.push(projection(column.as_ref(), expr));
        }
        self
    }
}

macro_rules! into_statement {
    ($($variant:ident($t:ty)),*) => {
        $(
            impl From<$t> for Statement {
                fn from(stmt: $t) -> Self {
                    Statement::$variant(stmt)
                }
            }
        )*
    };
}

into_statement!(
    Select(SelectStmt),
    Insert(InsertStmt),
    Update(UpdateStmt),
    Delete(DeleteStmt),
    SetOp(SetOpStmt)
);
