//! Expressions to SQL text.
use std::cmp::Ordering;

use super::gen_json::translate_query_expr;
use super::gen_query::translate_statement;
use super::Context;
use crate::ast::{
    AggregateKind, BinaryOperator, BinaryPredicate, Conjunction, DataType, Direction, Expr, InList,
    Nulls, OrderBy, UnaryOperator, UnaryPredicate, Value, WindowRef, WindowSpec,
};
use crate::ast::hex_encode;
use crate::dialect::{Features, Keyword, LiteralKind};
use crate::format::{FormatKey, FormatRegistry, Params};
use crate::{Error, Reason, Result};

/// Rendered expression text, with the strength of its top-level operator.
#[derive(Debug, Clone)]
pub(super) struct SqlExpr {
    pub text: String,
    pub binding_strength: i32,
}

/// Function calls, literals, column references.
const ATOM: i32 = 20;
const PARENTHESIZED: i32 = 100;

impl SqlExpr {
    fn new(text: String, binding_strength: i32) -> Self {
        SqlExpr {
            text,
            binding_strength,
        }
    }

    pub(super) fn atom(text: String) -> Self {
        SqlExpr::new(text, ATOM)
    }

    pub(super) fn wrap_in_parenthesis(self) -> Self {
        SqlExpr::new(format!("({})", self.text), PARENTHESIZED)
    }
}

pub(super) fn translate_expr(expr: &Expr, ctx: &mut Context) -> Result<SqlExpr> {
    let dialect = ctx.dialect;
    Ok(match expr {
        Expr::Constant { value, data_type } => {
            if ctx.options.constants_as_params && !value.is_null() {
                SqlExpr::atom(ctx.params.value(value, data_type.as_ref()))
            } else {
                translate_literal(value, ctx)?
            }
        }
        Expr::Field { source, name, .. } => SqlExpr::atom(translate_field(source, name, ctx)),
        Expr::Param { name, data_type } => {
            SqlExpr::atom(ctx.params.named(name, data_type.as_ref()))
        }
        Expr::Function { name, args, .. } => {
            let args = translate_list(args, ctx)?;
            SqlExpr::atom(format!("{name}({args})"))
        }
        Expr::Aggregate {
            kind,
            distinct,
            arg,
            filter,
        } => translate_aggregate(*kind, *distinct, arg.as_deref(), filter.as_deref(), ctx)?,
        Expr::Unary { op, operand } => {
            let registry = &dialect.registries().unary_ops;
            let strength = op.binding_strength();
            translate_operator(registry, *op, strength, Associativity::Both, &[("operand", operand)], ctx)?
        }
        Expr::Binary { op, left, right } => {
            let registry = &dialect.registries().binary_ops;
            translate_operator(
                registry,
                *op,
                op.binding_strength(),
                op.associativity(),
                &[("left", left), ("right", right)],
                ctx,
            )?
        }
        Expr::UnaryPredicate { op, operand } => {
            let registry = &dialect.registries().unary_predicates;
            translate_operator(registry, *op, op.binding_strength(), Associativity::Both, &[("operand", operand)], ctx)?
        }
        Expr::BinaryPredicate { op, left, right } => {
            let registry = &dialect.registries().binary_predicates;
            translate_operator(
                registry,
                *op,
                op.binding_strength(),
                Associativity::Left,
                &[("left", left), ("right", right)],
                ctx,
            )?
        }
        Expr::Conditions { op, operands } => translate_conditions(*op, operands, ctx)?,
        Expr::Not(operand) => {
            let operand = translate_operand(operand, false, 4, Associativity::Both, ctx)?;
            let params = Params::new().with("operand", operand.text);
            SqlExpr::new(keyword(Keyword::Not, &params, ctx)?, 4)
        }
        Expr::Case {
            subject,
            arms,
            otherwise,
        } => translate_case(subject.as_deref(), arms, otherwise.as_deref(), ctx)?,
        Expr::Cast { data_type, operand } => {
            let lookup = dialect.registries().keywords.lookup(
                Keyword::Cast,
                &Params::new(),
                ctx.throw_error(),
            )?;
            let strength = lookup.template.slot_strength("operand").unwrap_or(ATOM);
            let operand = translate_operand(operand, true, strength, Associativity::Both, ctx)?;
            let params = Params::new()
                .with("operand", operand.text)
                .with("type", translate_type(data_type, ctx)?);
            SqlExpr::atom(keyword(Keyword::Cast, &params, ctx)?)
        }
        Expr::Between {
            value,
            low,
            high,
            negated,
        } => {
            let key = if *negated {
                Keyword::NotBetween
            } else {
                Keyword::Between
            };
            let params = Params::new()
                .with("value", translate_operand(value, true, 8, Associativity::Both, ctx)?.text)
                .with("low", translate_operand(low, true, 8, Associativity::Both, ctx)?.text)
                .with("high", translate_operand(high, true, 8, Associativity::Both, ctx)?.text);
            SqlExpr::new(keyword(key, &params, ctx)?, 7)
        }
        Expr::In {
            value,
            list,
            negated,
        } => translate_in(value, list, *negated, ctx)?,
        Expr::Exists { query, negated } => {
            let (key, strength) = if *negated {
                (Keyword::NotExists, 4)
            } else {
                (Keyword::Exists, ATOM)
            };
            let params = Params::new().with("query", translate_statement(query, ctx)?);
            SqlExpr::new(keyword(key, &params, ctx)?, strength)
        }
        Expr::Row(elements) => {
            let elements = translate_list(elements, ctx)?;
            if ctx.supports(Features::ROW_CONSTRUCTOR) {
                let params = Params::new().with("elements", elements);
                SqlExpr::atom(keyword(Keyword::Row, &params, ctx)?)
            } else {
                SqlExpr::new(format!("({elements})"), PARENTHESIZED)
            }
        }
        // nothing is known about raw text, so it is parenthesized whenever it
        // is an operand
        Expr::Raw(sql) => SqlExpr::new(sql.clone(), 0),
        Expr::Default => SqlExpr::atom(keyword(Keyword::Default, &Params::new(), ctx)?),
        Expr::Query(statement) => translate_query_expr(statement, ctx)?,
        Expr::Over { expr, window } => {
            let expr = translate_operand(expr, true, ATOM, Associativity::Both, ctx)?;
            let window = translate_window_ref(window, ctx)?;
            let params = Params::new().with("expr", expr.text).with("window", window);
            SqlExpr::atom(keyword(Keyword::Over, &params, ctx)?)
        }
        Expr::Excluded(column) => {
            let params = Params::new().with("column", ctx.quote(column));
            SqlExpr::atom(keyword(Keyword::Excluded, &params, ctx)?)
        }
    })
}

pub(super) fn translate_operand(
    expr: &Expr,
    is_left: bool,
    parent_strength: i32,
    parent_associativity: Associativity,
    ctx: &mut Context,
) -> Result<SqlExpr> {
    let expr = translate_expr(expr, ctx)?;

    // `a - -1` would start a comment
    let leading_minus = !is_left && expr.text.starts_with('-');
    if leading_minus || needs_parentheses(&expr, is_left, parent_strength, parent_associativity) {
        Ok(expr.wrap_in_parenthesis())
    } else {
        Ok(expr)
    }
}

/// For an operation represented as `a child b` with a surrounding parent
/// operation (e.g., `(a child b) parent c` or `a parent (b child c)`):
///
/// 1. When the child operator has higher precedence than the parent,
///    parentheses *are not* required.
///
/// 2. When the child operator has lower precedence than the parent,
///    parentheses *are* required.
///
/// 3. When the child and parent operators have the same precedence, the child
///    is on the {left,right} and the parent is {left,right} associative,
///    parentheses are not required. Some examples of when parentheses are not required:
///    - `(a - b) - c` & `(a + b) - c` : as opposed to `a - (b - c)`
///    - `a + (b - c)` & `a + (b + c)` : as opposed to `a - (b + c)` & `a - (b - c)`
fn needs_parentheses(
    expr: &SqlExpr,
    is_left: bool,
    parent_strength: i32,
    parent_associativity: Associativity,
) -> bool {
    let rule_3a = matches!(parent_associativity, Associativity::Both);
    let rule_3b_left = is_left && parent_associativity.left_associative();
    let rule_3b_right = !is_left && parent_associativity.right_associative();

    match expr.binding_strength.cmp(&parent_strength) {
        // Rule 1
        Ordering::Greater => false,
        // Rule 2
        Ordering::Less => true,
        // Rule 3
        Ordering::Equal => !(rule_3a || rule_3b_left || rule_3b_right),
    }
}

/// Associativity of an expression's operator.
/// Note that there's no exponent symbol in SQL, so we don't seem to require a `Right` variant.
/// https://en.wikipedia.org/wiki/Operator_associativity
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Associativity {
    Left,
    /// `Both` means mathematically associative, like `+` or `*`
    Both,
    Right,
}

impl Associativity {
    /// Returns true iff `a + b + c = (a + b) + c`
    fn left_associative(&self) -> bool {
        matches!(self, Associativity::Left | Associativity::Both)
    }

    /// Returns true iff `a + b + c = a + (b + c)`
    fn right_associative(&self) -> bool {
        matches!(self, Associativity::Right | Associativity::Both)
    }
}

trait SqlOperator {
    /// Returns binding strength of an operator
    /// https://www.postgresql.org/docs/14/sql-syntax-lexical.html#id-1.5.3.5.13.2
    /// https://docs.microsoft.com/en-us/sql/t-sql/language-elements/operator-precedence-transact-sql?view=sql-server-ver16
    fn binding_strength(&self) -> i32;

    /// Default to `Both`, but expected to be overwritten by concrete types
    fn associativity(&self) -> Associativity {
        Associativity::Both
    }
}

impl SqlOperator for BinaryOperator {
    fn binding_strength(&self) -> i32 {
        use BinaryOperator::*;
        match self {
            Mod | Mul | Div => 11,
            Sub | Add => 10,
            _ => 9,
        }
    }
    fn associativity(&self) -> Associativity {
        use BinaryOperator::*;
        match self {
            Sub | Div | Mod => Associativity::Left,
            _ => Associativity::Both,
        }
    }
}

impl SqlOperator for UnaryOperator {
    fn binding_strength(&self) -> i32 {
        13
    }
}

impl SqlOperator for UnaryPredicate {
    fn binding_strength(&self) -> i32 {
        5
    }
}

impl SqlOperator for BinaryPredicate {
    fn binding_strength(&self) -> i32 {
        use BinaryPredicate::*;
        match self {
            Like | NotLike | ILike | NotILike | Regex => 7,
            IsDistinctFrom | IsNotDistinctFrom => 5,
            Eq | Ne | Lt | Lte | Gt | Gte => 6,
        }
    }
}

/// Renders an operator through its registry. Operand slots may request their
/// own binding strength (`{left:0}`), and the entry may declare the strength
/// of the result.
fn translate_operator<K: FormatKey>(
    registry: &FormatRegistry<K>,
    key: K,
    strength: i32,
    associativity: Associativity,
    operands: &[(&'static str, &Expr)],
    ctx: &mut Context,
) -> Result<SqlExpr> {
    let lookup = registry.lookup(key, &Params::new(), ctx.throw_error())?;
    let template = lookup.template.clone();
    let keyword = lookup.keyword.to_string();
    let result_strength = lookup.binding_strength.unwrap_or(strength);

    let mut params = Params::new();
    for (i, (slot, operand)) in operands.iter().enumerate() {
        let slot_strength = template.slot_strength(slot).unwrap_or(strength);
        let is_left = i == 0 && operands.len() > 1;
        let text = translate_operand(operand, is_left, slot_strength, associativity, ctx)?.text;
        params.set(slot, text);
    }
    params.set("keyword", keyword);

    Ok(SqlExpr::new(template.render(&params), result_strength))
}

fn translate_aggregate(
    kind: AggregateKind,
    distinct: bool,
    arg: Option<&Expr>,
    filter: Option<&Expr>,
    ctx: &mut Context,
) -> Result<SqlExpr> {
    let has_filter_clause = ctx.supports(Features::AGGREGATE_FILTER);

    let mut params = Params::new();
    if distinct {
        params.set("distinct", "DISTINCT ");
    }
    // CASE WHEN {filter} THEN {arg} puts the filter first
    let filter_case = match filter {
        Some(filter) if !has_filter_clause => {
            log::trace!("aggregate filter rendered as CASE");
            Some(translate_expr(filter, ctx)?.text)
        }
        _ => None,
    };
    let arg = match arg {
        Some(arg) => translate_expr(arg, ctx)?.text,
        // `COUNT(CASE WHEN .. THEN * END)` is not valid
        None if filter_case.is_some() => "1".to_string(),
        None => "*".to_string(),
    };
    params.set("arg", arg);
    match (filter, filter_case) {
        (_, Some(filter_case)) => params.set("filter_case", filter_case),
        (Some(filter), None) => params.set("filter", translate_expr(filter, ctx)?.text),
        (None, None) => {}
    }

    let registry = &ctx.dialect.registries().aggregates;
    let lookup = registry.lookup(kind, &params, ctx.throw_error())?;
    let strength = lookup.binding_strength.unwrap_or(ATOM);
    Ok(SqlExpr::new(lookup.render(&params), strength))
}

fn translate_conditions(op: Conjunction, operands: &[Expr], ctx: &mut Context) -> Result<SqlExpr> {
    let (strength, empty) = match op {
        Conjunction::And => (3, Keyword::TruePredicate),
        Conjunction::Or => (2, Keyword::FalsePredicate),
    };

    match operands {
        [] => {
            let registry = &ctx.dialect.registries().keywords;
            let lookup = registry.lookup(empty, &Params::new(), ctx.throw_error())?;
            let strength = lookup.binding_strength.unwrap_or(ATOM);
            Ok(SqlExpr::new(lookup.render(&Params::new()), strength))
        }
        [single] => translate_expr(single, ctx),
        operands => {
            let separator = format!(" {} ", op.as_ref());
            let text = operands
                .iter()
                .map(|o| translate_operand(o, true, strength, Associativity::Both, ctx).map(|e| e.text))
                .collect::<Result<Vec<_>>>()?
                .join(&separator);
            Ok(SqlExpr::new(text, strength))
        }
    }
}

fn translate_case(
    subject: Option<&Expr>,
    arms: &[(Expr, Expr)],
    otherwise: Option<&Expr>,
    ctx: &mut Context,
) -> Result<SqlExpr> {
    if arms.is_empty() {
        return match otherwise {
            Some(otherwise) => translate_expr(otherwise, ctx),
            None => translate_literal(&Value::Null, ctx),
        };
    }

    let mut text = "CASE".to_string();
    if let Some(subject) = subject {
        text += " ";
        text += &translate_expr(subject, ctx)?.text;
    }
    for (condition, result) in arms {
        let condition = translate_expr(condition, ctx)?.text;
        let result = translate_expr(result, ctx)?.text;
        text += &format!(" WHEN {condition} THEN {result}");
    }
    if let Some(otherwise) = otherwise {
        text += &format!(" ELSE {}", translate_expr(otherwise, ctx)?.text);
    }
    text += " END";
    Ok(SqlExpr::atom(text))
}

fn translate_in(value: &Expr, list: &InList, negated: bool, ctx: &mut Context) -> Result<SqlExpr> {
    if matches!(list, InList::Exprs(exprs) if exprs.is_empty()) {
        // nothing is IN an empty list
        let always = Expr::Conditions {
            op: if negated {
                Conjunction::And
            } else {
                Conjunction::Or
            },
            operands: Vec::new(),
        };
        return translate_expr(&always, ctx);
    }

    // placeholders are collected in text order
    let value = translate_operand(value, true, 8, Associativity::Both, ctx)?;
    let list = match list {
        InList::Exprs(exprs) => translate_list(exprs, ctx)?,
        InList::Query(query) => translate_statement(query, ctx)?,
    };
    let key = if negated { Keyword::NotIn } else { Keyword::In };
    let params = Params::new().with("value", value.text).with("list", list);
    Ok(SqlExpr::new(keyword(key, &params, ctx)?, 7))
}

fn translate_window_ref(window: &WindowRef, ctx: &mut Context) -> Result<String> {
    match window {
        WindowRef::Named(name) if ctx.supports(Features::NAMED_WINDOWS) => Ok(ctx.quote(name)),
        WindowRef::Named(name) => {
            let spec = ctx.find_window(name).cloned().ok_or_else(|| {
                Error::new(Reason::NotFound {
                    name: name.clone(),
                    namespace: "window".to_string(),
                })
            })?;
            log::trace!("inlining window {name}");
            Ok(format!("({})", translate_window_spec(&spec, ctx)?))
        }
        WindowRef::Inline(spec) => Ok(format!("({})", translate_window_spec(spec, ctx)?)),
    }
}

pub(super) fn translate_window_spec(spec: &WindowSpec, ctx: &mut Context) -> Result<String> {
    let mut parts = Vec::new();
    if !spec.partition_by.is_empty() {
        let params = Params::new();
        let partition_by = keyword(Keyword::PartitionBy, &params, ctx)?;
        parts.push(format!("{partition_by} {}", translate_list(&spec.partition_by, ctx)?));
    }
    if !spec.order_by.is_empty() {
        let order_by = keyword(Keyword::OrderBy, &Params::new(), ctx)?;
        parts.push(format!("{order_by} {}", translate_order_by(&spec.order_by, ctx)?));
    }
    Ok(parts.join(" "))
}

pub(super) fn translate_order_by(order_by: &[OrderBy], ctx: &mut Context) -> Result<String> {
    let mut items = Vec::new();
    for order in order_by {
        let mark = ctx.params.mark();
        let expr = translate_expr(&order.expr, ctx)?.text;
        let direction = match order.direction {
            Direction::Asc => String::new(),
            Direction::Desc => format!(" {}", order.direction.as_ref()),
        };

        match order.nulls {
            None => items.push(format!("{expr}{direction}")),
            Some(nulls) if ctx.supports(Features::NULLS_ORDERING) => {
                let key = match nulls {
                    Nulls::First => Keyword::NullsFirst,
                    Nulls::Last => Keyword::NullsLast,
                };
                let nulls = keyword(key, &Params::new(), ctx)?;
                items.push(format!("{expr}{direction} {nulls}"));
            }
            Some(nulls) => {
                // leading sort key: rows with a null sort first or last
                let (null_rank, other_rank) = match nulls {
                    Nulls::First => (0, 1),
                    Nulls::Last => (1, 0),
                };
                let is_null = ctx
                    .dialect
                    .registries()
                    .unary_predicates
                    .get(
                        UnaryPredicate::IsNull,
                        &Params::new().with("operand", wrap_if_weak(&expr)),
                        ctx.throw_error(),
                    )?;
                items.push(format!(
                    "CASE WHEN {is_null} THEN {null_rank} ELSE {other_rank} END"
                ));
                ctx.params.repeat_since(mark);
                items.push(format!("{expr}{direction}"));
            }
        }
    }
    Ok(items.join(", "))
}

/// Parenthesizes text that is not obviously a single term.
fn wrap_if_weak(text: &str) -> String {
    let simple = text
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '"' | '`' | '[' | ']' | '$' | '@' | '?'));
    if simple {
        text.to_string()
    } else {
        format!("({text})")
    }
}

pub(super) fn translate_field(source: &str, name: &str, ctx: &Context) -> String {
    let column = ctx.quote(name);
    if source.is_empty() {
        return column;
    }
    match ctx.qualifier(source, name) {
        Some(qualifier) => format!("{qualifier}.{column}"),
        None => column,
    }
}

pub(super) fn translate_list(exprs: &[Expr], ctx: &mut Context) -> Result<String> {
    Ok(exprs
        .iter()
        .map(|e| translate_expr(e, ctx).map(|e| e.text))
        .collect::<Result<Vec<_>>>()?
        .join(", "))
}

pub(super) fn keyword(key: Keyword, params: &Params, ctx: &Context) -> Result<String> {
    ctx.dialect
        .registries()
        .keywords
        .get(key, params, ctx.throw_error())
}

pub(super) fn translate_literal(value: &Value, ctx: &Context) -> Result<SqlExpr> {
    let handler = ctx.dialect.handler();
    let (kind, params) = match value {
        Value::Null => (LiteralKind::Null, Params::new()),
        Value::Bool(true) => (LiteralKind::True, Params::new()),
        Value::Bool(false) => (LiteralKind::False, Params::new()),
        Value::Int(i) => return Ok(number(i.to_string())),
        Value::UInt(u) => return Ok(number(u.to_string())),
        Value::Float(f) if f.is_finite() => return Ok(number(format!("{f:?}"))),
        Value::Float(f) => {
            return Err(Error::new(Reason::Expected {
                who: Some("literal".to_string()),
                expected: "a finite number".to_string(),
                found: f.to_string(),
            }))
        }
        Value::Decimal(d) => return Ok(number(d.clone())),
        Value::Text(text) => (
            LiteralKind::Text,
            Params::new().with("value", handler.string_literal(text)),
        ),
        Value::Bytes(bytes) => (LiteralKind::Bytes, Params::new().with("hex", hex_encode(bytes))),
        Value::Date(d) => (
            LiteralKind::Date,
            Params::new().with("value", handler.string_literal(&d.format("%Y-%m-%d").to_string())),
        ),
        Value::Time(t) => (
            LiteralKind::Time,
            Params::new().with("value", handler.string_literal(&t.format("%H:%M:%S%.f").to_string())),
        ),
        Value::Timestamp(ts) => (
            LiteralKind::Timestamp,
            Params::new().with(
                "value",
                handler.string_literal(&ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
            ),
        ),
        Value::TimestampTz(ts) => (
            LiteralKind::TimestampTz,
            Params::new().with(
                "value",
                handler.string_literal(&ts.format("%Y-%m-%d %H:%M:%S%.f%:z").to_string()),
            ),
        ),
        Value::Interval(interval) => (
            LiteralKind::Interval,
            Params::new().with("value", handler.interval_value(interval)?),
        ),
        Value::Point(p) => (
            LiteralKind::Point,
            Params::new()
                .with("x", format!("{:?}", p.x))
                .with("y", format!("{:?}", p.y)),
        ),
        Value::Json(_) | Value::Object(_) => (
            LiteralKind::Json,
            Params::new().with("value", handler.string_literal(&value.to_json().to_string())),
        ),
        Value::Array(items) => {
            let elements = items
                .iter()
                .map(|v| translate_literal(v, ctx).map(|e| e.text))
                .collect::<Result<Vec<_>>>()?
                .join(", ");
            (LiteralKind::Array, Params::new().with("elements", elements))
        }
    };

    let registry = &ctx.dialect.registries().literals;
    let text = registry.get(kind, &params, ctx.throw_error())?;
    Ok(SqlExpr::atom(text))
}

fn number(text: String) -> SqlExpr {
    // negative numbers bind like unary minus
    let strength = if text.starts_with('-') { 13 } else { ATOM };
    SqlExpr::new(text, strength)
}

/// Renders a CAST target type.
pub(super) fn translate_type(data_type: &DataType, ctx: &Context) -> Result<String> {
    if data_type.is_unsigned() && !ctx.supports(Features::UNSIGNED) {
        ctx.unsupported("UNSIGNED")?;
        if let Some(signed) = data_type.signed_fallback() {
            return translate_type(&signed, ctx);
        }
    }

    let mut params = Params::new();
    match data_type {
        DataType::Decimal {
            precision: Some(p),
            scale: Some(s),
        } => params.set("args", format!("({p}, {s})")),
        DataType::Decimal {
            precision: Some(p),
            scale: None,
        } => params.set("args", format!("({p})")),
        DataType::Varchar(Some(n)) => params.set("args", format!("({n})")),
        DataType::Array(inner) => params.set("element", translate_type(inner, ctx)?),
        DataType::Custom(name) => params.set("name", name.clone()),
        _ => {}
    }

    let registry = &ctx.dialect.registries().types;
    registry.get(data_type.kind(), &params, ctx.throw_error())
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use rstest::rstest;

    use super::*;
    use crate::ast::{Interval, Point};
    use crate::{DialectKind, Options};

    fn render(expr: &Expr, target: DialectKind) -> String {
        let options = Options::default().inline_constants();
        let mut ctx = Context::new(target.dialect(), &options);
        translate_expr(expr, &mut ctx).unwrap().text
    }

    fn col(name: &str) -> Expr {
        Expr::column(name)
    }

    #[test]
    fn test_parentheses() {
        let e = col("a").sub(col("b").sub(col("c")));
        assert_snapshot!(render(&e, DialectKind::Generic), @"a - (b - c)");

        let e = col("a").sub(col("b")).sub(col("c"));
        assert_snapshot!(render(&e, DialectKind::Generic), @"a - b - c");

        let e = col("a").add(col("b")).mul(col("c"));
        assert_snapshot!(render(&e, DialectKind::Generic), @"(a + b) * c");

        let e = col("a").mul(col("b")).add(col("c"));
        assert_snapshot!(render(&e, DialectKind::Generic), @"a * b + c");

        let e = col("a").eq(1).or(col("b").eq(2)).and(col("c").is_null());
        assert_snapshot!(render(&e, DialectKind::Generic), @"(a = 1 OR b = 2) AND c IS NULL");

        let e = Expr::negate(col("a").eq(1).and(col("b")));
        assert_snapshot!(render(&e, DialectKind::Generic), @"NOT (a = 1 AND b)");

        let e = col("a").sub(-1);
        assert_snapshot!(render(&e, DialectKind::Generic), @"a - (-1)");
    }

    #[test]
    fn test_concat() {
        let e = col("a").concat("x").concat(col("b"));
        assert_snapshot!(render(&e, DialectKind::Postgres), @"a || 'x' || b");
        assert_snapshot!(render(&e, DialectKind::MySql), @"CONCAT(CONCAT(a, 'x'), b)");
        assert_snapshot!(render(&e, DialectKind::MsSql), @"a + N'x' + b");
    }

    #[test]
    fn test_ilike_fallback() {
        let e = col("name").ilike("%a%");
        assert_snapshot!(render(&e, DialectKind::Postgres), @"name ILIKE '%a%'");
        assert_snapshot!(render(&e, DialectKind::SQLite), @"LOWER(name) LIKE LOWER('%a%')");
    }

    #[test]
    fn test_empty_lists() {
        assert_snapshot!(render(&col("a").in_list(Vec::<Expr>::new()), DialectKind::Generic), @"FALSE");
        assert_snapshot!(render(&col("a").not_in_list(Vec::<Expr>::new()), DialectKind::Generic), @"TRUE");
        assert_snapshot!(render(&Expr::all(vec![]), DialectKind::MsSql), @"1 = 1");
        assert_snapshot!(render(&Expr::any(vec![]), DialectKind::Postgres), @"FALSE");
    }

    #[test]
    fn test_aggregate_filter() {
        let e = Expr::count_star().filter(col("active"));
        assert_snapshot!(render(&e, DialectKind::Postgres), @"COUNT(*) FILTER (WHERE active)");
        assert_snapshot!(render(&e, DialectKind::MySql), @"COUNT(CASE WHEN active THEN 1 END)");

        let e = Expr::aggregate(AggregateKind::Sum, col("x")).distinct();
        assert_snapshot!(render(&e, DialectKind::MsSql), @"SUM(DISTINCT x)");
    }

    #[test]
    fn test_row() {
        let e = Expr::row(vec![col("a"), col("b")]).eq(Expr::row(vec![1.into(), 2.into()]));
        assert_snapshot!(render(&e, DialectKind::Postgres), @"ROW(a, b) = ROW(1, 2)");
        assert_snapshot!(render(&e, DialectKind::SQLite), @"(a, b) = (1, 2)");
    }

    #[rstest]
    #[case::generic(DialectKind::Generic, "TIMESTAMP '2024-01-02 03:04:05'")]
    #[case::postgres(DialectKind::Postgres, "TIMESTAMP '2024-01-02 03:04:05'")]
    #[case::mssql(DialectKind::MsSql, "CAST('2024-01-02 03:04:05' AS DATETIME2)")]
    #[case::sqlite(DialectKind::SQLite, "'2024-01-02 03:04:05'")]
    fn test_timestamp_literal(#[case] target: DialectKind, #[case] expected: &str) {
        let ts = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        assert_eq!(render(&Expr::constant(ts), target), expected);
    }

    #[test]
    fn test_literals() {
        assert_snapshot!(render(&Expr::constant(true), DialectKind::MsSql), @"1");
        assert_snapshot!(render(&Expr::constant(vec![0xab_u8, 0x01]), DialectKind::Postgres), @"decode('ab01', 'hex')");
        assert_snapshot!(render(&Expr::constant(vec![0xab_u8, 0x01]), DialectKind::MsSql), @"0xab01");
        assert_snapshot!(render(&Expr::constant(Point::new(1.0, 2.5)), DialectKind::Postgres), @"point(1.0, 2.5)");
        assert_snapshot!(render(&Expr::constant(Interval::new(0, 3, 0)), DialectKind::MySql), @"INTERVAL 3 DAY");
        assert_snapshot!(render(&Expr::constant(Interval::new(0, 3, 0)), DialectKind::Postgres), @"INTERVAL '3 days'");
        assert_snapshot!(render(&Expr::constant(r"a\b"), DialectKind::MySql), @r"'a\\b'");
    }

    #[test]
    fn test_unsupported_literal() {
        let options = Options::default().inline_constants();
        let mut ctx = Context::new(DialectKind::SQLite.dialect(), &options);
        let err = translate_expr(&Expr::constant(Point::new(1.0, 2.0)), &mut ctx).unwrap_err();
        assert_snapshot!(err.reason, @"POINT is not supported");
    }

    #[test]
    fn test_casts() {
        let e = col("a").cast(DataType::UnsignedInteger);
        assert_snapshot!(render(&e, DialectKind::MySql), @"CAST(a AS UNSIGNED)");

        let lenient = Options::default().lenient();
        let mut ctx = Context::new(DialectKind::Postgres.dialect(), &lenient);
        assert_snapshot!(translate_expr(&e, &mut ctx).unwrap().text, @"CAST(a AS BIGINT)");

        let strict = Options::default();
        let mut ctx = Context::new(DialectKind::Postgres.dialect(), &strict);
        assert!(translate_expr(&e, &mut ctx).unwrap_err().is_unsupported());

        let e = col("a").add(1).cast(DataType::Decimal {
            precision: Some(10),
            scale: Some(2),
        });
        assert_snapshot!(render(&e, DialectKind::Postgres), @"CAST(a + 1 AS DECIMAL(10, 2))");

        let e = col("tags").cast(DataType::Array(Box::new(DataType::Text)));
        assert_snapshot!(render(&e, DialectKind::Postgres), @"CAST(tags AS TEXT[])");
    }

    #[test]
    fn test_nulls_ordering_fallback() {
        let options = Options::default();
        let mut ctx = Context::new(DialectKind::MySql.dialect(), &options);
        let order = vec![col("a").desc().nulls_last()];
        assert_snapshot!(
            translate_order_by(&order, &mut ctx).unwrap(),
            @"CASE WHEN a IS NULL THEN 1 ELSE 0 END, a DESC"
        );

        let mut ctx = Context::new(DialectKind::Postgres.dialect(), &options);
        assert_snapshot!(translate_order_by(&order, &mut ctx).unwrap(), @"a DESC NULLS LAST");
    }

    #[test]
    fn test_windows() {
        let spec = WindowSpec::new()
            .partition_by(col("dept"))
            .order_by(col("salary").desc());
        let e = Expr::func("ROW_NUMBER", vec![]).over_spec(spec);
        assert_snapshot!(
            render(&e, DialectKind::MsSql),
            @"ROW_NUMBER() OVER (PARTITION BY dept ORDER BY salary DESC)"
        );

        let options = Options::default();
        let mut ctx = Context::new(DialectKind::MsSql.dialect(), &options);
        let err = translate_expr(&Expr::func("RANK", vec![]).over("w"), &mut ctx).unwrap_err();
        assert_snapshot!(err.reason, @"window `w` not found");
    }
}
