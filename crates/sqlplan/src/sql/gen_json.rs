//! Sub-queries used as values. Depending on their shape they become scalar
//! sub-queries, or are folded into a single JSON value the decoder expands
//! again.
use std::borrow::Cow;

use super::gen_expr::SqlExpr;
use super::gen_query::translate_statement;
use super::Context;
use crate::ast::{DataType, Expr, Projection, Shape, Statement};
use crate::dialect::{Clause, Features, JsonKey};
use crate::format::Params;
use crate::{Error, Result};

pub(super) fn translate_query_expr(statement: &Statement, ctx: &mut Context) -> Result<SqlExpr> {
    let shape = statement.shape();
    if shape == Shape::Value {
        return translate_scalar(statement, ctx);
    }
    if statement.projection().is_empty() {
        return Err(Error::new_simple(format!(
            "a nested {} sub-query needs an explicit projection",
            statement.kind_name()
        )));
    }

    if ctx.supports(Features::JSON_FUNCTIONS) {
        translate_json_functions(statement, shape, ctx)
    } else if ctx.dialect.select_order().contains(&Clause::ForJson) {
        translate_for_json(statement, shape, ctx)
    } else {
        ctx.unsupported("nesting sub-queries as JSON")?;
        translate_scalar(statement, ctx)
    }
}

fn translate_scalar(statement: &Statement, ctx: &mut Context) -> Result<SqlExpr> {
    let text = translate_statement(statement, ctx)?;
    Ok(SqlExpr::atom(text).wrap_in_parenthesis())
}

/// `(SELECT agg(object(...)) FROM (inner) AS _jN)`
fn translate_json_functions(statement: &Statement, shape: Shape, ctx: &mut Context) -> Result<SqlExpr> {
    let dialect = ctx.dialect;
    let registry = &dialect.registries().json;
    let throw_error = ctx.throw_error();

    let inner = translate_statement(&limit_to_first(statement, shape), ctx)?;
    let alias = ctx.json_names.gen();
    let alias = ctx.quote(&alias);
    log::trace!("nesting {shape} sub-query as {alias}");

    let projection = statement.projection();
    let columns: Vec<String> = projection
        .iter()
        .map(|p| json_column(&alias, p, ctx))
        .collect::<Result<_>>()?;

    let value = match shape {
        Shape::List => {
            let params = Params::new().with("value", columns[0].clone());
            registry.get(JsonKey::Rows, &params, throw_error)?
        }
        _ => {
            let mut pairs = Vec::with_capacity(projection.len());
            for (p, column) in projection.iter().zip(columns) {
                let params = Params::new()
                    .with("key", dialect.handler().string_literal(&p.alias))
                    .with("value", column);
                pairs.push(registry.get(JsonKey::Pair, &params, throw_error)?);
            }
            let params = Params::new().with("pairs", pairs.join(", "));
            let object = registry.get(JsonKey::Object, &params, throw_error)?;

            if shape == Shape::First {
                object
            } else {
                let params = Params::new().with("value", object);
                registry.get(JsonKey::Rows, &params, throw_error)?
            }
        }
    };

    Ok(SqlExpr::atom(format!("SELECT {value} FROM ({inner}) AS {alias}")).wrap_in_parenthesis())
}

/// A column of the inner query, wrapped so it keeps its meaning inside JSON.
fn json_column(alias: &str, projection: &Projection, ctx: &Context) -> Result<String> {
    let column = format!("{alias}.{}", ctx.quote(&projection.alias));
    let key = match (&projection.expr, projection.expr.data_type()) {
        (Expr::Query(_), _) | (_, Some(DataType::Json)) => JsonKey::Nested,
        (_, Some(DataType::Point)) => JsonKey::Geometry,
        (_, Some(DataType::Bytes)) => JsonKey::Binary,
        _ => return Ok(column),
    };
    let params = Params::new().with("value", column);
    ctx.dialect
        .registries()
        .json
        .get(key, &params, ctx.throw_error())
}

/// The inner query ends with FOR JSON; rows of a list come back as
/// single-key objects, which the decoder flattens.
fn translate_for_json(statement: &Statement, shape: Shape, ctx: &mut Context) -> Result<SqlExpr> {
    if statement.is_mutation() {
        return Err(Error::new_simple(format!(
            "{} statements cannot be nested as JSON",
            statement.kind_name()
        )));
    }

    let single = shape == Shape::First;
    ctx.for_json = Some(single);
    let inner = translate_statement(&limit_to_first(statement, shape), ctx);
    ctx.for_json = None;
    let inner = inner?;

    let params = Params::new().with("value", if single {
        format!("({inner})")
    } else {
        format!("COALESCE(({inner}), '[]')")
    });
    let text = ctx
        .dialect
        .registries()
        .json
        .get(JsonKey::Nested, &params, ctx.throw_error())?;
    Ok(SqlExpr::atom(text))
}

fn limit_to_first(statement: &Statement, shape: Shape) -> Cow<'_, Statement> {
    let needs_limit = shape == Shape::First
        && matches!(statement, Statement::Select(_) | Statement::SetOp(_))
        && !statement.limit().is_some_and(|l| l <= 1);
    if !needs_limit {
        return Cow::Borrowed(statement);
    }

    let mut statement = statement.clone();
    match &mut statement {
        Statement::Select(s) => s.limit = Some(1),
        Statement::SetOp(s) => s.limit = Some(1),
        _ => {}
    }
    Cow::Owned(statement)
}
