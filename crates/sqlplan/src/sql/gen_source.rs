//! FROM items: tables, derived tables, inline rows and joins.
use super::gen_expr::translate_expr;
use super::gen_query::translate_statement;
use super::Context;
use crate::ast::{Expr, JoinKind, Source, Table};
use crate::dialect::Keyword;
use crate::format::Params;
use crate::{Error, Result};

/// Splits sources into the leading comma-separated items and the join chain
/// that follows them.
pub(super) fn split_sources(sources: &[Source]) -> (&[Source], &[Source]) {
    let first_join = sources
        .iter()
        .position(|s| matches!(s, Source::Join { .. }))
        .unwrap_or(sources.len());
    sources.split_at(first_join)
}

/// `a, b AS x`
pub(super) fn translate_sources(sources: &[Source], ctx: &mut Context) -> Result<String> {
    Ok(sources
        .iter()
        .map(|s| translate_source(s, ctx))
        .collect::<Result<Vec<_>>>()?
        .join(", "))
}

/// `INNER JOIN b ON .. LEFT JOIN c ON ..`. Plain sources after the first join
/// are cross joined.
pub(super) fn translate_joins(sources: &[Source], ctx: &mut Context) -> Result<String> {
    let mut joins = Vec::with_capacity(sources.len());
    for source in sources {
        let text = match source {
            Source::Join { .. } => translate_source(source, ctx)?,
            plain => translate_join(JoinKind::Cross, plain, None, ctx)?,
        };
        joins.push(text);
    }
    Ok(joins.join(" "))
}

pub(super) fn translate_source(source: &Source, ctx: &mut Context) -> Result<String> {
    match source {
        Source::Table(table) => Ok(translate_table(table, true, ctx)),
        Source::Derived { alias, statement } => {
            let statement = translate_statement(statement, ctx)?;
            Ok(format!("({statement}) AS {}", ctx.quote(alias)))
        }
        Source::Values {
            alias,
            columns,
            rows,
        } => translate_values(alias, columns, rows, ctx),
        Source::Join {
            kind,
            source,
            condition,
        } => translate_join(*kind, source, condition.as_ref(), ctx),
    }
}

fn translate_join(
    kind: JoinKind,
    source: &Source,
    condition: Option<&Expr>,
    ctx: &mut Context,
) -> Result<String> {
    let source = translate_source(source, ctx)?;
    let mut params = Params::new().with("source", source);
    if let Some(condition) = condition {
        params.set("condition", translate_expr(condition, ctx)?.text);
    }

    ctx.dialect
        .registries()
        .joins
        .get(kind, &params, ctx.throw_error())
}

/// `schema.name`, followed by ` AS alias` when asked for and the alias
/// differs from the name.
pub(super) fn translate_table(table: &Table, with_alias: bool, ctx: &Context) -> String {
    let mut text = match &table.schema {
        Some(schema) => format!("{}.{}", ctx.quote(schema), ctx.quote(&table.name)),
        None => ctx.quote(&table.name),
    };
    if with_alias && table.alias != table.name {
        text += " AS ";
        text += &ctx.quote(&table.alias);
    }
    text
}

fn translate_values(
    alias: &str,
    columns: &[String],
    rows: &[Vec<Expr>],
    ctx: &mut Context,
) -> Result<String> {
    if rows.is_empty() {
        return Err(Error::new_simple(format!(
            "inline rows `{alias}` must have at least one row"
        )));
    }
    if let Some(row) = rows.iter().find(|r| r.len() != columns.len()) {
        return Err(Error::new_simple(format!(
            "inline rows `{alias}` declare {} columns, but a row has {}",
            columns.len(),
            row.len()
        )));
    }

    let alias = ctx.quote(alias);
    let columns: Vec<_> = columns.iter().map(|c| ctx.quote(c)).collect();

    if !ctx.dialect.handler().derived_column_aliases() {
        // name the columns in the first row instead
        let mut selects = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            let mut items = Vec::with_capacity(row.len());
            for (expr, column) in row.iter().zip(&columns) {
                let expr = translate_expr(expr, ctx)?.text;
                items.push(if i == 0 {
                    format!("{expr} AS {column}")
                } else {
                    expr
                });
            }
            selects.push(format!("SELECT {}", items.join(", ")));
        }
        return Ok(format!("({}) AS {alias}", selects.join(" UNION ALL ")));
    }

    let mut values = Vec::with_capacity(rows.len());
    for row in rows {
        let elements = row
            .iter()
            .map(|e| translate_expr(e, ctx).map(|e| e.text))
            .collect::<Result<Vec<_>>>()?
            .join(", ");
        let params = Params::new().with("elements", elements);
        values.push(
            ctx.dialect
                .registries()
                .keywords
                .get(Keyword::ValuesRow, &params, ctx.throw_error())?,
        );
    }
    let keyword = ctx
        .dialect
        .registries()
        .keywords
        .keyword(Keyword::Values)
        .to_string();
    Ok(format!(
        "({keyword} {}) AS {alias} ({})",
        values.join(", "),
        columns.join(", ")
    ))
}
