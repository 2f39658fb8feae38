//! Selects, set operations and the pieces they share with mutations:
//! WITH, projections, predicates, ordering and paging.
use super::gen_expr::{translate_expr, translate_list, translate_operand, translate_order_by, translate_window_spec, Associativity};
use super::gen_mutation::{translate_delete, translate_insert, translate_update};
use super::gen_source::{split_sources, translate_joins, translate_sources};
use super::Context;
use crate::ast::{Cte, Distinct, Expr, NamedWindow, OrderBy, Projection, SelectStmt, SetOpStmt, Source, Statement};
use crate::dialect::{Clause, Features, Keyword};
use crate::format::Params;
use crate::{Error, Result};

pub(crate) fn translate_statement(statement: &Statement, ctx: &mut Context) -> Result<String> {
    log::trace!("translating {} statement", statement.kind_name());
    // CTEs declared by this statement are not visible to its siblings
    ctx.push_cte_frame();
    let res = match statement {
        Statement::Select(select) => translate_select(select, ctx),
        Statement::SetOp(set_op) => translate_set_op(set_op, ctx),
        Statement::Insert(insert) => translate_insert(insert, ctx),
        Statement::Update(update) => translate_update(update, ctx),
        Statement::Delete(delete) => translate_delete(delete, ctx),
    };
    ctx.pop_cte_frame();
    res
}

fn translate_select(select: &SelectStmt, ctx: &mut Context) -> Result<String> {
    // applies to this select only, never to the sub-queries inside it
    let for_json = ctx.for_json.take();
    let with = translate_with(&select.with, ctx)?;

    let sources: Vec<&Source> = select.sources.iter().collect();
    ctx.push_scope(&sources, &select.projection);
    ctx.set_windows(&select.windows);
    let res = translate_select_clauses(select, with, for_json, ctx);
    ctx.pop_scope();
    res
}

fn translate_select_clauses(
    select: &SelectStmt,
    mut with: Option<String>,
    for_json: Option<bool>,
    ctx: &mut Context,
) -> Result<String> {
    let dialect = ctx.dialect;
    let order = dialect.select_order();
    let (from, joins) = split_sources(&select.sources);

    let can_top = order.contains(&Clause::Top) && ctx.supports(Features::TOP);
    let mut paging = translate_paging(
        select.limit,
        select.offset,
        !select.order_by.is_empty(),
        can_top,
        ctx,
    )?;
    let named_windows = !select.windows.is_empty() && ctx.supports(Features::NAMED_WINDOWS);

    check_clauses(
        order,
        &[
            (Clause::With, with.is_some()),
            (Clause::Distinct, select.distinct.is_some()),
            (Clause::From, !from.is_empty()),
            (Clause::Joins, !joins.is_empty()),
            (Clause::Where, !select.predicates.is_empty()),
            (Clause::GroupBy, !select.group_by.is_empty()),
            (Clause::Having, select.having.is_some()),
            (Clause::Windows, named_windows),
            (Clause::OrderBy, !select.order_by.is_empty()),
            (Clause::Paging, paging.tail.is_some()),
            (Clause::ForJson, for_json.is_some()),
        ],
        ctx,
    )?;

    let mut parts = Vec::with_capacity(order.len());
    for clause in order {
        let part = match clause {
            Clause::With => with.take(),
            Clause::Select => Some(keyword(Keyword::Select, ctx)?),
            Clause::Distinct => translate_distinct(select.distinct.as_ref(), ctx)?,
            Clause::Top => paging.top.take(),
            Clause::Projection => Some(translate_projection(&select.projection, ctx)?),
            Clause::From if !from.is_empty() => Some(format!(
                "{} {}",
                keyword(Keyword::From, ctx)?,
                translate_sources(from, ctx)?
            )),
            Clause::Joins if !joins.is_empty() => Some(translate_joins(joins, ctx)?),
            Clause::Where if !select.predicates.is_empty() => Some(format!(
                "{} {}",
                keyword(Keyword::Where, ctx)?,
                translate_predicates(&select.predicates, ctx)?
            )),
            Clause::GroupBy if !select.group_by.is_empty() => {
                ctx.set_post_projection(true);
                let group_by = translate_list(&select.group_by, ctx);
                ctx.set_post_projection(false);
                Some(format!("{} {}", keyword(Keyword::GroupBy, ctx)?, group_by?))
            }
            Clause::Having => match &select.having {
                Some(having) => {
                    ctx.set_post_projection(true);
                    let having = translate_expr(having, ctx);
                    ctx.set_post_projection(false);
                    Some(format!("{} {}", keyword(Keyword::Having, ctx)?, having?.text))
                }
                None => None,
            },
            Clause::Windows if named_windows => Some(translate_windows(&select.windows, ctx)?),
            Clause::OrderBy => translate_order_by_clause(&select.order_by, ctx)?,
            Clause::Paging => paging.tail.take(),
            Clause::ForJson => match for_json {
                Some(single) => Some(translate_for_json(single, ctx)?),
                None => None,
            },
            _ => None,
        };
        parts.extend(part);
    }

    Ok(parts.join(" "))
}

/// Raises for clauses a statement uses that the dialect cannot place. In
/// lenient mode the clause is left out.
pub(super) fn check_clauses(order: &[Clause], used: &[(Clause, bool)], ctx: &Context) -> Result<()> {
    for (clause, is_used) in used {
        if *is_used && !order.contains(clause) {
            ctx.unsupported(&format!("{clause:?} clause"))?;
        }
    }
    Ok(())
}

fn translate_set_op(set_op: &SetOpStmt, ctx: &mut Context) -> Result<String> {
    let for_json = ctx.for_json.take();
    let mut parts = Vec::new();
    parts.extend(translate_with(&set_op.with, ctx)?);

    let arity = set_op.first.projection().len();
    for (_, branch) in &set_op.rest {
        let found = branch.projection().len();
        if found != arity {
            return Err(Error::new_simple(format!(
                "branches of a set operation must have the same number of columns: expected {arity}, but found {found}"
            )));
        }
    }

    parts.push(translate_branch(&set_op.first, ctx)?);
    for (op, branch) in &set_op.rest {
        let dialect = ctx.dialect;
        parts.push(dialect.registries().set_ops.get(*op, &Params::new(), ctx.throw_error())?);
        parts.push(translate_branch(branch, ctx)?);
    }

    // ordering and paging apply to the combined rows, which are only
    // visible by their output names
    ctx.push_scope(&[], &[]);
    let tail = translate_set_op_tail(set_op, for_json, ctx);
    ctx.pop_scope();
    parts.extend(tail?);

    Ok(parts.join(" "))
}

fn translate_set_op_tail(
    set_op: &SetOpStmt,
    for_json: Option<bool>,
    ctx: &mut Context,
) -> Result<Vec<String>> {
    let dialect = ctx.dialect;
    let order = dialect.select_order();
    let paging = translate_paging(
        set_op.limit,
        set_op.offset,
        !set_op.order_by.is_empty(),
        false,
        ctx,
    )?;
    check_clauses(
        order,
        &[
            (Clause::OrderBy, !set_op.order_by.is_empty()),
            (Clause::Paging, paging.tail.is_some()),
            (Clause::ForJson, for_json.is_some()),
        ],
        ctx,
    )?;

    let mut parts = Vec::new();
    if order.contains(&Clause::OrderBy) {
        parts.extend(translate_order_by_clause(&set_op.order_by, ctx)?);
    }
    if order.contains(&Clause::Paging) {
        parts.extend(paging.tail);
    }
    if let Some(single) = for_json {
        if order.contains(&Clause::ForJson) {
            parts.push(translate_for_json(single, ctx)?);
        }
    }
    Ok(parts)
}

/// A branch that orders, pages or declares CTEs of its own would change the
/// meaning of the whole set operation if it were inlined.
fn translate_branch(branch: &Statement, ctx: &mut Context) -> Result<String> {
    let inline = match branch {
        Statement::Select(select) => {
            select.with.is_empty()
                && select.order_by.is_empty()
                && select.limit.is_none()
                && select.offset.is_none()
        }
        _ => false,
    };

    let text = translate_statement(branch, ctx)?;
    if inline {
        return Ok(text);
    }
    let alias = ctx.set_op_names.gen();
    log::trace!("wrapping set operation branch as {alias}");
    Ok(format!(
        "{} * {} ({text}) AS {}",
        keyword(Keyword::Select, ctx)?,
        keyword(Keyword::From, ctx)?,
        ctx.quote(&alias)
    ))
}

/// Renders CTEs, making their columns known to later CTEs and to the body.
pub(super) fn translate_with(ctes: &[Cte], ctx: &mut Context) -> Result<Option<String>> {
    if ctes.is_empty() {
        return Ok(None);
    }

    let mut items = Vec::with_capacity(ctes.len());
    for cte in ctes {
        if cte.statement.is_mutation() && !ctx.supports(Features::MUTATION_CTE) {
            ctx.unsupported("data-modifying statements in WITH")?;
        }

        let projection = cte.statement.projection();
        let columns = (!projection.is_empty())
            .then(|| projection.iter().map(|p| p.alias.clone()).collect());
        // registered up front, so a recursive body can refer to itself
        ctx.register_cte(&cte.alias, columns);

        let body = translate_statement(&cte.statement, ctx)?;
        items.push(format!("{} AS ({body})", ctx.quote(&cte.alias)));
    }

    let key = if ctes.iter().any(|c| c.recursive) {
        Keyword::WithRecursive
    } else {
        Keyword::With
    };
    Ok(Some(format!("{} {}", keyword(key, ctx)?, items.join(", "))))
}

fn translate_distinct(distinct: Option<&Distinct>, ctx: &mut Context) -> Result<Option<String>> {
    let Some(distinct) = distinct else {
        return Ok(None);
    };
    match distinct {
        Distinct::On(exprs) if ctx.supports(Features::DISTINCT_ON) => {
            ctx.set_post_projection(true);
            let exprs = translate_list(exprs, ctx);
            ctx.set_post_projection(false);

            let params = Params::new().with("exprs", exprs?);
            let dialect = ctx.dialect;
            let text = dialect
                .registries()
                .keywords
                .get(Keyword::DistinctOn, &params, ctx.throw_error())?;
            Ok(Some(text))
        }
        Distinct::On(_) => {
            ctx.unsupported("DISTINCT ON")?;
            Ok(Some(keyword(Keyword::Distinct, ctx)?))
        }
        Distinct::All => Ok(Some(keyword(Keyword::Distinct, ctx)?)),
    }
}

pub(super) fn translate_projection(projection: &[Projection], ctx: &mut Context) -> Result<String> {
    if projection.is_empty() {
        return Ok("*".to_string());
    }

    let mut items = Vec::with_capacity(projection.len());
    for p in projection {
        let expr = translate_expr(&p.expr, ctx)?.text;
        let named_alike = matches!(&p.expr, Expr::Field { name, .. } if *name == p.alias);
        items.push(if named_alike {
            expr
        } else {
            format!("{expr} AS {}", ctx.quote(&p.alias))
        });
    }
    Ok(items.join(", "))
}

/// Predicates are AND-ed together.
pub(super) fn translate_predicates(predicates: &[Expr], ctx: &mut Context) -> Result<String> {
    if let [single] = predicates {
        return Ok(translate_expr(single, ctx)?.text);
    }
    Ok(predicates
        .iter()
        .map(|p| translate_operand(p, true, 3, Associativity::Both, ctx).map(|e| e.text))
        .collect::<Result<Vec<_>>>()?
        .join(" AND "))
}

fn translate_windows(windows: &[NamedWindow], ctx: &mut Context) -> Result<String> {
    let mut items = Vec::with_capacity(windows.len());
    for window in windows {
        let spec = translate_window_spec(&window.spec, ctx)?;
        items.push(format!("{} AS ({spec})", ctx.quote(&window.name)));
    }
    Ok(format!("{} {}", keyword(Keyword::Window, ctx)?, items.join(", ")))
}

pub(super) fn translate_order_by_clause(
    order_by: &[OrderBy],
    ctx: &mut Context,
) -> Result<Option<String>> {
    if order_by.is_empty() {
        return Ok(None);
    }
    ctx.set_post_projection(true);
    let order_by = translate_order_by(order_by, ctx);
    ctx.set_post_projection(false);
    Ok(Some(format!("{} {}", keyword(Keyword::OrderBy, ctx)?, order_by?)))
}

/// Paging, split into the part printed after SELECT (TOP) and the part
/// printed after ORDER BY.
#[derive(Debug, Default)]
pub(super) struct Paging {
    pub top: Option<String>,
    pub tail: Option<String>,
}

pub(super) fn translate_paging(
    limit: Option<u64>,
    offset: Option<u64>,
    has_order: bool,
    can_top: bool,
    ctx: &Context,
) -> Result<Paging> {
    if limit.is_none() && offset.is_none() {
        return Ok(Paging::default());
    }

    let registry = &ctx.dialect.registries().keywords;
    let throw_error = ctx.throw_error();

    if let (true, Some(limit), None) = (can_top, limit, offset) {
        let params = Params::new().with("limit", limit.to_string());
        return Ok(Paging {
            top: Some(registry.get(Keyword::Top, &params, throw_error)?),
            tail: None,
        });
    }

    if ctx.supports(Features::LIMIT_OFFSET) {
        let mut parts = Vec::new();
        if let Some(limit) = limit {
            let params = Params::new().with("limit", limit.to_string());
            parts.push(registry.get(Keyword::Limit, &params, throw_error)?);
        }
        if let Some(offset) = offset {
            let mut params = Params::new().with("offset", offset.to_string());
            if limit.is_none() {
                params.set("unbounded", "true");
            }
            parts.push(registry.get(Keyword::Offset, &params, throw_error)?);
        }
        return Ok(Paging {
            top: None,
            tail: Some(parts.join(" ")),
        });
    }

    let mut params = Params::new().with("offset", offset.unwrap_or(0).to_string());
    if let Some(limit) = limit {
        params.set("limit", limit.to_string());
    }
    let mut tail = registry.get(Keyword::Fetch, &params, throw_error)?;
    if !has_order && ctx.dialect.handler().fetch_requires_order() {
        let order = registry.get(Keyword::FetchOrder, &Params::new(), throw_error)?;
        tail = format!("{order} {tail}");
    }
    Ok(Paging {
        top: None,
        tail: Some(tail),
    })
}

fn translate_for_json(single: bool, ctx: &Context) -> Result<String> {
    let mut params = Params::new();
    if single {
        params.set("single", "true");
    }
    ctx.dialect
        .registries()
        .keywords
        .get(Keyword::ForJson, &params, ctx.throw_error())
}

pub(super) fn keyword(key: Keyword, ctx: &Context) -> Result<String> {
    ctx.dialect
        .registries()
        .keywords
        .get(key, &Params::new(), ctx.throw_error())
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use rstest::rstest;

    use super::*;
    use crate::ast::{DataType, JoinKind, Table, WindowSpec};
    use crate::{DialectKind, Options};

    fn compile(stmt: impl Into<Statement>, target: DialectKind) -> String {
        let options = Options::default().with_target(target).inline_constants();
        crate::compile(&stmt.into(), &options).unwrap().sql
    }

    fn employees() -> Table {
        Table::new("employees")
            .column("id", DataType::Integer)
            .column("name", DataType::Text)
            .column("dept_id", DataType::Integer)
            .column("salary", DataType::Double)
    }

    fn departments() -> Table {
        Table::new("departments")
            .alias("d")
            .column("id", DataType::Integer)
            .column("title", DataType::Text)
    }

    #[rstest]
    #[case::generic(DialectKind::Generic, "SELECT id FROM employees ORDER BY id OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY")]
    #[case::postgres(DialectKind::Postgres, "SELECT id FROM employees ORDER BY id LIMIT 10 OFFSET 20")]
    #[case::mysql(DialectKind::MySql, "SELECT id FROM employees ORDER BY id LIMIT 10 OFFSET 20")]
    #[case::mssql(DialectKind::MsSql, "SELECT id FROM employees ORDER BY id OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY")]
    #[case::sqlite(DialectKind::SQLite, "SELECT id FROM employees ORDER BY id LIMIT 10 OFFSET 20")]
    fn test_paging(#[case] target: DialectKind, #[case] expected: &str) {
        let e = employees();
        let stmt = SelectStmt::new()
            .from(&e)
            .columns([e.col("id")])
            .order_by(e.col("id"))
            .limit(10)
            .offset(20);
        assert_eq!(compile(stmt, target), expected);
    }

    #[test]
    fn test_paging_edges() {
        let e = employees();
        let limited = SelectStmt::new().from(&e).columns([e.col("id")]).limit(5);
        assert_snapshot!(compile(limited.clone(), DialectKind::MsSql), @"SELECT TOP (5) id FROM employees");
        assert_snapshot!(compile(limited, DialectKind::Generic), @"SELECT id FROM employees OFFSET 0 ROWS FETCH NEXT 5 ROWS ONLY");

        let skipped = SelectStmt::new().from(&e).columns([e.col("id")]).offset(5);
        assert_snapshot!(compile(skipped.clone(), DialectKind::Postgres), @"SELECT id FROM employees OFFSET 5");
        assert_snapshot!(compile(skipped.clone(), DialectKind::MySql), @"SELECT id FROM employees LIMIT 18446744073709551615 OFFSET 5");
        assert_snapshot!(compile(skipped.clone(), DialectKind::SQLite), @"SELECT id FROM employees LIMIT -1 OFFSET 5");
        assert_snapshot!(compile(skipped, DialectKind::MsSql), @"SELECT id FROM employees ORDER BY (SELECT NULL) OFFSET 5 ROWS");
    }

    #[test]
    fn test_join_simplification() {
        let e = employees();
        let d = departments();
        let stmt = SelectStmt::new()
            .from(&e)
            .inner_join(&d, e.col("dept_id").eq(d.col("id")))
            .columns([e.col("name"), d.col("title")])
            .select("dept", d.col("id"))
            .filter(e.col("salary").gt(1000));

        assert_snapshot!(
            compile(stmt.clone(), DialectKind::Postgres),
            @"SELECT name, title, d.id AS dept FROM employees INNER JOIN departments AS d ON dept_id = d.id WHERE salary > 1000"
        );

        let options = Options::default()
            .inline_constants()
            .with_simplify_references(false);
        let out = crate::compile(&stmt.into(), &options).unwrap();
        assert_snapshot!(
            out.sql,
            @"SELECT employees.name, d.title, d.id AS dept FROM employees INNER JOIN departments AS d ON employees.dept_id = d.id WHERE employees.salary > 1000"
        );
    }

    #[test]
    fn test_unknown_columns_keep_qualifiers() {
        let e = employees();
        let audit = Table::new("audit");
        let stmt = SelectStmt::new()
            .from(&e)
            .left_join(&audit, audit.col("employee_id").eq(e.col("id")))
            .columns([e.col("name"), audit.col("changed_at")]);
        assert_snapshot!(
            compile(stmt, DialectKind::Generic),
            @"SELECT employees.name, audit.changed_at FROM employees LEFT JOIN audit ON audit.employee_id = employees.id"
        );
    }

    #[test]
    fn test_output_alias_shadowing() {
        let e = employees();
        let d = departments();
        // `title` is both an output alias and a column of `employees`
        let e = e.column("title", DataType::Text);
        let stmt = SelectStmt::new()
            .from(&e)
            .inner_join(&d, e.col("dept_id").eq(d.col("id")))
            .select("title", d.col("title").concat(" dept"))
            .order_by(e.col("salary"))
            .order_by(e.col("title"));
        assert_snapshot!(
            compile(stmt, DialectKind::Postgres),
            @"SELECT d.title || ' dept' AS title FROM employees INNER JOIN departments AS d ON dept_id = d.id ORDER BY salary, employees.title"
        );
    }

    #[test]
    fn test_group_by() {
        let e = employees();
        let stmt = SelectStmt::new()
            .from(&e)
            .columns([e.col("dept_id")])
            .select("total", Expr::aggregate(crate::ast::AggregateKind::Sum, e.col("salary")))
            .group_by(e.col("dept_id"))
            .having(Expr::count_star().gt(2));
        assert_snapshot!(
            compile(stmt, DialectKind::MySql),
            @"SELECT dept_id, SUM(salary) AS total FROM employees GROUP BY dept_id HAVING COUNT(*) > 2"
        );
    }

    #[test]
    fn test_distinct_on() {
        let e = employees();
        let stmt = SelectStmt::new()
            .from(&e)
            .distinct_on(vec![e.col("dept_id")])
            .columns([e.col("dept_id"), e.col("name")])
            .order_by(e.col("dept_id"));
        assert_snapshot!(
            compile(stmt.clone(), DialectKind::Postgres),
            @"SELECT DISTINCT ON (dept_id) dept_id, name FROM employees ORDER BY dept_id"
        );

        let options = Options::default().with_target(DialectKind::SQLite).lenient();
        let out = crate::compile(&stmt.into(), &options).unwrap();
        assert_snapshot!(out.sql, @"SELECT DISTINCT dept_id, name FROM employees ORDER BY dept_id");
    }

    #[test]
    fn test_named_windows() {
        let e = employees();
        let stmt = SelectStmt::new()
            .from(&e)
            .columns([e.col("name")])
            .select("rank", Expr::func("RANK", vec![]).over("w"))
            .window("w", WindowSpec::new().partition_by(e.col("dept_id")).order_by(e.col("salary").desc()));
        assert_snapshot!(
            compile(stmt.clone(), DialectKind::Postgres),
            @"SELECT name, RANK() OVER w AS rank FROM employees WINDOW w AS (PARTITION BY dept_id ORDER BY salary DESC)"
        );
        assert_snapshot!(
            compile(stmt, DialectKind::MsSql),
            @"SELECT name, RANK() OVER (PARTITION BY dept_id ORDER BY salary DESC) AS rank FROM employees"
        );
    }

    #[test]
    fn test_ctes() {
        let e = employees();
        let rich = SelectStmt::new()
            .from(&e)
            .columns([e.col("id"), e.col("name")])
            .filter(e.col("salary").gt(100));
        let r = Table::new("rich");
        let d = departments();
        let stmt = SelectStmt::new()
            .with("rich", rich)
            .from(&r)
            .cross_join(&d)
            .columns([r.col("name"), d.col("title")]);
        assert_snapshot!(
            compile(stmt, DialectKind::Postgres),
            @"WITH rich AS (SELECT id, name FROM employees WHERE salary > 100) SELECT name, title FROM rich CROSS JOIN departments AS d"
        );
    }

    #[test]
    fn test_recursive_cte() {
        let n = Table::new("n");
        let seed = SelectStmt::new().select("x", Expr::constant(1));
        let step = SelectStmt::new()
            .from(&n)
            .select("x", n.col("x").add(1))
            .filter(n.col("x").lt(10));
        let stmt = SelectStmt::new()
            .with_recursive("n", seed.union_all(step))
            .from(&n)
            .columns([n.col("x")]);
        assert_snapshot!(
            compile(stmt.clone(), DialectKind::SQLite),
            @"WITH RECURSIVE n AS (SELECT 1 AS x UNION ALL SELECT x + 1 AS x FROM n WHERE x < 10) SELECT x FROM n"
        );
        assert_snapshot!(
            compile(stmt, DialectKind::MsSql),
            @"WITH n AS (SELECT 1 AS x UNION ALL SELECT x + 1 AS x FROM n WHERE x < 10) SELECT x FROM n"
        );
    }

    #[test]
    fn test_set_ops() {
        let e = employees();
        let d = departments();
        let names = SelectStmt::new().from(&e).columns([e.col("name")]);
        let titles = SelectStmt::new()
            .from(&d)
            .select("name", d.col("title"))
            .order_by(d.col("title"))
            .limit(3);
        let stmt = names
            .union(titles)
            .order_by(Expr::column("name"))
            .limit(5);
        assert_snapshot!(
            compile(stmt.clone(), DialectKind::Postgres),
            @"SELECT name FROM employees UNION SELECT * FROM (SELECT title AS name FROM departments AS d ORDER BY title LIMIT 3) AS _s0 ORDER BY name LIMIT 5"
        );
        assert_snapshot!(
            compile(stmt, DialectKind::MsSql),
            @"SELECT name FROM employees UNION SELECT * FROM (SELECT TOP (3) title AS name FROM departments AS d ORDER BY title) AS _s0 ORDER BY name OFFSET 0 ROWS FETCH NEXT 5 ROWS ONLY"
        );
    }

    #[test]
    fn test_set_op_errors() {
        let e = employees();
        let one = SelectStmt::new().from(&e).columns([e.col("name")]);
        let two = SelectStmt::new().from(&e).columns([e.col("name"), e.col("id")]);

        let options = Options::default();
        let err = crate::compile(&one.clone().union(two).into(), &options).unwrap_err();
        assert_snapshot!(err.reason, @"branches of a set operation must have the same number of columns: expected 1, but found 2");

        let stmt = one.clone().union(one.clone()).then(crate::ast::SetOperator::ExceptAll, one);
        let options = Options::default().with_target(DialectKind::SQLite);
        let err = crate::compile(&stmt.into(), &options).unwrap_err();
        assert_snapshot!(err, @"[E0101] EXCEPT ALL is not supported by dialect sqlite");
    }

    #[test]
    fn test_correlated_subquery() {
        let e = employees();
        let d = departments();
        let inner = SelectStmt::new()
            .from(&e)
            .select("one", Expr::constant(1))
            .filter(e.col("dept_id").eq(d.col("id")));
        let stmt = SelectStmt::new()
            .from(&d)
            .columns([d.col("title")])
            .filter(Expr::exists(inner));
        assert_snapshot!(
            compile(stmt, DialectKind::Postgres),
            @"SELECT title FROM departments AS d WHERE EXISTS (SELECT 1 AS one FROM employees WHERE dept_id = d.id)"
        );
    }

    #[test]
    fn test_missing_clause() {
        let e = employees();
        let stmt: Statement = SelectStmt::new()
            .from(&e)
            .columns([e.col("id")])
            .group_by(e.col("id"))
            .into();

        let dialect = DialectKind::Postgres
            .builder()
            .select_order(&[Clause::Select, Clause::Projection, Clause::From])
            .build();
        let err = crate::compile_with(&stmt, &dialect, &Options::default()).unwrap_err();
        assert_snapshot!(err.reason, @"GroupBy clause is not supported by dialect postgres");

        let out = crate::compile_with(&stmt, &dialect, &Options::default().lenient()).unwrap();
        assert_snapshot!(out.sql, @"SELECT id FROM employees");
    }

    #[test]
    fn test_cross_joined_plain_sources() {
        let e = employees();
        let d = departments();
        let t = Table::new("tags").column("label", DataType::Text);
        let mut stmt = SelectStmt::new()
            .from(&e)
            .join(JoinKind::Left, &d, e.col("dept_id").eq(d.col("id")))
            .columns([t.col("label")]);
        stmt.sources.push(t.clone().into());
        assert_snapshot!(
            compile(stmt, DialectKind::Generic),
            @"SELECT label FROM employees LEFT JOIN departments AS d ON dept_id = d.id CROSS JOIN tags"
        );
    }
}
