//! INSERT, UPDATE and DELETE.
use super::gen_expr::{translate_expr, translate_list};
use super::gen_query::{
    check_clauses, keyword, translate_order_by_clause, translate_paging, translate_predicates,
    translate_projection, translate_statement, translate_with,
};
use super::gen_source::{split_sources, translate_joins, translate_sources, translate_table};
use super::Context;
use crate::ast::{
    Assignment, ConflictAction, DeleteStmt, Expr, InsertPriority, InsertSource, InsertStmt,
    JoinKind, Projection, SelectStmt, Source, Statement, Table, UpdateStmt,
};
use crate::dialect::{Clause, Features, Keyword};
use crate::format::Params;
use crate::{Error, Result};

/// Where the rows of a RETURNING list are printed.
#[derive(Debug, Clone, Copy)]
enum Returning {
    /// A trailing RETURNING clause.
    Clause,
    /// An OUTPUT clause reading the given pseudo table.
    Output(Keyword),
}

/// How a conflict on insert is resolved, once the dialect's capabilities
/// were taken into account.
enum Upsert<'a> {
    OnConflict {
        target: &'a [String],
        action: Option<&'a [Assignment]>,
    },
    OnDuplicateKey(&'a [Assignment]),
}

pub(super) fn translate_insert(insert: &InsertStmt, ctx: &mut Context) -> Result<String> {
    let with = translate_with(&insert.with, ctx)?;

    let target = Source::Table(insert.table.clone());
    let qualifier = translate_table(&insert.table, false, ctx);
    ctx.push_scope(&[&target], &insert.returning);
    ctx.set_qualifier(&insert.table.alias, qualifier);
    let res = translate_insert_clauses(insert, with, ctx);
    ctx.pop_scope();
    res
}

fn translate_insert_clauses(
    insert: &InsertStmt,
    mut with: Option<String>,
    ctx: &mut Context,
) -> Result<String> {
    let dialect = ctx.dialect;
    let order = dialect.insert_order();
    let registry = &dialect.registries().keywords;
    let throw_error = ctx.throw_error();

    let mut modifiers = Vec::new();
    if let Some(priority) = insert.priority {
        if ctx.supports(Features::INSERT_PRIORITY) {
            let key = match priority {
                InsertPriority::Low => Keyword::LowPriority,
                InsertPriority::Delayed => Keyword::Delayed,
                InsertPriority::High => Keyword::HighPriority,
            };
            modifiers.push(keyword(key, ctx)?);
        } else {
            ctx.unsupported("INSERT priority")?;
        }
    }

    let (ignore, upsert) = plan_conflict(insert, ctx)?;
    if ignore {
        modifiers.push(keyword(Keyword::InsertIgnore, ctx)?);
    }

    let returning = plan_returning(&insert.returning, order, Keyword::Inserted, ctx)?;
    check_clauses(
        order,
        &[
            (Clause::With, with.is_some()),
            (Clause::Upsert, upsert.is_some()),
        ],
        ctx,
    )?;

    let mut parts = Vec::with_capacity(order.len());
    for clause in order {
        let part = match clause {
            Clause::With => with.take(),
            Clause::Insert => {
                let modifiers: String = modifiers.iter().map(|m| format!(" {m}")).collect();
                let columns = match insert.columns.as_slice() {
                    [] => String::new(),
                    columns => format!(
                        " ({})",
                        columns.iter().map(|c| ctx.quote(c)).collect::<Vec<_>>().join(", ")
                    ),
                };
                let params = Params::new()
                    .with("modifiers", modifiers)
                    .with("table", translate_table(&insert.table, false, ctx))
                    .with("columns", columns);
                Some(registry.get(Keyword::Insert, &params, throw_error)?)
            }
            Clause::Values => Some(translate_insert_source(insert, ctx)?),
            Clause::Upsert => match &upsert {
                Some(upsert) => Some(translate_upsert(upsert, ctx)?),
                None => None,
            },
            Clause::Output | Clause::Returning => {
                translate_returning(*clause, returning, &insert.returning, &insert.table, ctx)?
            }
            _ => None,
        };
        parts.extend(part);
    }
    Ok(parts.join(" "))
}

/// Picks between the IGNORE modifier, ON CONFLICT and ON DUPLICATE KEY,
/// substituting one for another where they mean the same thing.
fn plan_conflict<'a>(insert: &'a InsertStmt, ctx: &Context) -> Result<(bool, Option<Upsert<'a>>)> {
    let on_conflict = ctx.supports(Features::ON_CONFLICT);
    let insert_ignore = ctx.supports(Features::INSERT_IGNORE);

    let mut ignore = false;
    let mut upsert = None;

    if insert.ignore {
        if insert_ignore {
            ignore = true;
        } else if on_conflict {
            upsert = Some(Upsert::OnConflict {
                target: &[],
                action: None,
            });
        } else {
            ctx.unsupported("INSERT IGNORE")?;
        }
    }

    match &insert.on_conflict {
        None => {}
        Some(conflict) => match &conflict.action {
            ConflictAction::DoNothing if on_conflict => {
                upsert = Some(Upsert::OnConflict {
                    target: &conflict.target,
                    action: None,
                });
            }
            ConflictAction::DoNothing if insert_ignore => ignore = true,
            ConflictAction::DoUpdate(assignments) if on_conflict => {
                upsert = Some(Upsert::OnConflict {
                    target: &conflict.target,
                    action: Some(assignments.as_slice()),
                });
            }
            ConflictAction::DoUpdate(assignments)
                if ctx.supports(Features::UPSERT_ON_DUPLICATE) =>
            {
                upsert = Some(Upsert::OnDuplicateKey(assignments.as_slice()));
            }
            _ => ctx.unsupported("upsert")?,
        },
    }

    Ok((ignore, upsert))
}

fn translate_insert_source(insert: &InsertStmt, ctx: &mut Context) -> Result<String> {
    match &insert.source {
        InsertSource::Values(rows) => {
            if rows.is_empty() {
                return Err(Error::new_simple(format!(
                    "insert into `{}` has no rows",
                    insert.table.name
                )));
            }
            let arity = if insert.columns.is_empty() {
                rows[0].len()
            } else {
                insert.columns.len()
            };

            let mut values = Vec::with_capacity(rows.len());
            for row in rows {
                if row.len() != arity {
                    return Err(Error::new_simple(format!(
                        "insert into `{}` expected rows of {arity} values, but found {}",
                        insert.table.name,
                        row.len()
                    )));
                }
                values.push(format!("({})", translate_list(row, ctx)?));
            }
            Ok(format!("{} {}", keyword(Keyword::Values, ctx)?, values.join(", ")))
        }
        InsertSource::Query(query) => translate_statement(query, ctx),
        InsertSource::DefaultValues => keyword(Keyword::DefaultValues, ctx),
    }
}

fn translate_upsert(upsert: &Upsert, ctx: &mut Context) -> Result<String> {
    let dialect = ctx.dialect;
    let registry = &dialect.registries().keywords;
    match upsert {
        Upsert::OnConflict { target, action } => {
            let target = match target {
                [] => String::new(),
                columns => format!(
                    " ({})",
                    columns.iter().map(|c| ctx.quote(c)).collect::<Vec<_>>().join(", ")
                ),
            };
            let action = match action {
                None => "DO NOTHING".to_string(),
                Some(assignments) => {
                    // both the existing and the proposed row are in scope
                    ctx.set_force_qualified(true);
                    let assignments = translate_assignments(assignments, None, ctx);
                    ctx.set_force_qualified(false);
                    format!("DO UPDATE SET {}", assignments?)
                }
            };
            let params = Params::new().with("target", target).with("action", action);
            registry.get(Keyword::OnConflict, &params, ctx.throw_error())
        }
        Upsert::OnDuplicateKey(assignments) => {
            let params = Params::new().with("assignments", translate_assignments(assignments, None, ctx)?);
            registry.get(Keyword::OnDuplicateKey, &params, ctx.throw_error())
        }
    }
}

pub(super) fn translate_update(update: &UpdateStmt, ctx: &mut Context) -> Result<String> {
    if update.assignments.is_empty() {
        return Err(Error::new_simple(format!(
            "update of `{}` has no assignments",
            update.table.name
        )));
    }
    let with = translate_with(&update.with, ctx)?;

    let strategy = plan_sources(
        &update.sources,
        Features::UPDATE_FROM,
        Clause::From,
        ctx.dialect.update_order(),
        ctx,
    )?;
    if let SourceStrategy::Exists = strategy {
        ctx.unsupported("UPDATE with additional sources")?;
    }

    let target = Source::Table(update.table.clone());
    let mut sources = vec![&target];
    sources.extend(update.sources.iter());
    let qualifier = translate_table(&update.table, false, ctx);
    ctx.push_scope(&sources, &update.returning);
    ctx.set_qualifier(&update.table.alias, qualifier);
    let res = translate_update_clauses(update, with, strategy, ctx);
    ctx.pop_scope();
    res
}

fn translate_update_clauses(
    update: &UpdateStmt,
    mut with: Option<String>,
    strategy: SourceStrategy,
    ctx: &mut Context,
) -> Result<String> {
    let dialect = ctx.dialect;
    let order = dialect.update_order();

    let (sources, mut predicates) = detach_leading_join(&update.sources, strategy, ctx)?;
    predicates.extend(update.predicates.iter().cloned());
    if let SourceStrategy::Exists = strategy {
        // filters may reference the sources, which are only in scope inside
        predicates = vec![exists_rewrite(sources.clone(), predicates)];
    }

    let returning = plan_returning(&update.returning, order, Keyword::Inserted, ctx)?;
    let mut paging = translate_paging(update.limit, None, !update.order_by.is_empty(), false, ctx)?;
    check_clauses(
        order,
        &[
            (Clause::With, with.is_some()),
            (Clause::From, matches!(strategy, SourceStrategy::Clause) && !sources.is_empty()),
            (Clause::Where, !predicates.is_empty()),
            (Clause::OrderBy, !update.order_by.is_empty()),
            (Clause::Paging, paging.tail.is_some()),
        ],
        ctx,
    )?;

    let table = translate_table(&update.table, false, ctx);
    let mut parts = Vec::with_capacity(order.len());
    for clause in order {
        let part = match clause {
            Clause::With => with.take(),
            Clause::Update => {
                let mut target = table.clone();
                if let SourceStrategy::MultiTable = strategy {
                    target = format!("{target} {}", translate_joins(&sources, ctx)?);
                }
                let params = Params::new().with("table", target);
                Some(
                    dialect
                        .registries()
                        .keywords
                        .get(Keyword::Update, &params, ctx.throw_error())?,
                )
            }
            Clause::Set => {
                // other tables may have columns of the same name
                let qualifier = matches!(strategy, SourceStrategy::MultiTable).then_some(table.as_str());
                let assignments = translate_assignments(&update.assignments, qualifier, ctx)?;
                let params = Params::new().with("assignments", assignments);
                Some(
                    dialect
                        .registries()
                        .keywords
                        .get(Keyword::Set, &params, ctx.throw_error())?,
                )
            }
            Clause::From if matches!(strategy, SourceStrategy::Clause) => {
                translate_source_clause(Keyword::From, &sources, ctx)?
            }
            Clause::Where if !predicates.is_empty() => Some(format!(
                "{} {}",
                keyword(Keyword::Where, ctx)?,
                translate_predicates(&predicates, ctx)?
            )),
            Clause::OrderBy => translate_order_by_clause(&update.order_by, ctx)?,
            Clause::Paging => paging.tail.take(),
            Clause::Output | Clause::Returning => {
                translate_returning(*clause, returning, &update.returning, &update.table, ctx)?
            }
            _ => None,
        };
        parts.extend(part);
    }
    Ok(parts.join(" "))
}

pub(super) fn translate_delete(delete: &DeleteStmt, ctx: &mut Context) -> Result<String> {
    let with = translate_with(&delete.with, ctx)?;

    let strategy = plan_sources(
        &delete.sources,
        Features::DELETE_USING,
        Clause::Using,
        ctx.dialect.delete_order(),
        ctx,
    )?;
    if let SourceStrategy::Exists = strategy {
        log::debug!("rewriting DELETE sources as a correlated EXISTS");
    }

    let target = Source::Table(delete.table.clone());
    let mut sources = vec![&target];
    sources.extend(delete.sources.iter());
    let qualifier = translate_table(&delete.table, false, ctx);
    ctx.push_scope(&sources, &delete.returning);
    ctx.set_qualifier(&delete.table.alias, qualifier);
    let res = translate_delete_clauses(delete, with, strategy, ctx);
    ctx.pop_scope();
    res
}

fn translate_delete_clauses(
    delete: &DeleteStmt,
    mut with: Option<String>,
    strategy: SourceStrategy,
    ctx: &mut Context,
) -> Result<String> {
    let dialect = ctx.dialect;
    let order = dialect.delete_order();

    let (sources, mut predicates) = detach_leading_join(&delete.sources, strategy, ctx)?;
    predicates.extend(delete.predicates.iter().cloned());
    if let SourceStrategy::Exists = strategy {
        // filters may reference the sources, which are only in scope inside
        predicates = vec![exists_rewrite(sources.clone(), predicates)];
    }

    let returning = plan_returning(&delete.returning, order, Keyword::Deleted, ctx)?;
    let mut paging = translate_paging(delete.limit, None, !delete.order_by.is_empty(), false, ctx)?;
    check_clauses(
        order,
        &[
            (Clause::With, with.is_some()),
            (Clause::Using, matches!(strategy, SourceStrategy::Clause) && !sources.is_empty()),
            (Clause::Where, !predicates.is_empty()),
            (Clause::OrderBy, !delete.order_by.is_empty()),
            (Clause::Paging, paging.tail.is_some()),
        ],
        ctx,
    )?;

    let mut parts = Vec::with_capacity(order.len());
    for clause in order {
        let part = match clause {
            Clause::With => with.take(),
            Clause::Delete => {
                let table = translate_table(&delete.table, false, ctx);
                let params = if let SourceStrategy::MultiTable = strategy {
                    let joined = format!("{table} {}", translate_joins(&sources, ctx)?);
                    Params::new().with("target", table).with("table", joined)
                } else {
                    Params::new().with("table", table)
                };
                Some(
                    dialect
                        .registries()
                        .keywords
                        .get(Keyword::Delete, &params, ctx.throw_error())?,
                )
            }
            Clause::Using if matches!(strategy, SourceStrategy::Clause) => {
                translate_source_clause(Keyword::Using, &sources, ctx)?
            }
            Clause::Where if !predicates.is_empty() => Some(format!(
                "{} {}",
                keyword(Keyword::Where, ctx)?,
                translate_predicates(&predicates, ctx)?
            )),
            Clause::OrderBy => translate_order_by_clause(&delete.order_by, ctx)?,
            Clause::Paging => paging.tail.take(),
            Clause::Output | Clause::Returning => {
                translate_returning(*clause, returning, &delete.returning, &delete.table, ctx)?
            }
            _ => None,
        };
        parts.extend(part);
    }
    Ok(parts.join(" "))
}

/// How the additional sources of an UPDATE or DELETE are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceStrategy {
    None,
    /// UPDATE .. FROM or DELETE .. USING.
    Clause,
    /// Sources joined to the target, `UPDATE t JOIN s ..`.
    MultiTable,
    /// A correlated EXISTS sub-query in WHERE.
    Exists,
}

fn plan_sources(
    sources: &[Source],
    feature: Features,
    token: Clause,
    order: &[Clause],
    ctx: &Context,
) -> Result<SourceStrategy> {
    Ok(if sources.is_empty() {
        SourceStrategy::None
    } else if ctx.supports(feature) && order.contains(&token) {
        SourceStrategy::Clause
    } else if ctx.supports(Features::MULTI_TABLE_MUTATION) {
        SourceStrategy::MultiTable
    } else {
        SourceStrategy::Exists
    })
}

/// FROM / USING lists cannot start with a join, so a leading inner join
/// becomes a plain source and its condition a predicate.
fn detach_leading_join(
    sources: &[Source],
    strategy: SourceStrategy,
    ctx: &Context,
) -> Result<(Vec<Source>, Vec<Expr>)> {
    let mut sources = sources.to_vec();
    let mut predicates = Vec::new();
    if matches!(strategy, SourceStrategy::None | SourceStrategy::MultiTable) {
        return Ok((sources, predicates));
    }

    if let Some(Source::Join {
        kind,
        source,
        condition,
    }) = sources.first().cloned()
    {
        if !matches!(kind, JoinKind::Inner | JoinKind::Cross) {
            ctx.unsupported("outer join to the mutation target")?;
        }
        sources[0] = *source;
        predicates.extend(condition);
    }
    Ok((sources, predicates))
}

/// `EXISTS (SELECT 1 FROM sources WHERE predicates)`; references to the
/// mutation target inside stay qualified, which makes it correlated.
fn exists_rewrite(sources: Vec<Source>, predicates: Vec<Expr>) -> Expr {
    let query = SelectStmt {
        sources,
        predicates,
        projection: vec![Projection {
            alias: "_one".to_string(),
            expr: Expr::Raw("1".to_string()),
        }],
        ..Default::default()
    };
    Expr::Exists {
        query: Box::new(Statement::Select(query)),
        negated: false,
    }
}

fn translate_source_clause(key: Keyword, sources: &[Source], ctx: &mut Context) -> Result<Option<String>> {
    if sources.is_empty() {
        return Ok(None);
    }
    let (plain, joins) = split_sources(sources);
    let mut text = format!("{} {}", keyword(key, ctx)?, translate_sources(plain, ctx)?);
    if !joins.is_empty() {
        text += " ";
        text += &translate_joins(joins, ctx)?;
    }
    Ok(Some(text))
}

fn translate_assignments(
    assignments: &[Assignment],
    qualifier: Option<&str>,
    ctx: &mut Context,
) -> Result<String> {
    let mut items = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        let column = match qualifier {
            Some(qualifier) => format!("{qualifier}.{}", ctx.quote(&assignment.column)),
            None => ctx.quote(&assignment.column),
        };
        let value = translate_expr(&assignment.value, ctx)?.text;
        items.push(format!("{column} = {value}"));
    }
    Ok(items.join(", "))
}

fn plan_returning(
    returning: &[Projection],
    order: &[Clause],
    pseudo: Keyword,
    ctx: &mut Context,
) -> Result<Option<Returning>> {
    if returning.is_empty() {
        return Ok(None);
    }

    let placement = if !ctx.supports(Features::RETURNING) {
        None
    } else if order.contains(&Clause::Returning) {
        Some(Returning::Clause)
    } else if order.contains(&Clause::Output) {
        Some(Returning::Output(pseudo))
    } else {
        None
    };

    if placement.is_none() {
        ctx.unsupported("RETURNING")?;
        log::debug!("dropping RETURNING, the affected row count is decoded instead");
        ctx.dropped_returning = true;
    }
    Ok(placement)
}

fn translate_returning(
    clause: Clause,
    placement: Option<Returning>,
    returning: &[Projection],
    target: &Table,
    ctx: &mut Context,
) -> Result<Option<String>> {
    match (clause, placement) {
        (Clause::Returning, Some(Returning::Clause)) => Ok(Some(format!(
            "{} {}",
            keyword(Keyword::Returning, ctx)?,
            translate_projection(returning, ctx)?
        ))),
        (Clause::Output, Some(Returning::Output(pseudo))) => {
            let pseudo = keyword(pseudo, ctx)?;
            ctx.output_pseudo_table = Some((target.alias.clone(), pseudo));
            let projection = translate_projection(returning, ctx);
            ctx.output_pseudo_table = None;
            Ok(Some(format!("{} {}", keyword(Keyword::Output, ctx)?, projection?)))
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use rstest::rstest;

    use super::*;
    use crate::ast::DataType;
    use crate::{DialectKind, Options};

    fn users() -> Table {
        Table::new("users")
            .alias("u")
            .column("id", DataType::Integer)
            .column("email", DataType::Text)
            .column("visits", DataType::Integer)
    }

    fn compile(stmt: impl Into<Statement>, options: Options) -> String {
        crate::compile(&stmt.into(), &options).unwrap().sql
    }

    fn target(target: DialectKind) -> Options {
        Options::default().with_target(target).inline_constants()
    }

    #[rstest]
    #[case::postgres(DialectKind::Postgres, "INSERT INTO users (email) VALUES ('a@x') RETURNING id")]
    #[case::sqlite(DialectKind::SQLite, "INSERT INTO users (email) VALUES ('a@x') RETURNING id")]
    #[case::mssql(DialectKind::MsSql, "INSERT INTO users (email) OUTPUT inserted.id VALUES (N'a@x')")]
    fn test_insert_returning(#[case] dialect: DialectKind, #[case] expected: &str) {
        let stmt = InsertStmt::new(users())
            .columns(["email"])
            .values(vec!["a@x".into()])
            .returning_columns(&["id"]);
        assert_eq!(compile(stmt, target(dialect)), expected);
    }

    #[test]
    fn test_returning_dropped() {
        let stmt: Statement = InsertStmt::new(users())
            .columns(["email"])
            .values(vec!["a@x".into()])
            .returning_columns(&["id"])
            .into();

        let err = crate::compile(&stmt, &target(DialectKind::MySql)).unwrap_err();
        assert_snapshot!(err, @"[E0101] RETURNING is not supported by dialect mysql");

        let out = crate::compile(&stmt, &target(DialectKind::MySql).lenient()).unwrap();
        assert_snapshot!(out.sql, @"INSERT INTO users (email) VALUES ('a@x')");
        assert!(out.decoder.plan().affected_only);
    }

    #[test]
    fn test_upserts() {
        let stmt = InsertStmt::new(users())
            .columns(["email", "visits"])
            .values(vec!["a@x".into(), 1.into()])
            .on_conflict_do_update(
                &["email"],
                vec![("visits", users().col("visits").add(Expr::excluded("visits")))],
            );
        assert_snapshot!(
            compile(stmt.clone(), target(DialectKind::Postgres)),
            @"INSERT INTO users (email, visits) VALUES ('a@x', 1) ON CONFLICT (email) DO UPDATE SET visits = users.visits + EXCLUDED.visits"
        );
        assert_snapshot!(
            compile(stmt.clone(), target(DialectKind::SQLite)),
            @"INSERT INTO users (email, visits) VALUES ('a@x', 1) ON CONFLICT (email) DO UPDATE SET visits = users.visits + excluded.visits"
        );
        assert_snapshot!(
            compile(stmt.clone(), target(DialectKind::MySql)),
            @"INSERT INTO users (email, visits) VALUES ('a@x', 1) ON DUPLICATE KEY UPDATE visits = visits + VALUES(visits)"
        );

        let err = crate::compile(&stmt.into(), &target(DialectKind::MsSql)).unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_ignore_equivalents() {
        let ignore = InsertStmt::new(users())
            .columns(["email"])
            .values(vec!["a@x".into()])
            .ignore();
        assert_snapshot!(compile(ignore.clone(), target(DialectKind::MySql)), @"INSERT IGNORE INTO users (email) VALUES ('a@x')");
        assert_snapshot!(compile(ignore.clone(), target(DialectKind::SQLite)), @"INSERT OR IGNORE INTO users (email) VALUES ('a@x')");
        assert_snapshot!(compile(ignore, target(DialectKind::Postgres)), @"INSERT INTO users (email) VALUES ('a@x') ON CONFLICT DO NOTHING");

        let nothing = InsertStmt::new(users())
            .columns(["email"])
            .values(vec!["a@x".into()])
            .on_conflict_do_nothing(&["email"]);
        assert_snapshot!(compile(nothing, target(DialectKind::MySql)), @"INSERT IGNORE INTO users (email) VALUES ('a@x')");
    }

    #[test]
    fn test_insert_forms() {
        let defaults = InsertStmt::new(users()).default_values();
        assert_snapshot!(compile(defaults.clone(), target(DialectKind::Postgres)), @"INSERT INTO users DEFAULT VALUES");
        assert_snapshot!(compile(defaults, target(DialectKind::MySql)), @"INSERT INTO users VALUES ()");

        let staged = Table::new("staged").column("email", DataType::Text);
        let from_query = InsertStmt::new(users())
            .columns(["email"])
            .query(SelectStmt::new().from(&staged).columns([staged.col("email")]));
        assert_snapshot!(
            compile(from_query, target(DialectKind::Generic)),
            @"INSERT INTO users (email) SELECT email FROM staged"
        );

        let priority = InsertStmt::new(users())
            .columns(["email"])
            .values(vec!["a".into()])
            .values(vec![Expr::Default])
            .priority(InsertPriority::Low);
        assert_snapshot!(
            compile(priority.clone(), target(DialectKind::MySql)),
            @"INSERT LOW_PRIORITY INTO users (email) VALUES ('a'), (DEFAULT)"
        );
        assert_snapshot!(
            compile(priority, target(DialectKind::Postgres).lenient()),
            @"INSERT INTO users (email) VALUES ('a'), (DEFAULT)"
        );

        let options = target(DialectKind::Postgres);
        let err = crate::compile(&InsertStmt::new(users()).into(), &options).unwrap_err();
        assert_snapshot!(err.reason, @"insert into `users` has no rows");
    }

    #[test]
    fn test_update_with_sources() {
        let banned = Table::new("banned").column("email", DataType::Text);
        let stmt = UpdateStmt::new(users())
            .set("visits", 0)
            .from(&banned)
            .filter(users().col("email").eq(banned.col("email")));

        assert_snapshot!(
            compile(stmt.clone(), target(DialectKind::Postgres)),
            @"UPDATE users SET visits = 0 FROM banned WHERE users.email = banned.email"
        );
        assert_snapshot!(
            compile(stmt.clone(), target(DialectKind::MySql)),
            @"UPDATE users CROSS JOIN banned SET users.visits = 0 WHERE users.email = banned.email"
        );
        assert_snapshot!(
            compile(stmt.clone(), target(DialectKind::MsSql)),
            @"UPDATE users SET visits = 0 FROM banned WHERE users.email = banned.email"
        );

        let dialect = DialectKind::Postgres
            .builder()
            .remove_support(Features::UPDATE_FROM)
            .build();
        let err = crate::compile_with(&stmt.clone().into(), &dialect, &target(DialectKind::Postgres)).unwrap_err();
        assert!(err.is_unsupported());
        let out = crate::compile_with(&stmt.into(), &dialect, &target(DialectKind::Postgres).lenient()).unwrap();
        assert_snapshot!(
            out.sql,
            @"UPDATE users SET visits = 0 WHERE EXISTS (SELECT 1 AS _one FROM banned WHERE users.email = email)"
        );
    }

    #[test]
    fn test_update_paging() {
        let stmt = UpdateStmt::new(users())
            .set("visits", users().col("visits").add(1))
            .order_by(users().col("id"))
            .limit(10);
        assert_snapshot!(
            compile(stmt.clone(), target(DialectKind::MySql)),
            @"UPDATE users SET visits = visits + 1 ORDER BY id LIMIT 10"
        );
        let err = crate::compile(&stmt.into(), &target(DialectKind::Postgres)).unwrap_err();
        assert_snapshot!(err.reason, @"OrderBy clause is not supported by dialect postgres");
    }

    #[test]
    fn test_delete_with_sources() {
        let banned = Table::new("banned").column("email", DataType::Text);
        let stmt = DeleteStmt::new(users())
            .join(JoinKind::Inner, &banned, users().col("email").eq(banned.col("email")))
            .returning_columns(&["id"]);

        assert_snapshot!(
            compile(stmt.clone(), target(DialectKind::Postgres)),
            @"DELETE FROM users USING banned WHERE users.email = banned.email RETURNING id"
        );
        assert_snapshot!(
            compile(stmt.clone(), target(DialectKind::MsSql)),
            @"DELETE FROM users OUTPUT deleted.id FROM banned WHERE users.email = banned.email"
        );
        assert_snapshot!(
            compile(stmt.clone(), target(DialectKind::MySql).lenient()),
            @"DELETE users FROM users INNER JOIN banned ON users.email = banned.email"
        );
        assert_snapshot!(
            compile(stmt, target(DialectKind::SQLite)),
            @"DELETE FROM users WHERE EXISTS (SELECT 1 AS _one FROM banned WHERE users.email = email) RETURNING id"
        );
    }

    #[test]
    fn test_mutation_cte() {
        let archived = DeleteStmt::new(users())
            .filter(users().col("visits").eq(0))
            .returning_columns(&["id", "email"]);
        let a = Table::new("archived");
        let stmt = SelectStmt::new()
            .with("archived", archived)
            .from(&a)
            .columns([a.col("email")]);

        assert_snapshot!(
            compile(stmt.clone(), target(DialectKind::Postgres)),
            @"WITH archived AS (DELETE FROM users WHERE visits = 0 RETURNING id, email) SELECT email FROM archived"
        );
        let err = crate::compile(&stmt.into(), &target(DialectKind::SQLite)).unwrap_err();
        assert_snapshot!(err, @"[E0101] data-modifying statements in WITH is not supported by dialect sqlite");
    }
}
