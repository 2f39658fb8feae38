//! Backend for translating statements into SQL text of a [Dialect].

mod context;
mod gen_expr;
mod gen_json;
mod gen_mutation;
mod gen_query;
mod gen_source;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlformat::{format, FormatOptions, QueryParams};

use crate::ast::{DataType, Statement, Value};
use crate::decode::{self, DecodePlan, Decoder};
use crate::dialect::Dialect;
use crate::{Error, Options, Reason, Result};

pub(crate) use context::Context;

/// A bound value of the compiled statement, in placeholder order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Set for parameters supplied at bind time, and for every parameter
    /// of dialects with named placeholders.
    pub name: Option<String>,
    /// Set for constants that were lifted out of the statement.
    pub value: Option<Value>,
    pub data_type: Option<DataType>,
}

#[derive(Debug, Clone)]
pub struct CompiledOutput {
    pub sql: String,
    pub params: Vec<Parameter>,
    /// Parameter name to its index in `params`, for dialects where a
    /// placeholder may be referenced more than once.
    pub names: HashMap<String, usize>,
    pub decoder: Decoder,
}

impl CompiledOutput {
    /// Values to pass to the driver, in placeholder order. Named parameters
    /// are looked up in `args` and coerced to their declared type.
    pub fn bind(&self, args: &HashMap<String, Value>) -> Result<Vec<Value>> {
        self.params
            .iter()
            .map(|param| {
                let value = match (&param.value, &param.name) {
                    (Some(value), _) => value.clone(),
                    (None, Some(name)) => args.get(name).cloned().ok_or_else(|| {
                        Error::new(Reason::NotFound {
                            name: name.clone(),
                            namespace: "parameter".to_string(),
                        })
                    })?,
                    (None, None) => return Err(Error::new_assert("parameter without a name")),
                };
                match &param.data_type {
                    Some(data_type) if !value.is_null() => decode::coerce(value, data_type),
                    _ => Ok(value),
                }
            })
            .collect()
    }
}

/// Translate a statement into SQL for `dialect`.
pub fn compile(statement: &Statement, dialect: &Dialect, options: &Options) -> Result<CompiledOutput> {
    log::debug!(
        "compiling {} statement for {}",
        statement.kind_name(),
        dialect.kind()
    );

    let mut ctx = Context::new(dialect, options);
    let sql = gen_query::translate_statement(statement, &mut ctx)
        .map_err(|e| e.in_dialect(&dialect.kind().to_string()))?;

    let sql = if options.format {
        format(&sql, &QueryParams::default(), FormatOptions::default())
    } else {
        sql
    };

    let mut plan = DecodePlan::from_statement(statement);
    plan.affected_only |= ctx.dropped_returning;
    let (params, names) = ctx.params.finish();

    log::debug!("compiled to {} bytes of SQL with {} parameters", sql.len(), params.len());
    Ok(CompiledOutput {
        sql,
        params,
        names,
        decoder: Decoder::new(plan, options.clone()),
    })
}
