//! # sqlplan
//!
//! Compiles composable query plans into parameterized SQL for a specific
//! dialect, and decodes the rows a driver returns back into the shape the plan
//! asked for.
//!
//! ```ascii
//!  Statement ──compile──► CompiledOutput { sql, params, decoder }
//!                                │
//!                        driver executes sql
//!                                │
//!                                ▼
//!                  RawResult ──decode──► Value
//! ```
//!
//! ## Common use-cases
//!
//! - Compile a select for Postgres:
//!
//!   ```
//!   use sqlplan::ast::*;
//!   # fn main() -> Result<(), sqlplan::Error> {
//!   let users = Table::new("users").column("id", DataType::Integer);
//!   let stmt = SelectStmt::new()
//!       .from(&users)
//!       .columns([users.col("id")])
//!       .filter(users.col("id").gt(Expr::param("min_id")))
//!       .limit(10);
//!
//!   let opts = sqlplan::Options::default().with_target(sqlplan::DialectKind::Postgres);
//!   let out = sqlplan::compile(&stmt.into(), &opts)?;
//!   assert_eq!(out.sql, "SELECT id FROM users WHERE id > $1 LIMIT 10");
//!   # Ok(())
//!   # }
//!   ```
//!
//! - Derive a dialect with a capability turned off:
//!
//!   ```
//!   use sqlplan::{DialectKind, Features};
//!   let dialect = DialectKind::Postgres
//!       .builder()
//!       .remove_support(Features::RETURNING)
//!       .build();
//!   assert!(!dialect.supports(Features::RETURNING));
//!   ```

#![forbid(unsafe_code)]
// Our error type is larger than clippy's default threshold. We're not that
// performance sensitive, so it's fine to ignore this.
#![allow(clippy::result_large_err)]

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use decode::{DecodePlan, DecodeRule, Decoder, RawResult, RawRow};
pub use dialect::{
    Clause, Dialect, DialectBuilder, DialectHandler, DialectKind, Features, PlaceholderStyle,
};
pub use error::{Error, MessageKind, Reason, Result, WithErrorInfo};
pub use sql::{CompiledOutput, Parameter};

pub mod ast;
pub mod decode;
pub mod dialect;
mod error;
pub mod format;
pub mod sql;
mod utils;

/// Compile a statement for the built-in dialect named by `options.target`.
pub fn compile(statement: &ast::Statement, options: &Options) -> Result<CompiledOutput> {
    sql::compile(statement, options.target.dialect(), options)
}

/// Compile a statement for a custom dialect. `options.target` is ignored.
pub fn compile_with(
    statement: &ast::Statement,
    dialect: &Dialect,
    options: &Options,
) -> Result<CompiledOutput> {
    sql::compile(statement, dialect, options)
}

/// Compilation and decoding options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Options {
    /// Built-in dialect to compile to.
    pub target: DialectKind,

    /// Pass generated SQL string trough a formatter that splits it
    /// into multiple lines and prettifies indentation and spacing.
    ///
    /// Defaults to false.
    pub format: bool,

    /// Raise an error when the dialect lacks a capability that has no
    /// equivalent rendering, instead of degrading.
    ///
    /// Defaults to true.
    pub throw_error: bool,

    /// Bind constants as parameters rather than inlining them.
    ///
    /// Defaults to true.
    pub constants_as_params: bool,

    /// Drop column qualifiers where the column is unambiguous.
    ///
    /// Defaults to true.
    pub simplify_references: bool,

    /// Return rows as they are, without shaping or wrapping mutation results.
    pub raw: bool,

    /// Decode rows as arrays rather than objects.
    pub array_mode: bool,

    /// Wrap decoded results as `{affected, result}`.
    pub affected_count: bool,

    /// Re-typing applied to columns without a declared type.
    pub detect: DetectOptions,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            target: DialectKind::Generic,
            format: false,
            throw_error: true,
            constants_as_params: true,
            simplify_references: true,
            raw: false,
            array_mode: false,
            affected_count: false,
            detect: DetectOptions::default(),
        }
    }
}

impl Options {
    pub fn with_target(mut self, target: DialectKind) -> Self {
        self.target = target;
        self
    }

    pub fn with_format(mut self, format: bool) -> Self {
        self.format = format;
        self
    }

    pub fn no_format(self) -> Self {
        self.with_format(false)
    }

    pub fn with_throw_error(mut self, throw_error: bool) -> Self {
        self.throw_error = throw_error;
        self
    }

    pub fn lenient(self) -> Self {
        self.with_throw_error(false)
    }

    pub fn with_constants_as_params(mut self, constants_as_params: bool) -> Self {
        self.constants_as_params = constants_as_params;
        self
    }

    pub fn inline_constants(self) -> Self {
        self.with_constants_as_params(false)
    }

    pub fn with_simplify_references(mut self, simplify_references: bool) -> Self {
        self.simplify_references = simplify_references;
        self
    }

    pub fn with_raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }

    pub fn with_array_mode(mut self, array_mode: bool) -> Self {
        self.array_mode = array_mode;
        self
    }

    pub fn with_affected_count(mut self, affected_count: bool) -> Self {
        self.affected_count = affected_count;
        self
    }

    pub fn with_detect(mut self, detect: DetectOptions) -> Self {
        self.detect = detect;
        self
    }
}

/// How the decoder re-types columns whose type is unknown.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectOptions {
    /// Parse text that looks like a JSON object or array.
    pub json: bool,

    /// Parse text that looks like an ISO-8601 date or timestamp.
    pub date: bool,

    /// Tried in order before the built-in detection.
    #[serde(skip)]
    pub custom: Vec<Detector>,
}

impl DetectOptions {
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn with_date(mut self, date: bool) -> Self {
        self.date = date;
        self
    }

    pub fn with_detector<F>(mut self, detector: F) -> Self
    where
        F: Fn(&str, &ast::Value) -> Option<ast::Value> + Send + Sync + 'static,
    {
        self.custom.push(Detector(Arc::new(detector)));
        self
    }
}

/// A custom decode rule: receives the column alias and the raw value, and
/// returns the replacement value when it recognizes it.
#[derive(Clone)]
pub struct Detector(pub Arc<dyn Fn(&str, &ast::Value) -> Option<ast::Value> + Send + Sync>);

impl Detector {
    pub fn detect(&self, column: &str, value: &ast::Value) -> Option<ast::Value> {
        (self.0)(column, value)
    }
}

impl fmt::Debug for Detector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Detector")
    }
}

pub mod json {
    use super::*;

    /// JSON serialization
    pub fn from_statement(statement: &ast::Statement) -> Result<String> {
        serde_json::to_string(statement).map_err(convert_json_err)
    }

    /// JSON deserialization
    pub fn to_statement(json: &str) -> Result<ast::Statement> {
        serde_json::from_str(json).map_err(convert_json_err)
    }

    fn convert_json_err(err: serde_json::Error) -> Error {
        Error::new_simple(err.to_string())
    }
}
