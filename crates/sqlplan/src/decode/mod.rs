//! Turning the rows a driver returned back into the shape a statement asked
//! for.
//!
//! A [DecodePlan] is derived from the statement at compile time: one rule per
//! projected column, and a nested plan for every sub-query that was folded
//! into JSON. The [Decoder] applies it to a [RawResult].

mod leaf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ast::{Expr, Shape, Statement, Value};
use crate::{Error, Options, Reason, Result, WithErrorInfo};

pub(crate) use leaf::coerce;

/// How one column is turned into a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DecodeRule {
    /// Coerced toward the declared type.
    Typed(crate::ast::DataType),
    /// A sub-query the SQL folded into a single JSON value.
    Nested(Box<DecodePlan>),
    /// No declared type; re-typed by [crate::DetectOptions] only.
    Untyped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnPlan {
    pub alias: String,
    pub rule: DecodeRule,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodePlan {
    /// Statement kind, for error messages.
    pub statement: String,
    pub shape: Shape,
    pub columns: Vec<ColumnPlan>,
    /// The statement returns no rows the caller asked for, only a count of
    /// affected rows.
    pub affected_only: bool,
    pub is_mutation: bool,
}

impl DecodePlan {
    pub fn from_statement(statement: &Statement) -> Self {
        let columns: Vec<_> = statement
            .projection()
            .iter()
            .map(|p| ColumnPlan {
                alias: p.alias.clone(),
                rule: rule_of(&p.expr),
            })
            .collect();

        let is_mutation = statement.is_mutation();
        DecodePlan {
            statement: statement.kind_name().to_string(),
            shape: statement.shape(),
            affected_only: is_mutation && columns.is_empty(),
            columns,
            is_mutation,
        }
    }
}

fn rule_of(expr: &Expr) -> DecodeRule {
    match expr {
        // a scalar sub-query comes back as the value of its only column
        Expr::Query(statement) if statement.shape() == Shape::Value => statement
            .projection()
            .first()
            .map_or(DecodeRule::Untyped, |p| rule_of(&p.expr)),
        Expr::Query(statement) => DecodeRule::Nested(Box::new(DecodePlan::from_statement(statement))),
        expr => expr
            .data_type()
            .map_or(DecodeRule::Untyped, |t| DecodeRule::Typed(t.clone())),
    }
}

/// One row as handed over by a driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawRow {
    /// Values in projection order.
    Positional(Vec<Value>),
    /// Values keyed by column name.
    Named(IndexMap<String, Value>),
}

impl RawRow {
    pub fn len(&self) -> usize {
        match self {
            RawRow::Positional(values) => values.len(),
            RawRow::Named(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<Value>> for RawRow {
    fn from(values: Vec<Value>) -> Self {
        RawRow::Positional(values)
    }
}

impl From<IndexMap<String, Value>> for RawRow {
    fn from(values: IndexMap<String, Value>) -> Self {
        RawRow::Named(values)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawResult {
    pub rows: Vec<RawRow>,
    /// As reported by the driver. When missing, the number of rows is used.
    pub rows_affected: Option<u64>,
}

impl RawResult {
    pub fn new<R: Into<RawRow>>(rows: impl IntoIterator<Item = R>) -> Self {
        RawResult {
            rows: rows.into_iter().map(Into::into).collect(),
            rows_affected: None,
        }
    }

    pub fn affected(rows_affected: u64) -> Self {
        RawResult {
            rows: Vec::new(),
            rows_affected: Some(rows_affected),
        }
    }

    pub fn with_rows_affected(mut self, rows_affected: u64) -> Self {
        self.rows_affected = Some(rows_affected);
        self
    }

    fn affected_count(&self) -> u64 {
        self.rows_affected.unwrap_or(self.rows.len() as u64)
    }
}

/// Decodes results of one compiled statement.
#[derive(Debug, Clone)]
pub struct Decoder {
    plan: DecodePlan,
    options: Options,
}

impl Decoder {
    pub fn new(plan: DecodePlan, options: Options) -> Self {
        Decoder { plan, options }
    }

    pub fn plan(&self) -> &DecodePlan {
        &self.plan
    }

    pub fn decode(&self, raw: &RawResult) -> Result<Value> {
        log::trace!(
            "decoding {} rows of {} statement as {}",
            raw.rows.len(),
            self.plan.statement,
            self.plan.shape
        );

        let result = if self.plan.affected_only && !self.options.raw {
            Value::UInt(raw.affected_count())
        } else if self.options.raw {
            let rows = raw
                .rows
                .iter()
                .enumerate()
                .map(|(index, row)| self.decode_row(index, row))
                .collect::<Result<_>>()?;
            Value::Array(rows)
        } else {
            self.decode_shaped(raw)?
        };

        Ok(if self.options.affected_count {
            let mut wrapped = IndexMap::new();
            wrapped.insert("affected".to_string(), Value::UInt(raw.affected_count()));
            wrapped.insert("result".to_string(), result);
            Value::Object(wrapped)
        } else {
            result
        })
    }

    /// Decodes a single row into an object, or an array in array mode.
    pub fn decode_row(&self, index: usize, row: &RawRow) -> Result<Value> {
        let columns = self.decode_columns(index, row)?;
        Ok(if self.options.array_mode {
            Value::Array(columns.into_values().collect())
        } else {
            Value::Object(columns)
        })
    }

    fn decode_shaped(&self, raw: &RawResult) -> Result<Value> {
        let first_column = |index: usize, row: &RawRow| -> Result<Value> {
            let columns = self.decode_columns(index, row)?;
            Ok(columns.into_values().next().unwrap_or_default())
        };

        Ok(match self.plan.shape {
            Shape::Rows => Value::Array(
                raw.rows
                    .iter()
                    .enumerate()
                    .map(|(index, row)| self.decode_row(index, row))
                    .collect::<Result<_>>()?,
            ),
            Shape::First => match raw.rows.first() {
                Some(row) => self.decode_row(0, row)?,
                None => Value::Null,
            },
            Shape::Value => match raw.rows.first() {
                Some(row) => first_column(0, row)?,
                None => Value::Null,
            },
            Shape::List => Value::Array(
                raw.rows
                    .iter()
                    .enumerate()
                    .map(|(index, row)| first_column(index, row))
                    .collect::<Result<_>>()?,
            ),
        })
    }

    fn decode_columns(&self, index: usize, row: &RawRow) -> Result<IndexMap<String, Value>> {
        let columns = &self.plan.columns;

        // nothing is known about the projection, e.g. a mutation decoded raw
        if columns.is_empty() {
            return Ok(match row {
                RawRow::Positional(values) => values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| {
                        let name = i.to_string();
                        let v = leaf::detect(&name, v.clone(), &self.options.detect);
                        (name, v)
                    })
                    .collect(),
                RawRow::Named(values) => values
                    .iter()
                    .map(|(name, v)| {
                        (name.clone(), leaf::detect(name, v.clone(), &self.options.detect))
                    })
                    .collect(),
            });
        }

        if row.len() != columns.len() {
            return Err(Error::new(Reason::DecodeMismatch {
                statement: self.plan.statement.clone(),
                row: index,
                expected: columns.len(),
                found: row.len(),
            }));
        }

        let mut decoded = IndexMap::with_capacity(columns.len());
        for (position, column) in columns.iter().enumerate() {
            let value = match row {
                RawRow::Positional(values) => values[position].clone(),
                RawRow::Named(values) => values.get(&column.alias).cloned().ok_or_else(|| {
                    Error::new(Reason::NotFound {
                        name: column.alias.clone(),
                        namespace: "column".to_string(),
                    })
                    .push_hint(format!(
                        "row {index} of {} statement has columns {}",
                        self.plan.statement,
                        values.keys().map(|k| format!("`{k}`")).collect::<Vec<_>>().join(", ")
                    ))
                })?,
            };
            let value = self.decode_value(column, value)?;
            decoded.insert(column.alias.clone(), value);
        }
        Ok(decoded)
    }

    fn decode_value(&self, column: &ColumnPlan, value: Value) -> Result<Value> {
        match &column.rule {
            DecodeRule::Typed(data_type) => coerce(value, data_type).map_err(|mut e| {
                if let Reason::Expected { who, .. } = &mut e.reason {
                    who.get_or_insert_with(|| format!("column `{}`", column.alias));
                }
                e
            }),
            DecodeRule::Nested(plan) => self.decode_nested(plan, value, &column.alias),
            DecodeRule::Untyped => Ok(leaf::detect(&column.alias, value, &self.options.detect)),
        }
    }

    /// Expands the JSON a nested sub-query was folded into. Accepts both the
    /// JSON text and an already parsed value, so drivers that parse JSON
    /// columns themselves are covered.
    fn decode_nested(&self, plan: &DecodePlan, value: Value, alias: &str) -> Result<Value> {
        let value = match value {
            Value::Text(text) => Value::from_json(parse_json(&text, alias)?),
            Value::Bytes(bytes) => {
                let json = serde_json::from_slice(&bytes).map_err(|e| json_error(alias, e))?;
                Value::from_json(json)
            }
            Value::Json(json) => Value::from_json(json),
            value => value,
        };

        match (plan.shape, value) {
            (Shape::First | Shape::Value, Value::Null) => Ok(Value::Null),
            (_, Value::Null) => Ok(Value::Array(Vec::new())),

            (Shape::First | Shape::Value, Value::Object(object)) => self.decode_object(plan, object),
            // some drivers wrap a single object in an array
            (Shape::First | Shape::Value, Value::Array(items)) => match items.into_iter().next() {
                Some(item) => self.decode_nested(plan, item, alias),
                None => Ok(Value::Null),
            },

            (Shape::Rows, Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(object) => self.decode_object(plan, object),
                    other => Err(nested_error(alias, "an object", &other)),
                })
                .collect::<Result<_>>()
                .map(Value::Array),

            (Shape::List, Value::Array(items)) => {
                let element = plan.columns.first();
                items
                    .into_iter()
                    .map(|item| {
                        // FOR JSON renders every element as a single-key object
                        let item = match item {
                            Value::Object(object) if object.len() == 1 => {
                                object.into_values().next().unwrap_or_default()
                            }
                            item => item,
                        };
                        match element {
                            Some(column) => self.decode_value(column, item),
                            None => Ok(item),
                        }
                    })
                    .collect::<Result<_>>()
                    .map(Value::Array)
            }

            (_, other) => Err(nested_error(alias, "an array", &other)),
        }
    }

    fn decode_object(&self, plan: &DecodePlan, mut object: IndexMap<String, Value>) -> Result<Value> {
        if plan.columns.is_empty() {
            return Ok(Value::Object(object));
        }

        let mut decoded = IndexMap::with_capacity(plan.columns.len());
        for column in &plan.columns {
            let value = object.shift_remove(&column.alias).unwrap_or_default();
            decoded.insert(column.alias.clone(), self.decode_value(column, value)?);
        }
        Ok(Value::Object(decoded))
    }
}

/// Decodes `raw` as the result of the statement `plan` was derived from.
pub fn decode(plan: &DecodePlan, raw: &RawResult, options: &Options) -> Result<Value> {
    Decoder::new(plan.clone(), options.clone()).decode(raw)
}

fn parse_json(text: &str, alias: &str) -> Result<serde_json::Value> {
    serde_json::from_str(text).map_err(|e| json_error(alias, e))
}

fn json_error(alias: &str, err: serde_json::Error) -> Error {
    Error::new(Reason::Expected {
        who: Some(format!("column `{alias}`")),
        expected: "JSON".to_string(),
        found: err.to_string(),
    })
}

fn nested_error(alias: &str, expected: &str, found: &Value) -> Error {
    Error::new(Reason::Expected {
        who: Some(format!("column `{alias}`")),
        expected: expected.to_string(),
        found: found.to_json().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use insta::assert_snapshot;
    use rstest::rstest;

    use super::*;
    use crate::ast::*;
    use crate::DialectKind;

    fn authors() -> Table {
        Table::new("authors")
            .alias("a")
            .column("id", DataType::Integer)
            .column("name", DataType::Text)
            .untyped_column("meta")
    }

    fn books() -> Table {
        Table::new("books")
            .alias("b")
            .column("title", DataType::Text)
            .column("author_id", DataType::Integer)
            .column("published", DataType::Date)
    }

    fn authors_with_books(shape: Shape) -> Statement {
        let (a, b) = (authors(), books());
        let nested: Statement = SelectStmt::new()
            .from(&b)
            .columns([b.col("title"), b.col("published")])
            .filter(b.col("author_id").eq(a.col("id")))
            .into();
        SelectStmt::new()
            .from(&a)
            .columns([a.col("id"), a.col("name")])
            .select("books", Expr::subquery(nested.with_shape(shape)))
            .into()
    }

    fn date(y: i32, m: u32, d: u32) -> Value {
        Value::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn decoder(stmt: &Statement, options: Options) -> Decoder {
        Decoder::new(DecodePlan::from_statement(stmt), options)
    }

    #[test]
    fn test_plan() {
        let plan = DecodePlan::from_statement(&authors_with_books(Shape::Rows));
        assert_eq!(plan.columns[0].rule, DecodeRule::Typed(DataType::Integer));
        let DecodeRule::Nested(nested) = &plan.columns[2].rule else {
            panic!("expected a nested plan");
        };
        assert_eq!(nested.shape, Shape::Rows);
        assert_eq!(nested.columns[1].rule, DecodeRule::Typed(DataType::Date));
        assert!(!plan.affected_only);

        let users = Table::new("users").column("id", DataType::Integer);
        let delete: Statement = DeleteStmt::new(users.clone()).into();
        assert!(DecodePlan::from_statement(&delete).affected_only);
        let delete: Statement = DeleteStmt::new(users).returning_columns(&["id"]).into();
        assert!(!DecodePlan::from_statement(&delete).affected_only);
    }

    #[test]
    fn test_plan_yaml() {
        let plan = DecodePlan::from_statement(&authors_with_books(Shape::List));
        let yaml = serde_yaml::to_string(&plan).unwrap();
        assert!(yaml.contains("rule: !Nested"));

        let back: DecodePlan = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, plan);
    }

    #[test]
    fn test_nested_rows() {
        let stmt = authors_with_books(Shape::Rows);
        let raw = RawResult::new([
            vec![
                Value::Int(1),
                "Ann".into(),
                r#"[{"title": "Dune", "published": "1965-08-01"}]"#.into(),
            ],
            vec![Value::Text("2".into()), "Bo".into(), Value::Null],
        ]);

        let decoded = decoder(&stmt, Options::default()).decode(&raw).unwrap();
        let rows = decoded.as_array().unwrap();
        let first = rows[0].as_object().unwrap();
        assert_eq!(first["id"], Value::Int(1));
        let books = first["books"].as_array().unwrap();
        assert_eq!(books[0].as_object().unwrap()["published"], date(1965, 8, 1));

        let second = rows[1].as_object().unwrap();
        assert_eq!(second["id"], Value::Int(2));
        assert_eq!(second["books"], Value::Array(vec![]));
    }

    #[test]
    fn test_nested_idempotent() {
        let stmt = authors_with_books(Shape::First);
        let decoder = decoder(&stmt, Options::default().with_array_mode(true));
        let raw = RawResult::new([vec![
            Value::Int(1),
            "Ann".into(),
            Value::Json(serde_json::json!({"title": "Dune", "published": "1965-08-01"})),
        ]]);

        let once = decoder.decode(&raw).unwrap();
        let rows = once.as_array().unwrap();
        let row = rows[0].as_array().unwrap().clone();
        // nested values stay objects in array mode
        assert!(row[2].is_object());

        let twice = decoder.decode(&RawResult::new([row])).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_nested_list_flattens_objects() {
        let (a, b) = (authors(), books());
        let titles = SelectStmt::new()
            .from(&b)
            .columns([b.col("published")])
            .filter(b.col("author_id").eq(a.col("id")))
            .list();
        let stmt: Statement = SelectStmt::new()
            .from(&a)
            .select("dates", Expr::subquery(titles))
            .into();

        let raw = RawResult::new([vec![Value::from(
            r#"[{"published": "2001-01-01"}, {"published": "2002-02-02"}]"#,
        )]]);
        let decoded = decoder(&stmt, Options::default()).decode(&raw).unwrap();
        assert_eq!(
            decoded,
            Value::Array(vec![Value::Object(IndexMap::from([(
                "dates".to_string(),
                Value::Array(vec![date(2001, 1, 1), date(2002, 2, 2)]),
            )]))])
        );
    }

    #[rstest]
    #[case::rows(Shape::Rows)]
    #[case::first(Shape::First)]
    #[case::value(Shape::Value)]
    #[case::list(Shape::List)]
    fn test_shapes(#[case] shape: Shape) {
        let users = Table::new("users")
            .column("id", DataType::Integer)
            .column("name", DataType::Text);
        let stmt: Statement = SelectStmt::new()
            .from(&users)
            .columns([users.col("id"), users.col("name")])
            .into();
        let stmt = stmt.with_shape(shape);

        let raw = RawResult::new([
            vec![Value::Int(1), "a".into()],
            vec![Value::Int(2), "b".into()],
        ]);
        let decoded = decoder(&stmt, Options::default()).decode(&raw).unwrap();
        let json = serde_json::to_string(&decoded.to_json()).unwrap();
        match shape {
            Shape::Rows => assert_snapshot!(json, @r#"[{"id":1,"name":"a"},{"id":2,"name":"b"}]"#),
            Shape::First => assert_snapshot!(json, @r#"{"id":1,"name":"a"}"#),
            Shape::Value => assert_snapshot!(json, @"1"),
            Shape::List => assert_snapshot!(json, @"[1,2]"),
        }

        let empty = decoder(&stmt, Options::default())
            .decode(&RawResult::default())
            .unwrap();
        match shape {
            Shape::Rows | Shape::List => assert_eq!(empty, Value::Array(vec![])),
            Shape::First | Shape::Value => assert_eq!(empty, Value::Null),
        }
    }

    #[test]
    fn test_mutations() {
        let users = Table::new("users").column("id", DataType::Integer);
        let delete: Statement = DeleteStmt::new(users.clone()).into();

        let decoded = decoder(&delete, Options::default())
            .decode(&RawResult::affected(3))
            .unwrap();
        assert_eq!(decoded, Value::UInt(3));

        let counted = decoder(&delete, Options::default().with_affected_count(true))
            .decode(&RawResult::affected(3))
            .unwrap();
        assert_snapshot!(counted.to_json(), @r#"{"affected":3,"result":3}"#);

        let insert: Statement = InsertStmt::new(users)
            .columns(["id"])
            .values(vec![Expr::constant(1)])
            .returning_columns(&["id"])
            .into();
        let raw = RawResult::new([vec![Value::from("7")]]);
        let decoded = decoder(&insert, Options::default()).decode(&raw).unwrap();
        assert_snapshot!(decoded.to_json(), @r#"[{"id":7}]"#);

        let counted = decoder(&insert, Options::default().with_affected_count(true))
            .decode(&raw)
            .unwrap();
        assert_snapshot!(counted.to_json(), @r#"{"affected":1,"result":[{"id":7}]}"#);
    }

    #[test]
    fn test_raw() {
        let users = Table::new("users").column("id", DataType::Integer);
        let stmt: Statement = SelectStmt::new()
            .from(&users)
            .columns([users.col("id")])
            .first()
            .into();
        let raw = RawResult::new([vec![Value::from("1")], vec![Value::from("2")]]);

        let decoded = decoder(&stmt, Options::default().with_raw(true).with_array_mode(true))
            .decode(&raw)
            .unwrap();
        assert_snapshot!(decoded.to_json(), @"[[1],[2]]");

        let delete: Statement = DeleteStmt::new(users).into();
        let raw = RawResult::new([IndexMap::from([("n".to_string(), Value::Int(1))])]);
        let decoded = decoder(&delete, Options::default().with_raw(true))
            .decode(&raw)
            .unwrap();
        assert_snapshot!(decoded.to_json(), @r#"[{"n":1}]"#);
    }

    #[test]
    fn test_mismatch() {
        let stmt = authors_with_books(Shape::Rows);
        let decoder = decoder(&stmt, Options::default());

        let err = decoder
            .decode(&RawResult::new([vec![Value::Int(1)]]))
            .unwrap_err();
        assert_snapshot!(err, @"cannot decode row 0 of select statement: expected 3 columns, but found 1");

        let row = IndexMap::from([
            ("id".to_string(), Value::Int(1)),
            ("name".to_string(), Value::from("Ann")),
            ("book".to_string(), Value::Null),
        ]);
        let err = decoder.decode(&RawResult::new([row])).unwrap_err();
        assert_snapshot!(err.reason, @"column `books` not found");
        assert_snapshot!(err.hints[0], @"row 0 of select statement has columns `id`, `name`, `book`");

        let err = decoder
            .decode(&RawResult::new([vec![Value::from("one"), Value::Null, Value::Null]]))
            .unwrap_err();
        assert_snapshot!(err, @"column `id` expected a value of type integer, but found text `one`");

        let err = decoder
            .decode(&RawResult::new([vec![Value::Int(1), Value::Null, Value::from("{")]]))
            .unwrap_err();
        assert!(err.reason.to_string().starts_with("column `books` expected JSON"));
    }

    #[test]
    fn test_untyped_detection() {
        let a = authors();
        let stmt: Statement = SelectStmt::new().from(&a).columns([a.col("meta")]).into();
        let raw = RawResult::new([vec![Value::from(r#"{"k": 1}"#)]]);

        let plain = decoder(&stmt, Options::default()).decode(&raw).unwrap();
        assert_snapshot!(plain.to_json(), @r#"[{"meta":"{\"k\": 1}"}]"#);

        let options = Options::default().with_detect(crate::DetectOptions::default().with_json(true));
        let detected = decoder(&stmt, options).decode(&raw).unwrap();
        assert_snapshot!(detected.to_json(), @r#"[{"meta":{"k":1}}]"#);
    }

    #[test]
    fn test_compiled_decoder() {
        let stmt = authors_with_books(Shape::First);
        let options = Options::default().with_target(DialectKind::MsSql);
        let out = crate::compile(&stmt, &options).unwrap();

        let raw = RawResult::new([vec![
            Value::Int(1),
            "Ann".into(),
            r#"{"title": "Dune", "published": "1965-08-01"}"#.into(),
        ]]);
        let decoded = out.decoder.decode(&raw).unwrap();
        assert_snapshot!(
            decoded.to_json(),
            @r#"[{"id":1,"name":"Ann","books":{"title":"Dune","published":"1965-08-01"}}]"#
        );

        let plan = serde_json::to_string(out.decoder.plan()).unwrap();
        let back: DecodePlan = serde_json::from_str(&plan).unwrap();
        assert_eq!(&back, out.decoder.plan());
        assert_eq!(decode(&back, &raw, &options).unwrap(), decoded);
    }
}
