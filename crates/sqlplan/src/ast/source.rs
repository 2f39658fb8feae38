use enum_as_inner::EnumAsInner;
use serde::{Deserialize, Serialize};

use crate::ast::{DataType, Expr, Statement};
use crate::format::FormatKey;

/// A contributor to a statement's FROM clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, EnumAsInner)]
pub enum Source {
    Table(Table),
    Derived {
        alias: String,
        statement: Box<Statement>,
    },
    /// Inline constant rows.
    Values {
        alias: String,
        columns: Vec<String>,
        rows: Vec<Vec<Expr>>,
    },
    Join {
        kind: JoinKind,
        source: Box<Source>,
        /// Absent for cross joins.
        condition: Option<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub schema: Option<String>,
    pub name: String,
    pub alias: String,
    /// Known columns. Empty means unknown, which makes reference
    /// simplification conservative for statements that also read other
    /// sources.
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: Option<DataType>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::IntoStaticStr, strum::EnumIter,
)]
pub enum JoinKind {
    #[strum(serialize = "INNER JOIN")]
    Inner,
    #[strum(serialize = "LEFT JOIN")]
    Left,
    #[strum(serialize = "RIGHT JOIN")]
    Right,
    #[strum(serialize = "FULL OUTER JOIN")]
    Full,
    #[strum(serialize = "CROSS JOIN")]
    Cross,
}

impl FormatKey for JoinKind {}

impl Table {
    pub fn new(name: &str) -> Self {
        Table {
            schema: None,
            name: name.to_string(),
            alias: name.to_string(),
            columns: Vec::new(),
        }
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = alias.to_string();
        self
    }

    pub fn schema(mut self, schema: &str) -> Self {
        self.schema = Some(schema.to_string());
        self
    }

    pub fn column(mut self, name: &str, data_type: DataType) -> Self {
        self.columns.push(Column {
            name: name.to_string(),
            data_type: Some(data_type),
        });
        self
    }

    pub fn untyped_column(mut self, name: &str) -> Self {
        self.columns.push(Column {
            name: name.to_string(),
            data_type: None,
        });
        self
    }

    /// Reference to one of this table's columns, typed when the column is known.
    pub fn col(&self, name: &str) -> Expr {
        let data_type = self
            .columns
            .iter()
            .find(|c| c.name == name)
            .and_then(|c| c.data_type.clone());
        Expr::Field {
            source: self.alias.clone(),
            name: name.to_string(),
            data_type,
        }
    }

    /// Every known column, in declaration order.
    pub fn all_columns(&self) -> Vec<Expr> {
        self.columns.iter().map(|c| self.col(&c.name)).collect()
    }
}

impl Source {
    pub fn derived<S: Into<Statement>>(alias: &str, statement: S) -> Source {
        Source::Derived {
            alias: alias.to_string(),
            statement: Box::new(statement.into()),
        }
    }

    pub fn values(alias: &str, columns: &[&str], rows: Vec<Vec<Expr>>) -> Source {
        Source::Values {
            alias: alias.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    pub fn join<S: Into<Source>>(kind: JoinKind, source: S, condition: Option<Expr>) -> Source {
        Source::Join {
            kind,
            source: Box::new(source.into()),
            condition,
        }
    }

    pub fn alias(&self) -> &str {
        match self {
            Source::Table(table) => &table.alias,
            Source::Derived { alias, .. } | Source::Values { alias, .. } => alias,
            Source::Join { source, .. } => source.alias(),
        }
    }

    /// Column names this source exposes, when they are known.
    pub fn exposed_columns(&self) -> Option<Vec<String>> {
        match self {
            Source::Table(table) if table.columns.is_empty() => None,
            Source::Table(table) => Some(table.columns.iter().map(|c| c.name.clone()).collect()),
            Source::Derived { statement, .. } => {
                let projection = statement.projection();
                (!projection.is_empty()).then(|| projection.iter().map(|p| p.alias.clone()).collect())
            }
            Source::Values { columns, .. } => Some(columns.clone()),
            Source::Join { source, .. } => source.exposed_columns(),
        }
    }

    /// Reference to a column of this source.
    pub fn col(&self, name: &str) -> Expr {
        match self {
            Source::Table(table) => table.col(name),
            Source::Join { source, .. } => source.col(name),
            _ => Expr::field(self.alias(), name),
        }
    }
}

impl From<Table> for Source {
    fn from(table: Table) -> Self {
        Source::Table(table)
    }
}

impl From<&Table> for Source {
    fn from(table: &Table) -> Self {
        Source::Table(table.clone())
    }
}
