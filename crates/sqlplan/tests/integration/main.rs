mod compile;
mod decode;
mod validate;

use sqlplan::ast::{DataType, Table};
use sqlplan::{DialectKind, Options};

pub(crate) fn employees() -> Table {
    Table::new("employees")
        .alias("e")
        .column("id", DataType::Integer)
        .column("name", DataType::Text)
        .column("dept_id", DataType::Integer)
        .column("hired", DataType::Date)
}

pub(crate) fn departments() -> Table {
    Table::new("departments")
        .alias("d")
        .column("id", DataType::Integer)
        .column("title", DataType::Text)
}

pub(crate) fn options(target: DialectKind) -> Options {
    Options::default().with_target(target)
}

pub(crate) const ALL_DIALECTS: [DialectKind; 5] = [
    DialectKind::Generic,
    DialectKind::Postgres,
    DialectKind::MySql,
    DialectKind::MsSql,
    DialectKind::SQLite,
];
