use serde::{Deserialize, Serialize};

use crate::format::FormatKey;

/// Database type tag attached to constants, fields, parameters and casts.
///
/// The compiler treats it as opaque, except when rendering `CAST` targets and
/// typed literals. The decoder uses it to pick a leaf decode rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    SmallInt,
    Integer,
    BigInt,
    UnsignedInteger,
    UnsignedBigInt,
    Real,
    Double,
    Decimal {
        precision: Option<u8>,
        scale: Option<u8>,
    },
    Text,
    Varchar(Option<u32>),
    Bytes,
    Uuid,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Interval,
    Json,
    Point,
    Array(Box<DataType>),
    Custom(String),
}

/// Registry key for rendering a [DataType] as a `CAST` target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::IntoStaticStr, strum::EnumIter)]
pub enum TypeKind {
    #[strum(serialize = "BOOLEAN")]
    Boolean,
    #[strum(serialize = "SMALLINT")]
    SmallInt,
    #[strum(serialize = "INTEGER")]
    Integer,
    #[strum(serialize = "BIGINT")]
    BigInt,
    #[strum(serialize = "INTEGER UNSIGNED")]
    UnsignedInteger,
    #[strum(serialize = "BIGINT UNSIGNED")]
    UnsignedBigInt,
    #[strum(serialize = "REAL")]
    Real,
    #[strum(serialize = "DOUBLE PRECISION")]
    Double,
    #[strum(serialize = "DECIMAL")]
    Decimal,
    #[strum(serialize = "TEXT")]
    Text,
    #[strum(serialize = "VARCHAR")]
    Varchar,
    #[strum(serialize = "BYTEA")]
    Bytes,
    #[strum(serialize = "UUID")]
    Uuid,
    #[strum(serialize = "DATE")]
    Date,
    #[strum(serialize = "TIME")]
    Time,
    #[strum(serialize = "TIMESTAMP")]
    Timestamp,
    #[strum(serialize = "TIMESTAMP WITH TIME ZONE")]
    TimestampTz,
    #[strum(serialize = "INTERVAL")]
    Interval,
    #[strum(serialize = "JSON")]
    Json,
    #[strum(serialize = "POINT")]
    Point,
    #[strum(serialize = "ARRAY")]
    Array,
    #[strum(serialize = "")]
    Custom,
}

impl FormatKey for TypeKind {}

impl DataType {
    pub fn kind(&self) -> TypeKind {
        match self {
            DataType::Boolean => TypeKind::Boolean,
            DataType::SmallInt => TypeKind::SmallInt,
            DataType::Integer => TypeKind::Integer,
            DataType::BigInt => TypeKind::BigInt,
            DataType::UnsignedInteger => TypeKind::UnsignedInteger,
            DataType::UnsignedBigInt => TypeKind::UnsignedBigInt,
            DataType::Real => TypeKind::Real,
            DataType::Double => TypeKind::Double,
            DataType::Decimal { .. } => TypeKind::Decimal,
            DataType::Text => TypeKind::Text,
            DataType::Varchar(_) => TypeKind::Varchar,
            DataType::Bytes => TypeKind::Bytes,
            DataType::Uuid => TypeKind::Uuid,
            DataType::Date => TypeKind::Date,
            DataType::Time => TypeKind::Time,
            DataType::Timestamp => TypeKind::Timestamp,
            DataType::TimestampTz => TypeKind::TimestampTz,
            DataType::Interval => TypeKind::Interval,
            DataType::Json => TypeKind::Json,
            DataType::Point => TypeKind::Point,
            DataType::Array(_) => TypeKind::Array,
            DataType::Custom(_) => TypeKind::Custom,
        }
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(self, DataType::UnsignedInteger | DataType::UnsignedBigInt)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::SmallInt
                | DataType::Integer
                | DataType::BigInt
                | DataType::UnsignedInteger
                | DataType::UnsignedBigInt
                | DataType::Real
                | DataType::Double
                | DataType::Decimal { .. }
        )
    }

    /// Signed type wide enough to hold every value of an unsigned one.
    pub(crate) fn signed_fallback(&self) -> Option<DataType> {
        match self {
            DataType::UnsignedInteger => Some(DataType::BigInt),
            DataType::UnsignedBigInt => Some(DataType::Decimal {
                precision: Some(20),
                scale: Some(0),
            }),
            _ => None,
        }
    }
}
