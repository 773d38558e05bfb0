//! Typed records and the tables they are stored in.
//!
//! Both traits are normally derived:
//!
//! ```ignore
//! #[derive(Record, Table)]
//! #[table_name = "suppliers"]
//! #[key(SNO)]
//! struct Supplier {
//!     #[attribute = "SNO"]
//!     sno: i64,
//!     #[attribute = "SName"]
//!     sname: String,
//!     #[attribute = "Status"]
//!     status: i64,
//!     #[attribute = "City"]
//!     city: Option<String>,
//! }
//! ```

use std::convert::TryFrom;

use crate::heading::Heading;
use crate::tuple::Tuple;
use crate::value::{Value, ValueType};
use crate::{RelError, RelResult};

/// A Rust type whose values are the tuples of some heading.
///
/// Field order is heading order; decoding binds fields positionally.
pub trait Record: Sized + Send + 'static {
    fn heading() -> Heading;

    fn from_tuple(tuple: Tuple) -> RelResult<Self>;

    fn into_tuple(self) -> Tuple;
}

/// A physical table a record type is stored in.
pub trait Table {
    fn name() -> &'static str;

    /// Declared candidate keys. Empty means the whole heading is the key.
    fn keys() -> &'static [&'static [&'static str]];
}

/// A Rust type usable as a record field.
pub trait Domain: Sized + Send + 'static {
    const TYPE: ValueType;

    const NULLABLE: bool = false;

    /// `None` if the value does not belong to the domain.
    fn from_value(value: Value) -> Option<Self>;

    fn into_value(self) -> Value;

    /// Decode the value of `attribute`, used by `#[derive(Record)]`.
    fn decode(attribute: &str, value: Option<Value>) -> RelResult<Self> {
        let value = value.unwrap_or(Value::Null);
        let found = value.describe();
        Self::from_value(value).ok_or_else(|| RelError::Decode {
            attribute: attribute.to_owned(),
            expected: Self::TYPE,
            found,
        })
    }
}

impl Domain for i64 {
    const TYPE: ValueType = ValueType::Integer;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Integer(i) => Some(i),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Integer(self)
    }
}

impl Domain for i32 {
    const TYPE: ValueType = ValueType::Integer;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Integer(i) => i32::try_from(i).ok(),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Integer(self.into())
    }
}

impl Domain for f64 {
    const TYPE: ValueType = ValueType::Real;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Real(r) => Some(r),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Real(self)
    }
}

impl Domain for bool {
    const TYPE: ValueType = ValueType::Bool;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl Domain for String {
    const TYPE: ValueType = ValueType::Text;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Text(self)
    }
}

impl Domain for Vec<u8> {
    const TYPE: ValueType = ValueType::Blob;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Blob(b) => Some(b),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Blob(self)
    }
}

/// Nullable attribute
impl<D: Domain> Domain for Option<D> {
    const TYPE: ValueType = D::TYPE;

    const NULLABLE: bool = true;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            value => D::from_value(value).map(Some),
        }
    }

    fn into_value(self) -> Value {
        match self {
            Some(d) => d.into_value(),
            None => Value::Null,
        }
    }
}
