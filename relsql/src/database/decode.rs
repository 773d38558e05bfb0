use sqlx::any::AnyRow;
use sqlx::Row;

use crate::heading::Heading;
use crate::tuple::Tuple;
use crate::value::{Value, ValueType};
use crate::RelResult;

/// Decode a row positionally into a tuple of `heading`.
pub fn decode_row(row: &AnyRow, heading: &Heading) -> RelResult<Tuple> {
    let values = heading
        .attributes()
        .iter()
        .enumerate()
        .map(|(index, attribute)| decode_value(row, index, attribute.ty()))
        .collect::<Result<Vec<_>, sqlx::Error>>()?;

    Ok(Tuple::new(values))
}

fn decode_value(row: &AnyRow, index: usize, ty: ValueType) -> Result<Value, sqlx::Error> {
    // Drivers report narrower types for some columns (e.g. INT4), so each
    // domain falls back to its narrower Rust type.
    let value = match ty {
        ValueType::Integer => row
            .try_get::<Option<i64>, _>(index)
            .or_else(|_| row.try_get::<Option<i32>, _>(index).map(|i| i.map(i64::from)))
            .or_else(|_| row.try_get::<Option<i16>, _>(index).map(|i| i.map(i64::from)))?
            .map(Value::Integer),
        ValueType::Real => row
            .try_get::<Option<f64>, _>(index)
            .or_else(|_| row.try_get::<Option<f32>, _>(index).map(|r| r.map(f64::from)))?
            .map(Value::Real),
        ValueType::Bool => row
            .try_get::<Option<bool>, _>(index)
            .or_else(|_| row.try_get::<Option<i64>, _>(index).map(|i| i.map(|i| i != 0)))?
            .map(Value::Bool),
        ValueType::Text => row.try_get::<Option<String>, _>(index)?.map(Value::Text),
        ValueType::Blob => row.try_get::<Option<Vec<u8>>, _>(index)?.map(Value::Blob),
    };

    Ok(value.unwrap_or(Value::Null))
}
