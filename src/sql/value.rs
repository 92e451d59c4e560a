//! Runtime values and their tuple encoding.

use crate::catalog::{DataType, Schema};
use crate::heap::Tuple;
use std::fmt;

/// A typed value, either bound from a literal or decoded from a tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Integer(i32),
    Varchar(String),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Integer(_) => DataType::Integer,
            Value::Varchar(_) => DataType::Varchar,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Varchar(v) => write!(f, "{}", v),
        }
    }
}

/// Encode one row of values into tuple bytes laid out per `schema`.
///
/// The binder has already checked arity, types, and VARCHAR lengths, so
/// the values are written verbatim: integers little-endian, strings
/// zero-padded to the column width.
pub fn encode_tuple(schema: &Schema, values: &[Value]) -> Tuple {
    let mut data = vec![0u8; schema.tuple_length() as usize];
    for (column, value) in schema.columns().iter().zip(values) {
        let offset = column.offset as usize;
        match value {
            Value::Integer(v) => {
                data[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
            }
            Value::Varchar(s) => {
                let bytes = s.as_bytes();
                let len = bytes.len().min(column.length as usize);
                data[offset..offset + len].copy_from_slice(&bytes[..len]);
            }
        }
    }
    Tuple::new(data)
}

/// Decode the value of one column out of a tuple.
pub fn decode_column(schema: &Schema, tuple: &Tuple, column_index: usize) -> Value {
    let column = schema.column(column_index);
    match column.data_type {
        DataType::Integer => Value::Integer(tuple.i32_at(column.offset as usize)),
        DataType::Varchar => Value::Varchar(
            tuple.str_at(column.offset as usize, column.length as usize),
        ),
    }
}

/// Decode a whole row in schema order.
pub fn decode_row(schema: &Schema, tuple: &Tuple) -> Vec<Value> {
    (0..schema.column_count())
        .map(|i| decode_column(schema, tuple, i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        let mut schema = Schema::new();
        schema.add_column("id", DataType::Integer, 0).unwrap();
        schema.add_column("name", DataType::Varchar, 6).unwrap();
        schema
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let schema = schema();
        let values = vec![Value::Integer(-3), Value::Varchar("ada".into())];
        let tuple = encode_tuple(&schema, &values);

        assert_eq!(tuple.len(), 10);
        assert_eq!(decode_row(&schema, &tuple), values);
    }

    #[test]
    fn test_varchar_is_zero_padded() {
        let schema = schema();
        let tuple = encode_tuple(
            &schema,
            &[Value::Integer(1), Value::Varchar("ab".into())],
        );
        assert_eq!(&tuple.data()[4..10], b"ab\0\0\0\0");
    }

    #[test]
    fn test_full_width_varchar() {
        let schema = schema();
        let tuple = encode_tuple(
            &schema,
            &[Value::Integer(1), Value::Varchar("sixsix".into())],
        );
        assert_eq!(
            decode_column(&schema, &tuple, 1),
            Value::Varchar("sixsix".into())
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Integer(42).to_string(), "42");
        assert_eq!(Value::Varchar("x".into()).to_string(), "x");
    }
}
