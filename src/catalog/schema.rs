//! Table schemas: ordered, fixed-width columns.

use crate::catalog::CatalogError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column data types. INTEGER is always 4 bytes; VARCHAR occupies its
/// declared length, zero-padded on the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    Varchar,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer => write!(f, "INTEGER"),
            DataType::Varchar => write!(f, "VARCHAR"),
        }
    }
}

/// One column of a schema. The byte offset is assigned by the schema as
/// columns are added; tuples are fixed-width, so offsets never move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub offset: u32,
    pub length: u32,
}

/// An ordered list of columns describing one table's tuples.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<Column>,
    tuple_length: u32,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column. INTEGER columns ignore `length` (always 4 bytes);
    /// VARCHAR columns must declare a positive length.
    pub fn add_column(
        &mut self,
        name: &str,
        data_type: DataType,
        length: u32,
    ) -> Result<(), CatalogError> {
        let length = match data_type {
            DataType::Integer => 4,
            DataType::Varchar => {
                if length == 0 {
                    return Err(CatalogError::VarcharWithoutLength(name.to_string()));
                }
                length
            }
        };
        self.columns.push(Column {
            name: name.to_string(),
            data_type,
            offset: self.tuple_length,
            length,
        });
        self.tuple_length += length;
        Ok(())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> &Column {
        &self.columns[index]
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Total tuple width in bytes
    pub fn tuple_length(&self) -> u32 {
        self.tuple_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_accumulate() {
        let mut schema = Schema::new();
        schema.add_column("id", DataType::Integer, 0).unwrap();
        schema.add_column("name", DataType::Varchar, 16).unwrap();
        schema.add_column("age", DataType::Integer, 99).unwrap();

        assert_eq!(schema.column_count(), 3);
        assert_eq!(schema.column(0).offset, 0);
        assert_eq!(schema.column(0).length, 4);
        assert_eq!(schema.column(1).offset, 4);
        assert_eq!(schema.column(1).length, 16);
        // INTEGER ignores the declared length.
        assert_eq!(schema.column(2).offset, 20);
        assert_eq!(schema.column(2).length, 4);
        assert_eq!(schema.tuple_length(), 24);
    }

    #[test]
    fn test_varchar_needs_a_length() {
        let mut schema = Schema::new();
        match schema.add_column("s", DataType::Varchar, 0) {
            Err(CatalogError::VarcharWithoutLength(name)) => assert_eq!(name, "s"),
            other => panic!("expected VarcharWithoutLength, got {:?}", other),
        }
    }

    #[test]
    fn test_column_lookup_by_name() {
        let mut schema = Schema::new();
        schema.add_column("id", DataType::Integer, 0).unwrap();
        schema.add_column("name", DataType::Varchar, 8).unwrap();

        assert_eq!(schema.column_index("name"), Some(1));
        assert_eq!(schema.column_index("missing"), None);
    }
}
