//! Binder: resolves parsed statements against the catalog.
//!
//! Binding turns names into catalog handles, literals into typed values,
//! and picks the access path for SELECT: a point lookup through an index
//! when the predicate column has one, a sequential scan otherwise.

use crate::catalog::{Catalog, DataType, Schema, SharedIndex};
use crate::heap::TableHeap;
use crate::sql::parser::{ColumnDef, Literal, Statement};
use crate::sql::value::Value;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while resolving a statement
#[derive(Error, Debug)]
pub enum BindError {
    #[error("table '{0}' not found")]
    TableNotFound(String),

    #[error("column '{column}' not found in table '{table}'")]
    ColumnNotFound { table: String, column: String },

    #[error("table '{table}' has {expected} columns but {got} values were supplied")]
    ValueCountMismatch {
        table: String,
        expected: usize,
        got: usize,
    },

    #[error("value for column '{column}' should be {expected}")]
    TypeMismatch { column: String, expected: DataType },

    #[error("string of {len} bytes does not fit VARCHAR({max}) column '{column}'")]
    VarcharTooLong { column: String, max: u32, len: usize },
}

/// An equality predicate bound to a column index
#[derive(Debug, Clone)]
pub struct BoundPredicate {
    pub column: usize,
    pub value: Value,
}

/// A statement with every name resolved
pub enum BoundStatement {
    CreateTable {
        name: String,
        columns: Vec<ColumnDef>,
    },
    CreateIndex {
        name: String,
        table: String,
        column: String,
    },
    Insert {
        table_name: String,
        heap: Arc<TableHeap>,
        schema: Arc<Schema>,
        indexes: Vec<SharedIndex>,
        values: Vec<Value>,
    },
    Select {
        heap: Arc<TableHeap>,
        schema: Arc<Schema>,
        predicate: Option<BoundPredicate>,
        /// Set when the predicate column is covered by an index
        index: Option<SharedIndex>,
    },
}

/// Binds statements against one catalog snapshot.
pub struct Binder<'a> {
    catalog: &'a Catalog,
}

impl<'a> Binder<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    pub fn bind(&self, statement: Statement) -> Result<BoundStatement, BindError> {
        match statement {
            // DDL needs no resolution; the catalog validates on execution.
            Statement::CreateTable { name, columns } => {
                Ok(BoundStatement::CreateTable { name, columns })
            }
            Statement::CreateIndex {
                name,
                table,
                column,
            } => Ok(BoundStatement::CreateIndex {
                name,
                table,
                column,
            }),
            Statement::Insert { table, values } => self.bind_insert(table, values),
            Statement::Select { table, predicate } => self.bind_select(table, predicate),
        }
    }

    fn bind_insert(
        &self,
        table: String,
        literals: Vec<Literal>,
    ) -> Result<BoundStatement, BindError> {
        let info = self
            .catalog
            .table(&table)
            .map_err(|_| BindError::TableNotFound(table.clone()))?;

        if literals.len() != info.schema.column_count() {
            return Err(BindError::ValueCountMismatch {
                table,
                expected: info.schema.column_count(),
                got: literals.len(),
            });
        }

        let mut values = Vec::with_capacity(literals.len());
        for (column, literal) in info.schema.columns().iter().zip(literals) {
            values.push(coerce(column.name.as_str(), column.data_type, column.length, literal)?);
        }

        Ok(BoundStatement::Insert {
            indexes: self.catalog.table_indexes(&table).to_vec(),
            table_name: table,
            heap: Arc::clone(&info.heap),
            schema: Arc::clone(&info.schema),
            values,
        })
    }

    fn bind_select(
        &self,
        table: String,
        predicate: Option<(String, Literal)>,
    ) -> Result<BoundStatement, BindError> {
        let info = self
            .catalog
            .table(&table)
            .map_err(|_| BindError::TableNotFound(table.clone()))?;

        let mut bound_predicate = None;
        let mut chosen_index = None;

        if let Some((column_name, literal)) = predicate {
            let column_index = info.schema.column_index(&column_name).ok_or_else(|| {
                BindError::ColumnNotFound {
                    table: table.clone(),
                    column: column_name.clone(),
                }
            })?;
            let column = info.schema.column(column_index);
            let value = coerce(&column_name, column.data_type, column.length, literal)?;

            // A point lookup can go through an index keyed on this column.
            if value.data_type() == DataType::Integer {
                chosen_index = self
                    .catalog
                    .table_indexes(&table)
                    .iter()
                    .find(|idx| idx.read().key_col == column_index)
                    .cloned();
            }

            bound_predicate = Some(BoundPredicate {
                column: column_index,
                value,
            });
        }

        Ok(BoundStatement::Select {
            heap: Arc::clone(&info.heap),
            schema: Arc::clone(&info.schema),
            predicate: bound_predicate,
            index: chosen_index,
        })
    }
}

fn coerce(
    column: &str,
    expected: DataType,
    length: u32,
    literal: Literal,
) -> Result<Value, BindError> {
    match (expected, literal) {
        (DataType::Integer, Literal::Integer(v)) => Ok(Value::Integer(v)),
        (DataType::Varchar, Literal::String(s)) => {
            if s.len() > length as usize {
                return Err(BindError::VarcharTooLong {
                    column: column.to_string(),
                    max: length,
                    len: s.len(),
                });
            }
            Ok(Value::Varchar(s))
        }
        (expected, _) => Err(BindError::TypeMismatch {
            column: column.to_string(),
            expected,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferPool;
    use crate::sql::parser::parse;
    use crate::storage::FileDiskManager;
    use tempfile::{tempdir, TempDir};

    fn test_catalog() -> (Catalog, TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let dm = Arc::new(FileDiskManager::open(&path, false).unwrap());
        let pool = Arc::new(BufferPool::new(dm, 64));
        let mut catalog = Catalog::new(pool);

        let mut schema = Schema::new();
        schema.add_column("id", DataType::Integer, 0).unwrap();
        schema.add_column("name", DataType::Varchar, 8).unwrap();
        catalog.create_table("users", schema).unwrap();
        (catalog, dir)
    }

    fn bind(catalog: &Catalog, sql: &str) -> Result<BoundStatement, BindError> {
        Binder::new(catalog).bind(parse(sql).unwrap())
    }

    #[test]
    fn test_bind_insert_coerces_values() {
        let (catalog, _dir) = test_catalog();

        match bind(&catalog, "INSERT INTO users VALUES (1, 'ada')").unwrap() {
            BoundStatement::Insert { values, .. } => {
                assert_eq!(
                    values,
                    vec![Value::Integer(1), Value::Varchar("ada".into())]
                );
            }
            _ => panic!("expected a bound insert"),
        }
    }

    #[test]
    fn test_bind_insert_unknown_table() {
        let (catalog, _dir) = test_catalog();
        match bind(&catalog, "INSERT INTO ghosts VALUES (1)") {
            Err(BindError::TableNotFound(name)) => assert_eq!(name, "ghosts"),
            _ => panic!("expected TableNotFound"),
        }
    }

    #[test]
    fn test_bind_insert_arity_and_types() {
        let (catalog, _dir) = test_catalog();

        match bind(&catalog, "INSERT INTO users VALUES (1)") {
            Err(BindError::ValueCountMismatch { expected, got, .. }) => {
                assert_eq!((expected, got), (2, 1));
            }
            _ => panic!("expected ValueCountMismatch"),
        }
        match bind(&catalog, "INSERT INTO users VALUES ('x', 'y')") {
            Err(BindError::TypeMismatch { column, .. }) => assert_eq!(column, "id"),
            _ => panic!("expected TypeMismatch"),
        }
        match bind(&catalog, "INSERT INTO users VALUES (1, 'way too long')") {
            Err(BindError::VarcharTooLong { max, .. }) => assert_eq!(max, 8),
            _ => panic!("expected VarcharTooLong"),
        }
    }

    #[test]
    fn test_bind_select_plain() {
        let (catalog, _dir) = test_catalog();
        match bind(&catalog, "SELECT * FROM users").unwrap() {
            BoundStatement::Select {
                predicate, index, ..
            } => {
                assert!(predicate.is_none());
                assert!(index.is_none());
            }
            _ => panic!("expected a bound select"),
        }
    }

    #[test]
    fn test_bind_select_picks_an_index() {
        let (mut catalog, _dir) = test_catalog();
        catalog.create_index("users_by_id", "users", "id").unwrap();

        match bind(&catalog, "SELECT * FROM users WHERE id = 3").unwrap() {
            BoundStatement::Select {
                predicate, index, ..
            } => {
                let predicate = predicate.unwrap();
                assert_eq!(predicate.column, 0);
                assert_eq!(predicate.value, Value::Integer(3));
                assert!(index.is_some());
            }
            _ => panic!("expected a bound select"),
        }

        // A predicate on the unindexed column falls back to a scan.
        match bind(&catalog, "SELECT * FROM users WHERE name = 'a'").unwrap() {
            BoundStatement::Select { index, .. } => assert!(index.is_none()),
            _ => panic!("expected a bound select"),
        }
    }

    #[test]
    fn test_bind_select_unknown_column() {
        let (catalog, _dir) = test_catalog();
        match bind(&catalog, "SELECT * FROM users WHERE ghost = 1") {
            Err(BindError::ColumnNotFound { column, .. }) => assert_eq!(column, "ghost"),
            _ => panic!("expected ColumnNotFound"),
        }
    }
}
