//! SQL front end: lexer, parser, binder, and executors.
//!
//! The pipeline is `parse` → `bind` → `execute`. Each stage has its own
//! error type; [`SqlError`] folds them into the single diagnostic the
//! caller renders.

pub mod binder;
pub mod executor;
pub mod lexer;
pub mod parser;
pub mod value;

pub use binder::{Binder, BindError, BoundStatement};
pub use executor::{Executor, IndexScanExecutor, InsertExecutor, SeqScanExecutor};
pub use parser::{parse, ParseError, Statement};
pub use value::Value;

use crate::catalog::{Catalog, CatalogError, Schema};
use crate::error::StorageError;
use crate::sql::binder::BoundPredicate;
use std::sync::Arc;
use thiserror::Error;

/// Any failure on the way from SQL text to rows
#[derive(Error, Debug)]
pub enum SqlError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("bind error: {0}")]
    Bind(#[from] BindError),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// What a statement produced.
#[derive(Debug)]
pub enum StatementResult {
    /// SELECT: the table's schema and the matching rows
    Rows {
        schema: Arc<Schema>,
        rows: Vec<crate::heap::Tuple>,
    },
    /// INSERT: number of rows written
    Inserted(usize),
    /// CREATE TABLE
    TableCreated(String),
    /// CREATE INDEX
    IndexCreated(String),
}

/// Run one SQL statement end to end against `catalog`.
pub fn run_statement(catalog: &mut Catalog, sql: &str) -> Result<StatementResult, SqlError> {
    let statement = parse(sql)?;
    let bound = Binder::new(catalog).bind(statement)?;

    match bound {
        BoundStatement::CreateTable { name, columns } => {
            let mut schema = Schema::new();
            for column in &columns {
                schema.add_column(&column.name, column.data_type, column.length)?;
            }
            catalog.create_table(&name, schema)?;
            Ok(StatementResult::TableCreated(name))
        }

        BoundStatement::CreateIndex {
            name,
            table,
            column,
        } => {
            catalog.create_index(&name, &table, &column)?;
            Ok(StatementResult::IndexCreated(name))
        }

        BoundStatement::Insert {
            heap,
            schema,
            indexes,
            values,
            ..
        } => {
            let mut executor = InsertExecutor::new(heap, schema, indexes, values);
            Ok(StatementResult::Inserted(drain(&mut executor)?.len()))
        }

        BoundStatement::Select {
            heap,
            schema,
            predicate,
            index,
        } => {
            let point_key = match &predicate {
                Some(BoundPredicate {
                    value: Value::Integer(key),
                    ..
                }) => Some(*key),
                _ => None,
            };
            let rows = match (index, point_key) {
                (Some(index), Some(key)) => {
                    drain(&mut IndexScanExecutor::new(heap, index, key))?
                }
                _ => drain(&mut SeqScanExecutor::new(
                    heap,
                    Arc::clone(&schema),
                    predicate,
                ))?,
            };
            Ok(StatementResult::Rows { schema, rows })
        }
    }
}

fn drain(executor: &mut dyn Executor) -> Result<Vec<crate::heap::Tuple>, SqlError> {
    executor.init()?;
    let mut rows = Vec::new();
    while let Some(tuple) = executor.next()? {
        rows.push(tuple);
    }
    Ok(rows)
}
