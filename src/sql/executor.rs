//! Volcano-style executors.
//!
//! Every executor exposes `init` and `next`; `next` produces tuples one
//! at a time until it returns `None`. DML statements map onto three
//! executors (insert, sequential scan, and index point lookup) while
//! DDL is applied directly to the catalog by the dispatcher.

use crate::catalog::{Schema, SharedIndex};
use crate::heap::{TableHeap, TableIterator, Tuple};
use crate::sql::binder::BoundPredicate;
use crate::sql::value::{self, Value};
use crate::sql::SqlError;
use crate::types::Rid;
use std::sync::Arc;

/// The executor interface: `init` once, then `next` until `None`.
pub trait Executor {
    fn init(&mut self) -> Result<(), SqlError>;
    fn next(&mut self) -> Result<Option<Tuple>, SqlError>;
}

/// Inserts one row into the heap and every index on the table, then
/// yields the inserted tuple (with its RID) exactly once.
pub struct InsertExecutor {
    heap: Arc<TableHeap>,
    schema: Arc<Schema>,
    indexes: Vec<SharedIndex>,
    values: Vec<Value>,
    done: bool,
}

impl InsertExecutor {
    pub fn new(
        heap: Arc<TableHeap>,
        schema: Arc<Schema>,
        indexes: Vec<SharedIndex>,
        values: Vec<Value>,
    ) -> Self {
        Self {
            heap,
            schema,
            indexes,
            values,
            done: false,
        }
    }
}

impl Executor for InsertExecutor {
    fn init(&mut self) -> Result<(), SqlError> {
        self.done = false;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, SqlError> {
        if self.done {
            return Ok(None);
        }
        self.done = true;

        let mut tuple = value::encode_tuple(&self.schema, &self.values);
        let rid = self.heap.insert_tuple(&tuple)?;
        tuple.set_rid(rid);

        for index in &self.indexes {
            index.write().index.insert_entry(&tuple, rid)?;
        }

        Ok(Some(tuple))
    }
}

/// Walks the heap front to back, applying an optional equality filter.
pub struct SeqScanExecutor {
    heap: Arc<TableHeap>,
    schema: Arc<Schema>,
    predicate: Option<BoundPredicate>,
    iter: Option<TableIterator>,
}

impl SeqScanExecutor {
    pub fn new(
        heap: Arc<TableHeap>,
        schema: Arc<Schema>,
        predicate: Option<BoundPredicate>,
    ) -> Self {
        Self {
            heap,
            schema,
            predicate,
            iter: None,
        }
    }
}

impl Executor for SeqScanExecutor {
    fn init(&mut self) -> Result<(), SqlError> {
        self.iter = Some(self.heap.iter()?);
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, SqlError> {
        let Some(iter) = self.iter.as_mut() else {
            return Ok(None);
        };

        for tuple in iter {
            let tuple = tuple?;
            let matches = match &self.predicate {
                None => true,
                Some(predicate) => {
                    value::decode_column(&self.schema, &tuple, predicate.column)
                        == predicate.value
                }
            };
            if matches {
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }
}

/// Point lookup: asks the index for matching RIDs, then fetches each
/// tuple from the heap. RIDs whose tuples were deleted are skipped.
pub struct IndexScanExecutor {
    heap: Arc<TableHeap>,
    index: SharedIndex,
    key: i32,
    rids: Vec<Rid>,
    cursor: usize,
}

impl IndexScanExecutor {
    pub fn new(heap: Arc<TableHeap>, index: SharedIndex, key: i32) -> Self {
        Self {
            heap,
            index,
            key,
            rids: Vec::new(),
            cursor: 0,
        }
    }
}

impl Executor for IndexScanExecutor {
    fn init(&mut self) -> Result<(), SqlError> {
        self.rids = self.index.read().index.scan_key(self.key)?;
        self.cursor = 0;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, SqlError> {
        while self.cursor < self.rids.len() {
            let rid = self.rids[self.cursor];
            self.cursor += 1;
            if let Some(tuple) = self.heap.get_tuple(rid)? {
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }
}
