//! B+tree index over a single INTEGER column.
//!
//! The tree maps column values to RIDs; the wrapper here extracts keys
//! from tuples according to the table schema. Non-integer key columns
//! are rejected before an index is ever built (at catalog time), so key
//! extraction can assume a 4-byte little-endian field.

mod page;
mod tree;

pub use page::{
    BTreeNode, InternalPage, LeafPage, INTERNAL_CAPACITY, LEAF_CAPACITY,
};
pub use tree::BPlusTree;

use crate::buffer::BufferPool;
use crate::catalog::Schema;
use crate::error::{Result, StorageError};
use crate::heap::Tuple;
use crate::types::{BTreeConfig, PageId, Rid};
use std::sync::Arc;

/// An integer-key index over one column of a table.
pub struct BTreeIndex {
    tree: BPlusTree,
    schema: Arc<Schema>,
    key_col: usize,
}

impl BTreeIndex {
    /// Create an empty index keyed on `schema`'s column `key_col`.
    pub fn new(
        buffer_pool: Arc<BufferPool>,
        schema: Arc<Schema>,
        key_col: usize,
        config: BTreeConfig,
    ) -> Self {
        Self {
            tree: BPlusTree::with_config(buffer_pool, config),
            schema,
            key_col,
        }
    }

    /// Reattach an index whose tree already exists on disk.
    pub fn attach(
        buffer_pool: Arc<BufferPool>,
        schema: Arc<Schema>,
        key_col: usize,
        root_page_id: PageId,
        config: BTreeConfig,
    ) -> Self {
        Self {
            tree: BPlusTree::attach(buffer_pool, root_page_id, config),
            schema,
            key_col,
        }
    }

    pub fn key_column(&self) -> usize {
        self.key_col
    }

    pub fn root_page_id(&self) -> PageId {
        self.tree.root_page_id()
    }

    pub fn config(&self) -> BTreeConfig {
        self.tree.config()
    }

    /// Index the tuple stored at `rid`.
    pub fn insert_entry(&mut self, tuple: &Tuple, rid: Rid) -> Result<()> {
        let key = self.key_of(tuple);
        self.tree.insert(key, rid)
    }

    /// All RIDs whose key column equals `key`.
    pub fn scan_key(&self, key: i32) -> Result<Vec<Rid>> {
        self.tree.get_value(key)
    }

    /// Deletion is not part of this engine.
    pub fn delete_entry(&mut self, _tuple: &Tuple, _rid: Rid) -> Result<()> {
        Err(StorageError::Unsupported("B+tree entry deletion"))
    }

    fn key_of(&self, tuple: &Tuple) -> i32 {
        let column = self.schema.column(self.key_col);
        tuple.i32_at(column.offset as usize)
    }
}
