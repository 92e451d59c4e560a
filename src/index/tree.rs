//! B+tree over integer keys.
//!
//! Only leaves carry values (RIDs); internal nodes route by separator
//! keys. Inserts descend recursively and split full nodes on the way
//! back up; a root split grows the tree by one level. Lookups descend to
//! the leftmost leaf that can hold the key, then walk the leaf chain
//! right while equal keys may continue.

use crate::buffer::BufferPool;
use crate::error::Result;
use crate::index::page::{BTreeNode, InternalPage, LeafPage};
use crate::types::{BTreeConfig, PageId, Rid};
use log::debug;
use std::sync::Arc;

/// A disk-backed B+tree mapping `i32` keys to RIDs, duplicates allowed.
pub struct BPlusTree {
    /// Buffer pool for page access; the pool outlives every tree.
    buffer_pool: Arc<BufferPool>,
    /// Root page, INVALID while the tree is empty
    root_page_id: PageId,
    /// Node fan-out limits, baked into each node header at init
    config: BTreeConfig,
}

impl BPlusTree {
    /// Create an empty tree
    pub fn new(buffer_pool: Arc<BufferPool>) -> Self {
        Self::with_config(buffer_pool, BTreeConfig::default())
    }

    /// Create an empty tree with custom fan-out limits
    pub fn with_config(buffer_pool: Arc<BufferPool>, config: BTreeConfig) -> Self {
        Self {
            buffer_pool,
            root_page_id: PageId::INVALID,
            config,
        }
    }

    /// Reattach a tree persisted in an earlier session
    pub fn attach(buffer_pool: Arc<BufferPool>, root_page_id: PageId, config: BTreeConfig) -> Self {
        Self {
            buffer_pool,
            root_page_id,
            config,
        }
    }

    pub fn root_page_id(&self) -> PageId {
        self.root_page_id
    }

    pub fn config(&self) -> BTreeConfig {
        self.config
    }

    pub fn is_empty(&self) -> bool {
        !self.root_page_id.is_valid()
    }

    /// Insert one `{key, rid}` pair.
    pub fn insert(&mut self, key: i32, rid: Rid) -> Result<()> {
        if !self.root_page_id.is_valid() {
            let (page_id, guard) = self.buffer_pool.new_page()?;
            LeafPage::new(guard.write()).init(page_id, self.config.max_leaf_keys);
            self.root_page_id = page_id;
            debug!("btree root leaf allocated at page {}", page_id);
        }

        if let Some((new_page_id, _)) = self.insert_down(self.root_page_id, key, rid)? {
            // The root itself split: grow the tree by one level.
            let (root_page_id, guard) = self.buffer_pool.new_page()?;
            InternalPage::new(guard.write()).init(root_page_id, self.config.max_internal_keys);
            drop(guard);

            self.merge_new_pages(self.root_page_id, new_page_id, root_page_id)?;
            debug!(
                "btree root grew: {} over {} and {}",
                root_page_id, self.root_page_id, new_page_id
            );
            self.root_page_id = root_page_id;
        }
        Ok(())
    }

    /// Collect every RID stored under `key`.
    pub fn get_value(&self, key: i32) -> Result<Vec<Rid>> {
        let mut out = Vec::new();
        if !self.root_page_id.is_valid() {
            return Ok(out);
        }

        // Descend to the leftmost leaf that can contain `key`. Equal keys
        // may sit under the separator's left neighbor after a split, so
        // the descent takes `key <= separator` left, unlike the insert
        // path.
        let mut page_id = self.root_page_id;
        loop {
            let guard = self.buffer_pool.fetch_page(page_id)?;
            if BTreeNode::new(guard.read()).is_leaf() {
                break;
            }
            let node = InternalPage::new(guard.read());
            let count = node.key_count();
            let mut child = node.child_at(count - 1);
            for i in 1..count {
                if key <= node.key_at(i) {
                    child = node.child_at(i - 1);
                    break;
                }
            }
            page_id = child;
        }

        // Walk the leaf chain while a strictly greater key has not
        // appeared; duplicates may span any number of leaves.
        loop {
            let guard = self.buffer_pool.fetch_page(page_id)?;
            let leaf = LeafPage::new(guard.read());
            leaf.lookup(key, &mut out);

            let count = leaf.key_count();
            let has_bigger = count > 0 && leaf.key_at(count - 1) > key;
            let next = leaf.next_page_id();
            if has_bigger || !next.is_valid() {
                break;
            }
            page_id = next;
        }

        Ok(out)
    }

    /// Recursive insert into the subtree rooted at `page_id`.
    ///
    /// Returns `Some((new_page_id, new_first_key))` when this node split,
    /// so the caller can register the new right sibling; `None` otherwise.
    /// Nodes split eagerly the moment they become full, which is what
    /// lets the next descent assume every node it lands on has room.
    fn insert_down(
        &self,
        page_id: PageId,
        key: i32,
        rid: Rid,
    ) -> Result<Option<(PageId, i32)>> {
        let guard = self.buffer_pool.fetch_page(page_id)?;

        if BTreeNode::new(guard.read()).is_leaf() {
            {
                let mut leaf = LeafPage::new(guard.write());
                if !leaf.insert(key, rid) {
                    panic!("leaf {} rejected an insert below its fan-out", page_id);
                }
                if !leaf.is_full() {
                    return Ok(None);
                }
            }

            let (new_page_id, new_guard) = self.buffer_pool.new_page()?;
            let mut new_leaf = LeafPage::new(new_guard.write());
            new_leaf.init(new_page_id, self.config.max_leaf_keys);
            let mut leaf = LeafPage::new(guard.write());
            leaf.split(&mut new_leaf);
            let separator = new_leaf.key_at(0);
            debug!("leaf {} split into {}", page_id, new_page_id);
            return Ok(Some((new_page_id, separator)));
        }

        // Pick the child to descend: the last child, or `child[i-1]` for
        // the smallest `i` with `key < key[i]`.
        let child = {
            let node = InternalPage::new(guard.read());
            let count = node.key_count();
            let mut child = node.child_at(count - 1);
            for i in 1..count {
                if key < node.key_at(i) {
                    child = node.child_at(i - 1);
                    break;
                }
            }
            child
        };

        if let Some((new_child_id, new_child_key)) = self.insert_down(child, key, rid)? {
            let mut node = InternalPage::new(guard.write());
            if !node.insert_after(child, new_child_key, new_child_id) {
                panic!(
                    "internal {} rejected an insert below its fan-out",
                    page_id
                );
            }
        }

        let full = InternalPage::new(guard.read()).is_full();
        if full {
            let (new_page_id, new_guard) = self.buffer_pool.new_page()?;
            let mut new_node = InternalPage::new(new_guard.write());
            new_node.init(new_page_id, self.config.max_internal_keys);
            let mut node = InternalPage::new(guard.write());
            node.split(&mut new_node);
            let separator = new_node.key_at(0);
            debug!("internal {} split into {}", page_id, new_page_id);
            return Ok(Some((new_page_id, separator)));
        }

        Ok(None)
    }

    /// Write a freshly grown root: entry 0 points at the old root under
    /// an unused sentinel key, entry 1 carries the right sibling's first
    /// key. Both children are re-parented under the new root.
    fn merge_new_pages(
        &self,
        left_id: PageId,
        right_id: PageId,
        parent_id: PageId,
    ) -> Result<()> {
        let left_guard = self.buffer_pool.fetch_page(left_id)?;
        let right_guard = self.buffer_pool.fetch_page(right_id)?;
        let parent_guard = self.buffer_pool.fetch_page(parent_id)?;

        let right_min = if BTreeNode::new(right_guard.read()).is_leaf() {
            LeafPage::new(right_guard.read()).key_at(0)
        } else {
            InternalPage::new(right_guard.read()).key_at(0)
        };

        {
            let mut parent = InternalPage::new(parent_guard.write());
            parent.set_key_at(0, 0);
            parent.set_child_at(0, left_id);
            parent.set_key_at(1, right_min);
            parent.set_child_at(1, right_id);
            parent.set_key_count(2);
        }

        BTreeNode::new(left_guard.write()).set_parent_page_id(parent_id);
        BTreeNode::new(right_guard.write()).set_parent_page_id(parent_id);
        Ok(())
    }
}
