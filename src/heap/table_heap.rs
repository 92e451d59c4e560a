//! Table heap: the page chain backing one table.

use crate::buffer::BufferPool;
use crate::error::{Result, StorageError};
use crate::heap::table_page::{TablePage, MAX_RECORD_SIZE};
use crate::heap::{TableIterator, Tuple};
use crate::types::{PageId, Rid};
use log::debug;
use parking_lot::Mutex;
use std::sync::Arc;

/// First and last page of the chain. Inserts extend the chain at the
/// tail; the ids only ever move forward.
pub(crate) struct PageChain {
    pub(crate) first: PageId,
    pub(crate) last: PageId,
}

/// An append-only heap of slotted pages forming one table.
pub struct TableHeap {
    buffer_pool: Arc<BufferPool>,
    chain: Mutex<PageChain>,
}

impl TableHeap {
    /// Create a heap with one freshly allocated, initialized page.
    pub fn create(buffer_pool: Arc<BufferPool>) -> Result<Self> {
        let (page_id, guard) = buffer_pool.new_page()?;
        TablePage::new(guard.write()).init();
        drop(guard);
        debug!("table heap created at page {}", page_id);

        Ok(Self {
            buffer_pool,
            chain: Mutex::new(PageChain {
                first: page_id,
                last: page_id,
            }),
        })
    }

    /// Rebuild a heap over an existing page chain (catalog reload).
    pub fn attach(buffer_pool: Arc<BufferPool>, first: PageId, last: PageId) -> Self {
        Self {
            buffer_pool,
            chain: Mutex::new(PageChain { first, last }),
        }
    }

    pub fn first_page_id(&self) -> PageId {
        self.chain.lock().first
    }

    pub fn last_page_id(&self) -> PageId {
        self.chain.lock().last
    }

    pub(crate) fn buffer_pool(&self) -> &Arc<BufferPool> {
        &self.buffer_pool
    }

    /// Append a tuple, growing the chain by one page when the tail is
    /// full. A tuple no fresh page can hold is a schema/data error.
    pub fn insert_tuple(&self, tuple: &Tuple) -> Result<Rid> {
        let mut chain = self.chain.lock();

        let guard = self.buffer_pool.fetch_page(chain.last)?;
        if let Some(slot_id) = TablePage::new(guard.write()).insert(tuple.data()) {
            return Ok(Rid::new(chain.last, slot_id));
        }

        if tuple.len() > MAX_RECORD_SIZE {
            return Err(StorageError::TupleTooLarge {
                size: tuple.len(),
                max: MAX_RECORD_SIZE,
            });
        }

        let (new_page_id, new_guard) = self.buffer_pool.new_page()?;
        let mut new_page = TablePage::new(new_guard.write());
        new_page.init();
        let slot_id = match new_page.insert(tuple.data()) {
            Some(slot_id) => slot_id,
            // The size was checked above; a fresh page rejecting it means
            // the page format itself is broken.
            None => panic!(
                "fresh page {} rejected a {}-byte tuple",
                new_page_id,
                tuple.len()
            ),
        };
        drop(new_page);

        TablePage::new(guard.write()).set_next_page_id(new_page_id);
        chain.last = new_page_id;
        debug!("table heap grew to page {}", new_page_id);

        Ok(Rid::new(new_page_id, slot_id))
    }

    /// Fetch the tuple at `rid`. Deleted or never-written slots come back
    /// as `None`.
    pub fn get_tuple(&self, rid: Rid) -> Result<Option<Tuple>> {
        {
            let chain = self.chain.lock();
            if rid.page_id < chain.first || rid.page_id > chain.last {
                return Ok(None);
            }
        }

        let guard = self.buffer_pool.fetch_page(rid.page_id)?;
        let page = TablePage::new(guard.read());
        Ok(page.record(rid.slot_id).map(|bytes| {
            let mut tuple = Tuple::from_slice(bytes);
            tuple.set_rid(rid);
            tuple
        }))
    }

    /// Logically delete the tuple at `rid`. Returns whether a live slot
    /// was deleted.
    pub fn mark_delete(&self, rid: Rid) -> Result<bool> {
        {
            let chain = self.chain.lock();
            if rid.page_id < chain.first || rid.page_id > chain.last {
                return Ok(false);
            }
        }

        let guard = self.buffer_pool.fetch_page(rid.page_id)?;
        let mut page = TablePage::new(guard.write());
        if page.record(rid.slot_id).is_none() {
            return Ok(false);
        }
        Ok(page.mark_delete(rid.slot_id))
    }

    /// Forward iterator positioned on the first live tuple.
    pub fn iter(self: &Arc<Self>) -> Result<TableIterator> {
        TableIterator::begin(Arc::clone(self))
    }
}
