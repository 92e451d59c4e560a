//! Forward iterator over a table heap.
//!
//! The iterator walks slots in page order, skipping logically deleted
//! ones and following `next_page_id` across page boundaries. A non-end
//! iterator always sits on a live slot, so dereferencing yields a live
//! tuple; positioning happens through the same advance routine at
//! construction and on every step.

use crate::error::Result;
use crate::heap::table_page::TablePage;
use crate::heap::{TableHeap, Tuple};
use crate::types::Rid;
use std::sync::Arc;

/// Forward-only heap iterator yielding owned tuples.
pub struct TableIterator {
    heap: Arc<TableHeap>,
    rid: Rid,
    end: bool,
}

impl TableIterator {
    /// Iterator positioned on the first live slot of the heap.
    pub(crate) fn begin(heap: Arc<TableHeap>) -> Result<Self> {
        let mut iter = Self {
            rid: Rid::new(heap.first_page_id(), 0),
            heap,
            end: false,
        };
        // Position "before slot 0", then advance to the first live slot.
        iter.advance_to_next_valid(0)?;
        Ok(iter)
    }

    /// Whether the iterator has run off the end of the heap.
    pub fn is_end(&self) -> bool {
        self.end
    }

    /// RID of the tuple the iterator currently sits on.
    pub fn rid(&self) -> Rid {
        self.rid
    }

    /// Move to the first live slot at or after `next_slot` on the current
    /// page, following the page chain as needed. Marks the iterator as
    /// ended when the chain runs out.
    fn advance_to_next_valid(&mut self, mut next_slot: u16) -> Result<()> {
        let pool = self.heap.buffer_pool();
        let mut page_id = self.rid.page_id;

        loop {
            let guard = pool.fetch_page(page_id)?;
            let page = TablePage::new(guard.read());

            let slot_count = page.slot_count();
            while next_slot < slot_count {
                if !page.is_deleted(next_slot) {
                    self.rid = Rid::new(page_id, next_slot);
                    return Ok(());
                }
                next_slot += 1;
            }

            let next_page = page.next_page_id();
            drop(page);
            drop(guard);

            if !next_page.is_valid() {
                self.end = true;
                return Ok(());
            }
            page_id = next_page;
            next_slot = 0;
        }
    }
}

impl Iterator for TableIterator {
    type Item = Result<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.end {
            let current = self.rid;
            let fetched = self.heap.get_tuple(current);

            if let Err(e) = self.advance_to_next_valid(current.slot_id + 1) {
                self.end = true;
                return Some(Err(e));
            }

            match fetched {
                Ok(Some(tuple)) => return Some(Ok(tuple)),
                // The slot was live when we positioned on it; if it is
                // gone now, just keep walking.
                Ok(None) => continue,
                Err(e) => {
                    self.end = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferPool;
    use crate::storage::FileDiskManager;
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};

    fn test_heap() -> (Arc<TableHeap>, TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let dm = Arc::new(FileDiskManager::open(&path, false).unwrap());
        let pool = Arc::new(BufferPool::new(dm, 16));
        let heap = Arc::new(TableHeap::create(pool).unwrap());
        (heap, dir)
    }

    fn int_tuple(i: i32) -> Tuple {
        Tuple::new(i.to_le_bytes().to_vec())
    }

    #[test]
    fn test_empty_heap_iterates_nothing() -> Result<()> {
        let (heap, _dir) = test_heap();
        let mut iter = heap.iter()?;
        assert!(iter.is_end());
        assert!(iter.next().is_none());
        Ok(())
    }

    #[test]
    fn test_yields_insertion_order() -> Result<()> {
        let (heap, _dir) = test_heap();
        for i in 0..10 {
            heap.insert_tuple(&int_tuple(i))?;
        }

        let values: Vec<i32> = heap
            .iter()?
            .map(|t| t.map(|t| t.i32_at(0)))
            .collect::<Result<_>>()?;
        assert_eq!(values, (0..10).collect::<Vec<_>>());

        Ok(())
    }

    #[test]
    fn test_skips_deleted_slots() -> Result<()> {
        let (heap, _dir) = test_heap();

        let mut rids = Vec::new();
        for i in 0..20 {
            rids.push(heap.insert_tuple(&int_tuple(i))?);
        }
        for (i, &rid) in rids.iter().enumerate() {
            if i % 2 == 0 {
                heap.mark_delete(rid)?;
            }
        }

        let values: Vec<i32> = heap
            .iter()?
            .map(|t| t.map(|t| t.i32_at(0)))
            .collect::<Result<_>>()?;
        assert_eq!(values, vec![1, 3, 5, 7, 9, 11, 13, 15, 17, 19]);

        Ok(())
    }

    #[test]
    fn test_begin_skips_leading_deletions() -> Result<()> {
        let (heap, _dir) = test_heap();

        let mut rids = Vec::new();
        for i in 0..5 {
            rids.push(heap.insert_tuple(&int_tuple(i))?);
        }
        heap.mark_delete(rids[0])?;
        heap.mark_delete(rids[1])?;

        let iter = heap.iter()?;
        assert!(!iter.is_end());
        assert_eq!(iter.rid(), rids[2]);

        Ok(())
    }

    #[test]
    fn test_yields_rids_with_tuples() -> Result<()> {
        let (heap, _dir) = test_heap();

        let rid = heap.insert_tuple(&int_tuple(7))?;
        let tuple = heap.iter()?.next().unwrap()?;
        assert_eq!(tuple.rid(), rid);
        assert_eq!(tuple.i32_at(0), 7);

        Ok(())
    }

    #[test]
    fn test_everything_deleted_iterates_nothing() -> Result<()> {
        let (heap, _dir) = test_heap();

        let mut rids = Vec::new();
        for i in 0..8 {
            rids.push(heap.insert_tuple(&int_tuple(i))?);
        }
        for rid in rids {
            heap.mark_delete(rid)?;
        }

        let mut iter = heap.iter()?;
        assert!(iter.is_end());
        assert!(iter.next().is_none());

        Ok(())
    }
}
