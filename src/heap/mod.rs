//! Table heap: slotted pages chained into one table.
//!
//! A table is an append-only linked list of slotted pages. Each page
//! carries a forward-growing slot directory and backward-growing record
//! payloads; deletion is logical (a slot flag), so slots are never
//! removed and record ids stay stable.

mod iterator;
mod table_heap;
mod table_page;
mod tuple;

pub use iterator::TableIterator;
pub use table_heap::TableHeap;
pub use table_page::{TablePage, MAX_RECORD_SIZE};
pub use tuple::Tuple;
