//! Record identifier type.

use crate::types::PageId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical address of a tuple within a table heap: the page it lives on
/// and its slot within that page.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Rid {
    pub page_id: PageId,
    pub slot_id: u16,
}

impl Rid {
    pub const fn new(page_id: PageId, slot_id: u16) -> Self {
        Self { page_id, slot_id }
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.page_id, self.slot_id)
    }
}
