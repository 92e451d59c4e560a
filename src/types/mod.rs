//! Common types used throughout the storage engine.

mod page_id;
mod rid;

pub use page_id::PageId;
pub use rid::Rid;

use serde::{Deserialize, Serialize};

/// Page size in bytes (4KB), the unit of disk I/O and buffer-pool caching
pub const PAGE_SIZE: usize = 4096;

/// B+tree configuration for customizable node fan-out.
///
/// Nodes record their own capacity in the on-disk header (`max_key_count`),
/// so shrinking the fan-out for tests changes nothing about the page format.
/// Limits above what the fixed entry layout can hold are capped at
/// construction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BTreeConfig {
    /// Maximum keys per leaf node
    pub max_leaf_keys: u16,
    /// Maximum keys per internal node
    pub max_internal_keys: u16,
}

impl Default for BTreeConfig {
    fn default() -> Self {
        Self {
            max_leaf_keys: crate::index::LEAF_CAPACITY,
            max_internal_keys: crate::index::INTERNAL_CAPACITY,
        }
    }
}

impl BTreeConfig {
    /// Minimum fan-out a node must have to stay splittable
    pub const MIN_KEYS: u16 = 2;

    /// Create a config with custom limits, clamped to the layout capacity
    pub fn new(max_leaf_keys: u16, max_internal_keys: u16) -> Self {
        Self {
            max_leaf_keys: max_leaf_keys
                .clamp(Self::MIN_KEYS, crate::index::LEAF_CAPACITY),
            max_internal_keys: max_internal_keys
                .clamp(Self::MIN_KEYS, crate::index::INTERNAL_CAPACITY),
        }
    }
}
