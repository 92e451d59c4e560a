//! Error types for the storage engine.

use crate::types::PageId;
use thiserror::Error;

/// Result type alias for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur in the storage engine
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O error from the underlying file system
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Buffer pool has no evictable frame left
    #[error("Buffer pool exhausted: no evictable frame")]
    PoolExhausted,

    /// Unpin was called for a page that is not resident in the pool
    #[error("Page {0} is not resident in the buffer pool")]
    PageNotResident(PageId),

    /// Unpin was called for a resident page whose pin count is zero
    #[error("Page {0} is not pinned")]
    PageNotPinned(PageId),

    /// A tuple does not fit into a freshly initialized page
    #[error("Tuple of {size} bytes exceeds page capacity of {max} bytes")]
    TupleTooLarge { size: usize, max: usize },

    /// Operation that this engine deliberately does not implement
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),
}
