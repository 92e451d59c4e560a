//! Disk manager implementation.
//!
//! The disk manager is responsible for reading and writing pages to the
//! database file. It abstracts the file I/O operations behind a trait
//! so that the rest of the system can be tested with mock implementations.
//!
//! Page `p` occupies bytes `p * PAGE_SIZE .. (p + 1) * PAGE_SIZE`; there
//! is no file header or prologue. Reads that fall past the end of the
//! file yield zero-filled pages, which makes a never-written page
//! indistinguishable from an explicitly zeroed one.

use crate::buffer::PageBuf;
use crate::error::Result;
use crate::types::{PageId, PAGE_SIZE};
use log::debug;
use parking_lot::RwLock;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Trait for disk I/O operations
///
/// This abstraction allows swapping the storage backend or mocking for tests.
pub trait DiskManager: Send + Sync {
    /// Read a page from disk. Bytes past end-of-file come back zeroed.
    fn read_page(&self, page_id: PageId) -> Result<PageBuf>;

    /// Write a page to disk. The write reaches stable storage before the
    /// call returns when the manager was opened with `sync_on_write`.
    fn write_page(&self, page_id: PageId, page: &PageBuf) -> Result<()>;

    /// Allocate a new page and return its id. Ids grow monotonically;
    /// pages are never deallocated.
    fn allocate_page(&self) -> Result<PageId>;

    /// Sync all file data to disk
    fn sync(&self) -> Result<()>;
}

/// File-based disk manager implementation
pub struct FileDiskManager {
    /// The database file
    file: RwLock<File>,
    /// Next page id to hand out
    next_page_id: RwLock<i32>,
    /// Whether to sync after each write
    sync_on_write: bool,
}

impl FileDiskManager {
    /// Open or create a database file.
    ///
    /// The allocation high-water mark is re-derived from the file length,
    /// so a reopened database continues numbering where it left off.
    pub fn open(path: &Path, sync_on_write: bool) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let len = file.metadata()?.len();
        let next_page_id = len.div_ceil(PAGE_SIZE as u64) as i32;

        Ok(Self {
            file: RwLock::new(file),
            next_page_id: RwLock::new(next_page_id),
            sync_on_write,
        })
    }
}

impl DiskManager for FileDiskManager {
    fn read_page(&self, page_id: PageId) -> Result<PageBuf> {
        debug_assert!(page_id.is_valid());

        let mut buf = PageBuf::new();
        let mut file = self.file.write();
        file.seek(SeekFrom::Start(page_id.file_offset(PAGE_SIZE)))?;

        // The file may end mid-page (or before the page entirely); the
        // unread tail stays zero.
        let mut filled = 0;
        while filled < PAGE_SIZE {
            let n = file.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        Ok(buf)
    }

    fn write_page(&self, page_id: PageId, page: &PageBuf) -> Result<()> {
        debug_assert!(page_id.is_valid());

        let mut file = self.file.write();
        file.seek(SeekFrom::Start(page_id.file_offset(PAGE_SIZE)))?;
        file.write_all(page)?;

        if self.sync_on_write {
            file.sync_data()?;
        }

        Ok(())
    }

    fn allocate_page(&self) -> Result<PageId> {
        let page_id = {
            let mut next = self.next_page_id.write();
            let id = PageId::new(*next);
            *next += 1;
            id
        };

        // Extend the file so the high-water mark survives reopen even if
        // the page is never written again.
        let zeros = PageBuf::new();
        self.write_page(page_id, &zeros)?;

        debug!("allocated page {}", page_id);
        Ok(page_id)
    }

    fn sync(&self) -> Result<()> {
        let file = self.file.write();
        file.sync_all()?;
        Ok(())
    }
}
