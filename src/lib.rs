//! # relstore
//!
//! A minimal relational storage engine: tuples persist in a paged heap
//! file, an on-disk B+tree indexes them, and a tiny SQL subset
//! (CREATE TABLE, CREATE INDEX, INSERT, SELECT with an optional equality
//! predicate) drives the whole stack.
//!
//! ## Architecture
//!
//! The layers depend strictly downward:
//!
//! - **Storage** (`storage`): 4 KiB page reads and synced writes over one
//!   file; sequential page allocation
//! - **Buffer pool** (`buffer`): fixed frame cache with pin counts, clock
//!   eviction, dirty write-back, and RAII page guards
//! - **Heap** (`heap`): slotted table pages chained into per-table heaps
//!   with a deletion-skipping forward iterator
//! - **Index** (`index`): B+tree over integer keys with split
//!   propagation and duplicate support
//! - **Catalog** (`catalog`): table and index registry with a JSON
//!   sidecar for persistence
//! - **SQL** (`sql`): lexer, parser, binder, and volcano executors
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relstore::{Config, Database};
//!
//! let mut db = Database::open(Config::new("my_database.db"))?;
//! db.execute("CREATE TABLE users (id INT, name VARCHAR(16));")?;
//! db.execute("INSERT INTO users VALUES (1, 'ada');")?;
//! db.execute("CREATE INDEX users_by_id ON users (id);")?;
//!
//! if let StatementResult::Rows { rows, .. } =
//!     db.execute("SELECT * FROM users WHERE id = 1;")?
//! {
//!     println!("{} rows", rows.len());
//! }
//! db.flush()?;
//! ```

pub mod buffer;
pub mod catalog;
pub mod error;
pub mod heap;
pub mod index;
pub mod sql;
pub mod storage;
pub mod types;

pub use error::{Result, StorageError};
pub use types::{BTreeConfig, PageId, Rid, PAGE_SIZE};

// Re-export main public API
pub use buffer::{BufferPool, PageGuard};
pub use catalog::{Catalog, DataType, Schema};
pub use heap::{TableHeap, TableIterator, Tuple};
pub use index::{BPlusTree, BTreeIndex};
pub use sql::{SqlError, StatementResult, Value};
pub use storage::{DiskManager, FileDiskManager};

use log::warn;
use std::path::PathBuf;
use std::sync::Arc;

/// Database configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the database file
    pub path: PathBuf,
    /// Buffer pool size in number of pages (default: 256)
    pub buffer_pool_size: usize,
    /// Whether writes sync to stable storage before returning
    /// (default: true)
    pub sync_on_write: bool,
}

impl Config {
    /// Create a new configuration with default settings
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            buffer_pool_size: 256,
            sync_on_write: true,
        }
    }

    /// Set buffer pool size
    pub fn buffer_pool_size(mut self, size: usize) -> Self {
        self.buffer_pool_size = size;
        self
    }

    /// Trade durability for speed by skipping per-write syncs
    pub fn sync_on_write(mut self, enabled: bool) -> Self {
        self.sync_on_write = enabled;
        self
    }

    fn catalog_path(&self) -> PathBuf {
        let mut path = self.path.clone().into_os_string();
        path.push(".catalog.json");
        PathBuf::from(path)
    }
}

/// Main database handle wiring the storage stack together.
pub struct Database {
    buffer_pool: Arc<BufferPool>,
    catalog: Catalog,
    catalog_path: PathBuf,
}

impl Database {
    /// Open or create a database at the configured path. Table and index
    /// metadata is reloaded from the catalog sidecar when one exists.
    pub fn open(config: Config) -> std::result::Result<Self, SqlError> {
        let disk = Arc::new(FileDiskManager::open(&config.path, config.sync_on_write)?);
        let buffer_pool = Arc::new(BufferPool::new(disk, config.buffer_pool_size));
        let catalog_path = config.catalog_path();
        let catalog = Catalog::load(&catalog_path, Arc::clone(&buffer_pool))?;

        Ok(Self {
            buffer_pool,
            catalog,
            catalog_path,
        })
    }

    /// Run one SQL statement.
    pub fn execute(&mut self, sql: &str) -> std::result::Result<StatementResult, SqlError> {
        sql::run_statement(&mut self.catalog, sql)
    }

    /// Write every dirty page through to disk, then persist the catalog.
    pub fn flush(&self) -> std::result::Result<(), SqlError> {
        self.buffer_pool.flush_all()?;
        self.catalog.save(&self.catalog_path)?;
        Ok(())
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPool> {
        &self.buffer_pool
    }

    /// Get statistics about the database
    pub fn stats(&self) -> DbStats {
        DbStats {
            buffer_pool_size: self.buffer_pool.capacity(),
            pinned_pages: self.buffer_pool.pinned_pages(),
            table_count: self.catalog.table_count(),
            index_count: self.catalog.index_count(),
        }
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!("flush on close failed: {}", e);
        }
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DbStats {
    /// Buffer pool capacity in frames
    pub buffer_pool_size: usize,
    /// Frames currently pinned
    pub pinned_pages: usize,
    /// Number of registered tables
    pub table_count: usize,
    /// Number of registered indexes
    pub index_count: usize,
}
