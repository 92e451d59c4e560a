//! Storage layer: disk I/O over a single paged file.
//!
//! This module provides the abstraction for reading and writing 4 KiB
//! pages at fixed offsets of the backing file and for allocating new
//! page ids.

mod disk_manager;

pub use disk_manager::{DiskManager, FileDiskManager};
