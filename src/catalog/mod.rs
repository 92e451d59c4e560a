//! Catalog: the registry of tables and indexes.
//!
//! Tables are owned exclusively by the catalog; indexes are shared
//! between the by-index-name map and the per-table list, so both hold
//! them behind `Arc<RwLock<..>>`. Metadata (schemas, heap page chains,
//! index roots) persists as a JSON sidecar next to the database file;
//! the paged file itself stays pure data.

mod schema;

pub use schema::{Column, DataType, Schema};

use crate::buffer::BufferPool;
use crate::error::StorageError;
use crate::heap::TableHeap;
use crate::index::BTreeIndex;
use crate::types::{BTreeConfig, PageId};
use log::debug;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Catalog-level failures: unknown or duplicate names, bad index keys,
/// and anything the storage layer reports while heaps and trees are
/// being built.
#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("table '{0}' already exists")]
    TableExists(String),

    #[error("table '{0}' not found")]
    TableNotFound(String),

    #[error("index '{0}' already exists")]
    IndexExists(String),

    #[error("index '{0}' not found")]
    IndexNotFound(String),

    #[error("column '{column}' not found in table '{table}'")]
    ColumnNotFound { table: String, column: String },

    #[error("column '{0}' is not INTEGER; only integer columns can be indexed")]
    KeyColumnNotInteger(String),

    #[error("VARCHAR column '{0}' must declare a positive length")]
    VarcharWithoutLength(String),

    #[error("catalog file: {0}")]
    Persist(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A registered table: its schema and the heap holding its tuples.
pub struct TableInfo {
    pub name: String,
    pub id: u32,
    pub schema: Arc<Schema>,
    pub heap: Arc<TableHeap>,
}

/// A registered index over one table column.
pub struct IndexInfo {
    pub name: String,
    pub table_name: String,
    pub id: u32,
    pub key_col: usize,
    pub index: BTreeIndex,
}

/// Shared handle to an index entry
pub type SharedIndex = Arc<RwLock<IndexInfo>>;

/// The table and index registry.
pub struct Catalog {
    buffer_pool: Arc<BufferPool>,
    tables: HashMap<String, TableInfo>,
    indexes: HashMap<String, SharedIndex>,
    table_indexes: HashMap<String, Vec<SharedIndex>>,
    next_table_id: u32,
    next_index_id: u32,
}

impl Catalog {
    pub fn new(buffer_pool: Arc<BufferPool>) -> Self {
        Self {
            buffer_pool,
            tables: HashMap::new(),
            indexes: HashMap::new(),
            table_indexes: HashMap::new(),
            next_table_id: 0,
            next_index_id: 0,
        }
    }

    /// Create a table with a fresh single-page heap.
    pub fn create_table(
        &mut self,
        name: &str,
        schema: Schema,
    ) -> Result<&TableInfo, CatalogError> {
        if self.tables.contains_key(name) {
            return Err(CatalogError::TableExists(name.to_string()));
        }

        let heap = Arc::new(TableHeap::create(Arc::clone(&self.buffer_pool))?);
        let info = TableInfo {
            name: name.to_string(),
            id: self.next_table_id,
            schema: Arc::new(schema),
            heap,
        };
        self.next_table_id += 1;
        debug!("created table '{}' (id {})", name, info.id);
        Ok(self.tables.entry(name.to_string()).or_insert(info))
    }

    pub fn table(&self, name: &str) -> Result<&TableInfo, CatalogError> {
        self.tables
            .get(name)
            .ok_or_else(|| CatalogError::TableNotFound(name.to_string()))
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableInfo> {
        self.tables.values()
    }

    /// Create an index on `table.column`. The column must be INTEGER.
    /// Rows already in the table are indexed immediately.
    pub fn create_index(
        &mut self,
        index_name: &str,
        table_name: &str,
        column_name: &str,
    ) -> Result<SharedIndex, CatalogError> {
        self.create_index_with_config(
            index_name,
            table_name,
            column_name,
            BTreeConfig::default(),
        )
    }

    /// As [`Catalog::create_index`], with explicit tree fan-out limits.
    pub fn create_index_with_config(
        &mut self,
        index_name: &str,
        table_name: &str,
        column_name: &str,
        config: BTreeConfig,
    ) -> Result<SharedIndex, CatalogError> {
        if self.indexes.contains_key(index_name) {
            return Err(CatalogError::IndexExists(index_name.to_string()));
        }

        let table = self.table(table_name)?;
        let key_col = table.schema.column_index(column_name).ok_or_else(|| {
            CatalogError::ColumnNotFound {
                table: table_name.to_string(),
                column: column_name.to_string(),
            }
        })?;
        if table.schema.column(key_col).data_type != DataType::Integer {
            return Err(CatalogError::KeyColumnNotInteger(column_name.to_string()));
        }

        let mut index = BTreeIndex::new(
            Arc::clone(&self.buffer_pool),
            Arc::clone(&table.schema),
            key_col,
            config,
        );

        // Backfill from whatever the heap already holds.
        for tuple in table.heap.iter()? {
            let tuple = tuple?;
            let rid = tuple.rid();
            index.insert_entry(&tuple, rid)?;
        }

        let info = Arc::new(RwLock::new(IndexInfo {
            name: index_name.to_string(),
            table_name: table_name.to_string(),
            id: self.next_index_id,
            key_col,
            index,
        }));
        self.next_index_id += 1;

        self.indexes
            .insert(index_name.to_string(), Arc::clone(&info));
        self.table_indexes
            .entry(table_name.to_string())
            .or_default()
            .push(Arc::clone(&info));
        debug!(
            "created index '{}' on {}({})",
            index_name, table_name, column_name
        );
        Ok(info)
    }

    pub fn index(&self, name: &str) -> Result<SharedIndex, CatalogError> {
        self.indexes
            .get(name)
            .cloned()
            .ok_or_else(|| CatalogError::IndexNotFound(name.to_string()))
    }

    /// Every index registered on `table_name` (empty when there are none).
    pub fn table_indexes(&self, table_name: &str) -> &[SharedIndex] {
        self.table_indexes
            .get(table_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn index_count(&self) -> usize {
        self.indexes.len()
    }

    /// Persist table and index metadata as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), CatalogError> {
        let mut file = CatalogFile {
            tables: Vec::new(),
            indexes: Vec::new(),
            next_table_id: self.next_table_id,
            next_index_id: self.next_index_id,
        };

        let mut tables: Vec<&TableInfo> = self.tables.values().collect();
        tables.sort_by_key(|t| t.id);
        for table in tables {
            file.tables.push(TableMeta {
                name: table.name.clone(),
                id: table.id,
                schema: (*table.schema).clone(),
                first_page_id: table.heap.first_page_id(),
                last_page_id: table.heap.last_page_id(),
            });
        }

        let mut indexes: Vec<&SharedIndex> = self.indexes.values().collect();
        indexes.sort_by_key(|i| i.read().id);
        for entry in indexes {
            let info = entry.read();
            file.indexes.push(IndexMeta {
                name: info.name.clone(),
                table_name: info.table_name.clone(),
                id: info.id,
                key_col: info.key_col,
                root_page_id: info.index.root_page_id(),
                config: info.index.config(),
            });
        }

        let data = serde_json::to_string_pretty(&file)
            .map_err(|e| CatalogError::Persist(format!("serialize failed: {e}")))?;
        std::fs::write(path, data).map_err(StorageError::Io)?;
        Ok(())
    }

    /// Load a catalog from the sidecar file, reattaching heaps and index
    /// trees. A missing file yields an empty catalog.
    pub fn load(path: &Path, buffer_pool: Arc<BufferPool>) -> Result<Self, CatalogError> {
        let mut catalog = Self::new(buffer_pool);
        if !path.exists() {
            return Ok(catalog);
        }

        let data = std::fs::read_to_string(path).map_err(StorageError::Io)?;
        let file: CatalogFile = serde_json::from_str(&data)
            .map_err(|e| CatalogError::Persist(format!("invalid catalog file: {e}")))?;

        catalog.next_table_id = file.next_table_id;
        catalog.next_index_id = file.next_index_id;

        for meta in file.tables {
            let heap = Arc::new(TableHeap::attach(
                Arc::clone(&catalog.buffer_pool),
                meta.first_page_id,
                meta.last_page_id,
            ));
            catalog.tables.insert(
                meta.name.clone(),
                TableInfo {
                    name: meta.name,
                    id: meta.id,
                    schema: Arc::new(meta.schema),
                    heap,
                },
            );
        }

        for meta in file.indexes {
            let table = catalog.table(&meta.table_name)?;
            let index = BTreeIndex::attach(
                Arc::clone(&catalog.buffer_pool),
                Arc::clone(&table.schema),
                meta.key_col,
                meta.root_page_id,
                meta.config,
            );
            let info = Arc::new(RwLock::new(IndexInfo {
                name: meta.name.clone(),
                table_name: meta.table_name.clone(),
                id: meta.id,
                key_col: meta.key_col,
                index,
            }));
            catalog.indexes.insert(meta.name, Arc::clone(&info));
            catalog
                .table_indexes
                .entry(meta.table_name)
                .or_default()
                .push(info);
        }

        debug!(
            "catalog loaded: {} tables, {} indexes",
            catalog.tables.len(),
            catalog.indexes.len()
        );
        Ok(catalog)
    }
}

#[derive(Serialize, Deserialize)]
struct CatalogFile {
    tables: Vec<TableMeta>,
    indexes: Vec<IndexMeta>,
    next_table_id: u32,
    next_index_id: u32,
}

#[derive(Serialize, Deserialize)]
struct TableMeta {
    name: String,
    id: u32,
    schema: Schema,
    first_page_id: PageId,
    last_page_id: PageId,
}

#[derive(Serialize, Deserialize)]
struct IndexMeta {
    name: String,
    table_name: String,
    id: u32,
    key_col: usize,
    root_page_id: PageId,
    config: BTreeConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::Tuple;
    use crate::storage::FileDiskManager;
    use tempfile::{tempdir, TempDir};

    fn test_setup() -> (Catalog, Arc<BufferPool>, TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let dm = Arc::new(FileDiskManager::open(&path, false).unwrap());
        let pool = Arc::new(BufferPool::new(dm, 64));
        (Catalog::new(Arc::clone(&pool)), pool, dir)
    }

    fn two_column_schema() -> Schema {
        let mut schema = Schema::new();
        schema.add_column("id", DataType::Integer, 0).unwrap();
        schema.add_column("name", DataType::Varchar, 8).unwrap();
        schema
    }

    fn row(id: i32, name: &str) -> Tuple {
        let mut data = id.to_le_bytes().to_vec();
        let mut field = name.as_bytes().to_vec();
        field.resize(8, 0);
        data.extend_from_slice(&field);
        Tuple::new(data)
    }

    #[test]
    fn test_create_and_lookup_table() -> Result<(), CatalogError> {
        let (mut catalog, _pool, _dir) = test_setup();

        let info = catalog.create_table("users", two_column_schema())?;
        assert_eq!(info.name, "users");
        assert_eq!(info.id, 0);

        assert!(catalog.table("users").is_ok());
        match catalog.table("ghosts") {
            Err(CatalogError::TableNotFound(name)) => assert_eq!(name, "ghosts"),
            other => panic!("expected TableNotFound, got {:?}", other.map(|_| ())),
        }

        match catalog.create_table("users", two_column_schema()) {
            Err(CatalogError::TableExists(_)) => {}
            other => panic!("expected TableExists, got {:?}", other.map(|_| ())),
        }

        Ok(())
    }

    #[test]
    fn test_create_index_validates_key_column() -> Result<(), CatalogError> {
        let (mut catalog, _pool, _dir) = test_setup();
        catalog.create_table("users", two_column_schema())?;

        match catalog.create_index("users_by_name", "users", "name") {
            Err(CatalogError::KeyColumnNotInteger(col)) => assert_eq!(col, "name"),
            other => panic!("expected KeyColumnNotInteger, got {:?}", other.map(|_| ())),
        }
        match catalog.create_index("users_by_ghost", "users", "ghost") {
            Err(CatalogError::ColumnNotFound { .. }) => {}
            other => panic!("expected ColumnNotFound, got {:?}", other.map(|_| ())),
        }

        catalog.create_index("users_by_id", "users", "id")?;
        match catalog.create_index("users_by_id", "users", "id") {
            Err(CatalogError::IndexExists(_)) => {}
            other => panic!("expected IndexExists, got {:?}", other.map(|_| ())),
        }

        assert_eq!(catalog.table_indexes("users").len(), 1);
        assert!(catalog.index("users_by_id").is_ok());

        Ok(())
    }

    #[test]
    fn test_create_index_backfills_existing_rows() -> Result<(), CatalogError> {
        let (mut catalog, _pool, _dir) = test_setup();
        catalog.create_table("users", two_column_schema())?;

        let mut rids = Vec::new();
        {
            let table = catalog.table("users")?;
            for i in 0..20 {
                rids.push(table.heap.insert_tuple(&row(i, "u"))?);
            }
        }

        let index = catalog.create_index("users_by_id", "users", "id")?;
        for (i, &rid) in rids.iter().enumerate() {
            assert_eq!(index.read().index.scan_key(i as i32)?, vec![rid]);
        }

        Ok(())
    }

    #[test]
    fn test_save_and_load_roundtrip() -> Result<(), CatalogError> {
        let (mut catalog, pool, dir) = test_setup();
        let sidecar = dir.path().join("test.catalog.json");

        catalog.create_table("users", two_column_schema())?;
        let mut rids = Vec::new();
        {
            let table = catalog.table("users")?;
            for i in 0..10 {
                rids.push(table.heap.insert_tuple(&row(i, "u"))?);
            }
        }
        catalog.create_index("users_by_id", "users", "id")?;
        pool.flush_all()?;
        catalog.save(&sidecar)?;

        let reloaded = Catalog::load(&sidecar, Arc::clone(&pool))?;
        assert_eq!(reloaded.table_count(), 1);
        assert_eq!(reloaded.index_count(), 1);

        let table = reloaded.table("users")?;
        assert_eq!(table.schema.column_count(), 2);
        let tuple = table.heap.get_tuple(rids[3])?.unwrap();
        assert_eq!(tuple.i32_at(0), 3);

        let index = reloaded.index("users_by_id")?;
        assert_eq!(index.read().index.scan_key(7)?, vec![rids[7]]);

        Ok(())
    }

    #[test]
    fn test_load_missing_file_is_empty() -> Result<(), CatalogError> {
        let (_, pool, dir) = test_setup();
        let catalog = Catalog::load(&dir.path().join("absent.json"), pool)?;
        assert_eq!(catalog.table_count(), 0);
        Ok(())
    }
}
