//! CSV data store. Every table is a flat file that is read whole and
//! rewritten whole. Rewrites land in a temp file that is renamed over the
//! target, and writers inside this process take a shared lock so that a
//! read-modify-write cannot interleave with another one.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{de::DeserializeOwned, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

/// The tables backing the service, one CSV file each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    WorkOrders,
    Technicians,
    WorkStatusTypes,
    WorkStatusLogs,
    CompletionNotes,
    HoldNotes,
    StatusLogChat,
}

impl Table {
    pub fn file_name(self) -> &'static str {
        match self {
            Table::WorkOrders => "work_orders.csv",
            Table::Technicians => "technicians.csv",
            Table::WorkStatusTypes => "work_status_types.csv",
            Table::WorkStatusLogs => "work_status_logs.csv",
            Table::CompletionNotes => "completion_notes.csv",
            Table::HoldNotes => "hold_notes.csv",
            Table::StatusLogChat => "status_log_chat.csv",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("Store task failed: {0}")]
    Task(String),
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    fn csv(path: &Path, source: csv::Error) -> Self {
        StoreError::Csv {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Rows carrying a store-assigned integer id.
pub trait Record {
    fn id(&self) -> u64;
}

/// Handle to the CSV directory. Cheap to clone; clones share the write lock.
#[derive(Clone)]
pub struct CsvStore {
    data_dir: Arc<PathBuf>,
    write_lock: Arc<Mutex<()>>,
}

impl CsvStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Arc::new(data_dir.into()),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path(&self, table: Table) -> PathBuf {
        self.data_dir.join(table.file_name())
    }

    /// Reads every row of `table`. A missing file is an empty table.
    pub fn read_all<T: DeserializeOwned>(&self, table: Table) -> Result<Vec<T>, StoreError> {
        let path = self.path(table);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&path).map_err(|e| StoreError::io(&path, e))?;
        let mut reader = csv::Reader::from_reader(file);
        let mut rows = Vec::new();
        for row in reader.deserialize() {
            rows.push(row.map_err(|e| StoreError::csv(&path, e))?);
        }
        debug!("Read {} rows from {}", rows.len(), path.display());
        Ok(rows)
    }

    /// Replaces the whole content of `table` with `rows`. Used to seed tables.
    #[cfg(test)]
    pub fn write_all<T: Serialize>(&self, table: Table, rows: &[T]) -> Result<(), StoreError> {
        let _guard = self.lock();
        self.rewrite(table, rows)
    }

    /// Highest existing id plus one, or 1 for an empty table.
    #[cfg(test)]
    pub fn next_id<T>(&self, table: Table) -> Result<u64, StoreError>
    where
        T: Record + DeserializeOwned,
    {
        let rows: Vec<T> = self.read_all(table)?;
        Ok(next_id_of(&rows))
    }

    /// Assigns the next id and appends the row built from it, all under the
    /// write lock so concurrent inserts cannot reuse an id.
    pub fn insert_with_id<T, F>(&self, table: Table, build: F) -> Result<T, StoreError>
    where
        T: Record + Serialize + DeserializeOwned + Clone,
        F: FnOnce(u64) -> T,
    {
        self.update(table, |rows: &mut Vec<T>| {
            let row = build(next_id_of(rows));
            rows.push(row.clone());
            row
        })
    }

    /// Read-modify-write of a whole table under the write lock.
    pub fn update<T, R, F>(&self, table: Table, mutate: F) -> Result<R, StoreError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut Vec<T>) -> R,
    {
        let _guard = self.lock();
        let mut rows = self.read_all(table)?;
        let out = mutate(&mut rows);
        self.rewrite(table, &rows)?;
        Ok(out)
    }

    /// Runs synchronous store work on tokio's blocking pool so file IO and
    /// the write lock stay off the async workers.
    pub async fn blocking<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&CsvStore) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || work(&store))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn rewrite<T: Serialize>(&self, table: Table, rows: &[T]) -> Result<(), StoreError> {
        let path = self.path(table);
        std::fs::create_dir_all(self.data_dir.as_path())
            .map_err(|e| StoreError::io(self.data_dir.as_path(), e))?;

        let tmp = NamedTempFile::new_in(self.data_dir.as_path())
            .map_err(|e| StoreError::io(self.data_dir.as_path(), e))?;
        {
            let mut writer = csv::Writer::from_writer(tmp.as_file());
            for row in rows {
                writer.serialize(row).map_err(|e| StoreError::csv(&path, e))?;
            }
            writer.flush().map_err(|e| StoreError::io(&path, e))?;
        }
        tmp.persist(&path)
            .map_err(|e| StoreError::io(&path, e.error))?;

        debug!("Wrote {} rows to {}", rows.len(), path.display());
        Ok(())
    }
}

fn next_id_of<T: Record>(rows: &[T]) -> u64 {
    rows.iter().map(Record::id).max().map_or(1, |max| max + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        id: u64,
        name: String,
    }

    impl Record for Row {
        fn id(&self) -> u64 {
            self.id
        }
    }

    fn row(id: u64, name: &str) -> Row {
        Row {
            id,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let store = CsvStore::new(dir.path());
        let rows: Vec<Row> = store.read_all(Table::HoldNotes).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_next_id_starts_at_one() {
        let dir = TempDir::new().unwrap();
        let store = CsvStore::new(dir.path());
        assert_eq!(store.next_id::<Row>(Table::HoldNotes).unwrap(), 1);
    }

    #[test]
    fn test_next_id_follows_highest_not_count() {
        let dir = TempDir::new().unwrap();
        let store = CsvStore::new(dir.path());
        store
            .write_all(Table::HoldNotes, &[row(3, "a"), row(7, "b")])
            .unwrap();
        assert_eq!(store.next_id::<Row>(Table::HoldNotes).unwrap(), 8);
    }

    #[test]
    fn test_insert_keeps_existing_rows() {
        let dir = TempDir::new().unwrap();
        let store = CsvStore::new(dir.path());
        store.write_all(Table::HoldNotes, &[row(4, "first")]).unwrap();
        store
            .insert_with_id(Table::HoldNotes, |id| row(id, "second, with comma"))
            .unwrap();

        let rows: Vec<Row> = store.read_all(Table::HoldNotes).unwrap();
        assert_eq!(rows, vec![row(4, "first"), row(5, "second, with comma")]);
    }

    #[test]
    fn test_concurrent_inserts_get_distinct_ids() {
        let dir = TempDir::new().unwrap();
        let store = CsvStore::new(dir.path());
        let writers = 16;

        let handles: Vec<_> = (0..writers)
            .map(|n| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store
                        .insert_with_id(Table::HoldNotes, |id| row(id, &format!("writer {n}")))
                        .unwrap()
                        .id
                })
            })
            .collect();
        let mut ids: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        ids.sort_unstable();

        assert_eq!(ids, (1..=writers as u64).collect::<Vec<_>>());
        let rows: Vec<Row> = store.read_all(Table::HoldNotes).unwrap();
        assert_eq!(rows.len(), writers);
    }

    #[tokio::test]
    async fn test_blocking_runs_store_work() {
        let dir = TempDir::new().unwrap();
        let store = CsvStore::new(dir.path());
        let inserted = store
            .blocking(|s| s.insert_with_id(Table::HoldNotes, |id| row(id, "a")))
            .await
            .unwrap();
        assert_eq!(inserted.id, 1);

        let rows: Vec<Row> = store
            .blocking(|s| s.read_all(Table::HoldNotes))
            .await
            .unwrap();
        assert_eq!(rows, vec![row(1, "a")]);
    }

    #[test]
    fn test_insert_with_id_assigns_sequential_ids() {
        let dir = TempDir::new().unwrap();
        let store = CsvStore::new(dir.path());
        let a = store
            .insert_with_id(Table::HoldNotes, |id| row(id, "a"))
            .unwrap();
        let b = store
            .insert_with_id(Table::HoldNotes, |id| row(id, "b"))
            .unwrap();
        assert_eq!((a.id, b.id), (1, 2));
    }

    #[test]
    fn test_update_returns_closure_result() {
        let dir = TempDir::new().unwrap();
        let store = CsvStore::new(dir.path());
        store.write_all(Table::HoldNotes, &[row(1, "old")]).unwrap();

        let found = store
            .update(Table::HoldNotes, |rows: &mut Vec<Row>| {
                rows.iter_mut()
                    .find(|r| r.id == 1)
                    .map(|r| r.name = "new".to_string())
                    .is_some()
            })
            .unwrap();

        assert!(found);
        let rows: Vec<Row> = store.read_all(Table::HoldNotes).unwrap();
        assert_eq!(rows[0].name, "new");
    }

    #[test]
    fn test_write_creates_data_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("Database");
        let store = CsvStore::new(&nested);
        store.write_all(Table::HoldNotes, &[row(1, "a")]).unwrap();
        assert!(nested.join("hold_notes.csv").exists());
    }

    #[test]
    fn test_malformed_row_is_csv_error() {
        let dir = TempDir::new().unwrap();
        let store = CsvStore::new(dir.path());
        std::fs::write(store.path(Table::HoldNotes), "id,name\nnot-a-number,x\n").unwrap();
        let err = store.read_all::<Row>(Table::HoldNotes).unwrap_err();
        assert!(matches!(err, StoreError::Csv { .. }));
    }
}
