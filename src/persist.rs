use std::{
    ffi::OsString,
    fs::{self, File},
    io::{BufReader, BufWriter, ErrorKind, Write},
    path::{Path, PathBuf},
};

use log::debug;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    algo::{
        tabular::{QTable, QTableSnapshot},
        Hashable,
    },
    Result,
};

/// Loads and saves an action-value table between runs
pub trait TableStore<S: Hashable> {
    /// **Returns** `Ok(None)` if nothing has been saved yet
    fn load(&mut self) -> Result<Option<QTable<S>>>;

    fn save(&mut self, table: &QTable<S>) -> Result<()>;
}

/// Stores the table as JSON in a single file
///
/// Saving writes a sibling `<path>.tmp` file, syncs it, then renames it over `<path>`, so an
/// interrupted save leaves the previous table readable.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = OsString::from(self.path.as_os_str());
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }
}

impl<S> TableStore<S> for JsonFileStore
where
    S: Hashable + Serialize + DeserializeOwned,
{
    fn load(&mut self) -> Result<Option<QTable<S>>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let snapshot: QTableSnapshot<S> = serde_json::from_reader(BufReader::new(file))?;
        let table = QTable::from_snapshot(snapshot)?;
        debug!("Loaded {} states from {}", table.len(), self.path.display());
        Ok(Some(table))
    }

    fn save(&mut self, table: &QTable<S>) -> Result<()> {
        let tmp = self.tmp_path();
        let mut writer = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer(&mut writer, &table.to_snapshot())?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);

        fs::rename(&tmp, &self.path)?;
        debug!("Saved {} states to {}", table.len(), self.path.display());
        Ok(())
    }
}

/// Keeps the last saved table in memory
#[derive(Debug, Clone)]
pub struct MemoryStore<S: Hashable> {
    table: Option<QTable<S>>,
    saves: usize,
}

impl<S: Hashable> Default for MemoryStore<S> {
    fn default() -> Self {
        Self {
            table: None,
            saves: 0,
        }
    }
}

impl<S: Hashable> MemoryStore<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `table`
    pub fn with_table(table: QTable<S>) -> Self {
        Self {
            table: Some(table),
            saves: 0,
        }
    }

    pub fn table(&self) -> Option<&QTable<S>> {
        self.table.as_ref()
    }

    /// Number of successful saves
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl<S: Hashable> TableStore<S> for MemoryStore<S> {
    fn load(&mut self) -> Result<Option<QTable<S>>> {
        Ok(self.table.clone())
    }

    fn save(&mut self, table: &QTable<S>) -> Result<()> {
        self.table = Some(table.clone());
        self.saves += 1;
        Ok(())
    }
}
