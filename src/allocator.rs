use crate::error::{ReportError, Result};
use crate::schema::CellRef;
use crate::traits::{CounterStore, SheetSink};
use log::{debug, info};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// The row cursor as a decimal integer in a plain text file.
pub struct FileCounterStore {
    path: PathBuf,
}

impl FileCounterStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CounterStore for FileCounterStore {
    fn read(&self) -> Result<u32> {
        let contents = fs::read_to_string(&self.path).map_err(|e| {
            ReportError::CounterUnreadable(format!("{}: {}", self.path.display(), e))
        })?;

        contents
            .trim()
            .parse::<u32>()
            .map_err(|_| ReportError::CounterCorrupt {
                path: self.path.display().to_string(),
                contents,
            })
    }

    fn write(&self, value: u32) -> Result<()> {
        fs::write(&self.path, value.to_string()).map_err(|e| match e.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => {
                ReportError::CounterUnreadable(format!("{}: {}", self.path.display(), e))
            }
            _ => ReportError::IoError(e),
        })
    }
}

/// Hands out the next empty row of an append-only sheet.
///
/// The stored cursor is a hint: it advances by one on every call, before the
/// sheet is scanned, and the scan walks forward from it to the first row whose
/// first cell is empty. Concurrent runs are not coordinated.
pub struct RowAllocator<'a> {
    counter: &'a dyn CounterStore,
    sheet: &'a dyn SheetSink,
}

impl<'a> RowAllocator<'a> {
    pub fn new(counter: &'a dyn CounterStore, sheet: &'a dyn SheetSink) -> Self {
        Self { counter, sheet }
    }

    pub async fn next_row(&self) -> Result<u32> {
        let current = self.counter.read()?;
        self.counter.write(current.saturating_add(1))?;
        debug!("Row cursor advanced from {}", current);

        // Sheets are 1-based
        let start = current.max(1);
        let row_count = self.sheet.row_count().await?;

        for row in start..=row_count {
            if self.sheet.read_cell(&CellRef::new(0, row)).await?.is_none() {
                info!("Next available row: {}", row);
                return Ok(row);
            }
        }

        Err(ReportError::SheetFull {
            from_row: start,
            row_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_counter_round_trip() {
        let dir = tempdir().unwrap();
        let store = FileCounterStore::new(dir.path().join("rownumber.txt"));
        fs::write(store.path(), "41\n").unwrap();

        assert_eq!(store.read().unwrap(), 41);
        store.write(42).unwrap();
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "42");
    }

    #[test]
    fn test_file_counter_missing_is_unreadable() {
        let dir = tempdir().unwrap();
        let store = FileCounterStore::new(dir.path().join("absent.txt"));
        assert!(matches!(
            store.read(),
            Err(ReportError::CounterUnreadable(_))
        ));
    }

    #[test]
    fn test_file_counter_corrupt() {
        let dir = tempdir().unwrap();
        let store = FileCounterStore::new(dir.path().join("rownumber.txt"));
        fs::write(store.path(), "forty-two").unwrap();

        let err = store.read().unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, ReportError::CounterCorrupt { .. }));
    }
}
