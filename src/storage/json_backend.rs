use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{MembershipRoster, MonthBook, MonthKey};
use crate::errors::LedgerError;
use crate::utils::paths::{
    book_file_in, books_dir_in, ensure_dir, resolve_base, roster_file_in, unit_dir_in,
    write_atomic,
};

use super::{BookStore, Result};

/// File backend: `<root>/books/<unit>/roster.json` and `<root>/books/<unit>/<YYYY-MM>.json`.
///
/// Clones share one write guard, so book updates through any clone are serialized.
#[derive(Debug, Clone)]
pub struct JsonStorage {
    books_dir: PathBuf,
    write_guard: Arc<Mutex<()>>,
}

impl JsonStorage {
    pub fn new(root: Option<PathBuf>) -> Result<Self> {
        let root = resolve_base(root);
        ensure_dir(&root)?;
        let books_dir = books_dir_in(&root);
        ensure_dir(&books_dir)?;
        Ok(Self {
            books_dir,
            write_guard: Arc::new(Mutex::new(())),
        })
    }

    pub fn book_path(&self, unit_id: Uuid, month: MonthKey) -> PathBuf {
        book_file_in(&unit_dir_in(&self.books_dir, unit_id), month)
    }

    pub fn roster_path(&self, unit_id: Uuid) -> PathBuf {
        roster_file_in(&unit_dir_in(&self.books_dir, unit_id))
    }

    fn write_book(&self, book: &MonthBook) -> Result<()> {
        let path = self.book_path(book.unit_id, book.month);
        write_json(&path, book)?;
        debug!(path = %path.display(), "month book saved");
        Ok(())
    }
}

impl BookStore for JsonStorage {
    fn load_book(&self, unit_id: Uuid, month: MonthKey) -> Result<Option<MonthBook>> {
        let path = self.book_path(unit_id, month);
        let book: Option<MonthBook> = read_optional(&path)?;
        match book {
            Some(book) if book.unit_id != unit_id || book.month != month => {
                Err(LedgerError::InvalidRef(format!(
                    "book `{}` holds {} / {} instead of the requested key",
                    path.display(),
                    book.unit_id,
                    book.month
                )))
            }
            other => Ok(other),
        }
    }

    fn save_book(&self, book: &MonthBook) -> Result<()> {
        let _guard = self.write_guard.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.write_book(book)
    }

    fn update_book(
        &self,
        unit_id: Uuid,
        month: MonthKey,
        apply: &mut dyn FnMut(&mut MonthBook),
    ) -> Result<()> {
        let _guard = self.write_guard.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut book = self
            .load_book(unit_id, month)?
            .unwrap_or_else(|| MonthBook::new(unit_id, month));
        apply(&mut book);
        self.write_book(&book)
    }

    fn months(&self, unit_id: Uuid) -> Result<Vec<MonthKey>> {
        let dir = unit_dir_in(&self.books_dir, unit_id);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut months = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let month = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<MonthKey>().ok());
            if let Some(month) = month {
                months.push(month);
            }
        }
        months.sort();
        Ok(months)
    }

    fn load_roster(&self, unit_id: Uuid) -> Result<Option<MembershipRoster>> {
        let path = self.roster_path(unit_id);
        let roster: Option<MembershipRoster> = read_optional(&path)?;
        match roster {
            Some(roster) if roster.unit_id != unit_id => Err(LedgerError::InvalidRef(format!(
                "roster `{}` belongs to unit {}",
                path.display(),
                roster.unit_id
            ))),
            other => Ok(other),
        }
    }

    fn save_roster(&self, roster: &MembershipRoster) -> Result<()> {
        write_json(&self.roster_path(roster.unit_id), roster)
    }
}

fn read_optional<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&data)?))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    write_atomic(path, &json)?;
    Ok(())
}
