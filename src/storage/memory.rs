use std::collections::HashMap;
use std::sync::RwLock;

use uuid::Uuid;

use crate::domain::{MembershipRoster, MonthBook, MonthKey};

use super::{BookStore, Result};

/// Process-local backend; last write wins per record id.
///
/// Book updates hold the write guard for the whole read-modify-write.
#[derive(Debug, Default)]
pub struct MemoryStore {
    books: RwLock<HashMap<(Uuid, MonthKey), MonthBook>>,
    rosters: RwLock<HashMap<Uuid, MembershipRoster>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roster(roster: MembershipRoster) -> Self {
        let store = Self::new();
        store
            .rosters
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(roster.unit_id, roster);
        store
    }
}

impl BookStore for MemoryStore {
    fn load_book(&self, unit_id: Uuid, month: MonthKey) -> Result<Option<MonthBook>> {
        let books = self.books.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(books.get(&(unit_id, month)).cloned())
    }

    fn save_book(&self, book: &MonthBook) -> Result<()> {
        let mut books = self.books.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        books.insert((book.unit_id, book.month), book.clone());
        Ok(())
    }

    fn update_book(
        &self,
        unit_id: Uuid,
        month: MonthKey,
        apply: &mut dyn FnMut(&mut MonthBook),
    ) -> Result<()> {
        let mut books = self.books.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        let book = books
            .entry((unit_id, month))
            .or_insert_with(|| MonthBook::new(unit_id, month));
        apply(book);
        Ok(())
    }

    fn months(&self, unit_id: Uuid) -> Result<Vec<MonthKey>> {
        let books = self.books.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut months: Vec<MonthKey> = books
            .keys()
            .filter(|(unit, _)| *unit == unit_id)
            .map(|(_, month)| *month)
            .collect();
        months.sort();
        Ok(months)
    }

    fn load_roster(&self, unit_id: Uuid) -> Result<Option<MembershipRoster>> {
        let rosters = self.rosters.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(rosters.get(&unit_id).cloned())
    }

    fn save_roster(&self, roster: &MembershipRoster) -> Result<()> {
        let mut rosters = self
            .rosters
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        rosters.insert(roster.unit_id, roster.clone());
        Ok(())
    }
}
