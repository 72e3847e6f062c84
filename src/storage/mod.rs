//! Collaborator interfaces the services depend on, plus two backends.
//!
//! Backends only implement [`BookStore`] (load/save a whole unit-month book and
//! the unit roster); the record, lock and membership views are derived from it.
//! Every record and lock write goes through [`BookStore::update_book`], which
//! each backend runs under one guard per store handle. Separate processes
//! sharing a data directory are not serialized.

pub mod json_backend;
pub mod memory;

use uuid::Uuid;

use crate::domain::{
    CashPayment, DailyMealRecord, GroceryPurchase, MembershipRoster, MonthBook, MonthKey,
    MonthLockState, Role, SharedCostEntry,
};
use crate::errors::LedgerError;

pub use json_backend::JsonStorage;
pub use memory::MemoryStore;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Persistence backend storing one [`MonthBook`] per (unit, month) and one roster per unit.
pub trait BookStore: Send + Sync {
    fn load_book(&self, unit_id: Uuid, month: MonthKey) -> Result<Option<MonthBook>>;
    fn save_book(&self, book: &MonthBook) -> Result<()>;
    /// Loads (or creates) the book, applies `apply` and saves it as one step.
    fn update_book(
        &self,
        unit_id: Uuid,
        month: MonthKey,
        apply: &mut dyn FnMut(&mut MonthBook),
    ) -> Result<()>;
    /// Months with a stored book for the unit, ascending.
    fn months(&self, unit_id: Uuid) -> Result<Vec<MonthKey>>;
    fn load_roster(&self, unit_id: Uuid) -> Result<Option<MembershipRoster>>;
    fn save_roster(&self, roster: &MembershipRoster) -> Result<()>;
}

/// Record queries scoped by (unit, month) and id-based record mutation.
pub trait RecordStore: Send + Sync {
    fn shared_costs(&self, unit_id: Uuid, month: MonthKey) -> Result<Vec<SharedCostEntry>>;
    fn payments(&self, unit_id: Uuid, month: MonthKey) -> Result<Vec<CashPayment>>;
    fn purchases(&self, unit_id: Uuid, month: MonthKey) -> Result<Vec<GroceryPurchase>>;
    fn meals(&self, unit_id: Uuid, month: MonthKey) -> Result<Vec<DailyMealRecord>>;

    fn shared_cost(&self, unit_id: Uuid, id: Uuid) -> Result<Option<SharedCostEntry>>;
    fn save_shared_cost(&self, entry: &SharedCostEntry) -> Result<()>;
    fn remove_shared_cost(&self, unit_id: Uuid, id: Uuid) -> Result<Option<SharedCostEntry>>;

    fn payment(&self, unit_id: Uuid, id: Uuid) -> Result<Option<CashPayment>>;
    /// Every payment made by the member across all stored months, oldest month first.
    fn member_payments(&self, unit_id: Uuid, member_id: Uuid) -> Result<Vec<CashPayment>>;
    fn save_payment(&self, payment: &CashPayment) -> Result<()>;

    fn purchase(&self, unit_id: Uuid, id: Uuid) -> Result<Option<GroceryPurchase>>;
    fn save_purchase(&self, purchase: &GroceryPurchase) -> Result<()>;
    fn remove_purchase(&self, unit_id: Uuid, id: Uuid) -> Result<Option<GroceryPurchase>>;

    /// Replaces any record with the same (member, date) key.
    fn upsert_meal(&self, record: &DailyMealRecord) -> Result<()>;

    /// Replaces every record of the book's month. A book without a lock keeps the stored one.
    fn replace_book(&self, book: &MonthBook) -> Result<()>;
}

/// Get-or-absent and upsert for month lock records.
pub trait LockStore: Send + Sync {
    fn get_lock(&self, unit_id: Uuid, month: MonthKey) -> Result<Option<MonthLockState>>;
    fn upsert_lock(&self, state: &MonthLockState) -> Result<()>;
    /// Replaces the lock record with `apply(current)` without another writer in between.
    fn update_lock(
        &self,
        unit_id: Uuid,
        month: MonthKey,
        apply: &mut dyn FnMut(Option<MonthLockState>) -> MonthLockState,
    ) -> Result<MonthLockState>;
}

/// Membership lookup and the single capability query used for authorization.
pub trait MembershipDirectory: Send + Sync {
    fn roster(&self, unit_id: Uuid) -> Result<Option<MembershipRoster>>;

    fn has_role(&self, unit_id: Uuid, member_id: Uuid, role: Role) -> Result<bool> {
        Ok(self
            .roster(unit_id)?
            .map(|roster| roster.has_role(member_id, role))
            .unwrap_or(false))
    }

    /// Manager or Admin: may submit ledger records and change lock state.
    fn can_manage(&self, unit_id: Uuid, member_id: Uuid) -> Result<bool> {
        Ok(self.has_role(unit_id, member_id, Role::Manager)?
            || self.has_role(unit_id, member_id, Role::Admin)?)
    }
}

fn edit_book<S, F, T>(store: &S, unit_id: Uuid, month: MonthKey, apply: F) -> Result<T>
where
    S: BookStore + ?Sized,
    F: FnOnce(&mut MonthBook) -> T,
{
    let mut apply = Some(apply);
    let mut out = None;
    store.update_book(unit_id, month, &mut |book| {
        if let Some(apply) = apply.take() {
            out = Some(apply(book));
        }
    })?;
    out.ok_or_else(|| {
        LedgerError::InvalidRef(format!("book {unit_id} / {month} was not updated"))
    })
}

/// Scans every stored month of the unit until `pick` finds something.
fn find_in_books<S, F, T>(store: &S, unit_id: Uuid, mut pick: F) -> Result<Option<(MonthKey, T)>>
where
    S: BookStore + ?Sized,
    F: FnMut(&MonthBook) -> Option<T>,
{
    for month in store.months(unit_id)? {
        if let Some(book) = store.load_book(unit_id, month)? {
            if let Some(found) = pick(&book) {
                return Ok(Some((month, found)));
            }
        }
    }
    Ok(None)
}

fn upsert_by_id<T, K: PartialEq>(items: &mut Vec<T>, item: T, key: impl Fn(&T) -> K) {
    let wanted = key(&item);
    match items.iter_mut().find(|existing| key(existing) == wanted) {
        Some(existing) => *existing = item,
        None => items.push(item),
    }
}

fn book_field<S, T>(
    store: &S,
    unit_id: Uuid,
    month: MonthKey,
    field: impl FnOnce(MonthBook) -> Vec<T>,
) -> Result<Vec<T>>
where
    S: BookStore + ?Sized,
{
    Ok(store.load_book(unit_id, month)?.map(field).unwrap_or_default())
}

impl<S: BookStore> RecordStore for S {
    fn shared_costs(&self, unit_id: Uuid, month: MonthKey) -> Result<Vec<SharedCostEntry>> {
        book_field(self, unit_id, month, |book| book.shared_costs)
    }

    fn payments(&self, unit_id: Uuid, month: MonthKey) -> Result<Vec<CashPayment>> {
        book_field(self, unit_id, month, |book| book.payments)
    }

    fn purchases(&self, unit_id: Uuid, month: MonthKey) -> Result<Vec<GroceryPurchase>> {
        book_field(self, unit_id, month, |book| book.purchases)
    }

    fn meals(&self, unit_id: Uuid, month: MonthKey) -> Result<Vec<DailyMealRecord>> {
        book_field(self, unit_id, month, |book| book.meals)
    }

    fn shared_cost(&self, unit_id: Uuid, id: Uuid) -> Result<Option<SharedCostEntry>> {
        let found = find_in_books(self, unit_id, |book| {
            book.shared_costs.iter().find(|c| c.id == id).cloned()
        })?;
        Ok(found.map(|(_, cost)| cost))
    }

    fn save_shared_cost(&self, entry: &SharedCostEntry) -> Result<()> {
        edit_book(self, entry.unit_id, entry.month, |book| {
            upsert_by_id(&mut book.shared_costs, entry.clone(), |c| c.id)
        })
    }

    fn remove_shared_cost(&self, unit_id: Uuid, id: Uuid) -> Result<Option<SharedCostEntry>> {
        let Some((month, _)) = find_in_books(self, unit_id, |book| {
            book.shared_costs.iter().position(|c| c.id == id)
        })?
        else {
            return Ok(None);
        };
        edit_book(self, unit_id, month, |book| {
            let index = book.shared_costs.iter().position(|c| c.id == id)?;
            Some(book.shared_costs.remove(index))
        })
    }

    fn payment(&self, unit_id: Uuid, id: Uuid) -> Result<Option<CashPayment>> {
        let found = find_in_books(self, unit_id, |book| {
            book.payments.iter().find(|p| p.id == id).cloned()
        })?;
        Ok(found.map(|(_, payment)| payment))
    }

    fn member_payments(&self, unit_id: Uuid, member_id: Uuid) -> Result<Vec<CashPayment>> {
        let mut found = Vec::new();
        for month in self.months(unit_id)? {
            if let Some(book) = self.load_book(unit_id, month)? {
                found.extend(book.payments.into_iter().filter(|p| p.member_id == member_id));
            }
        }
        Ok(found)
    }

    fn save_payment(&self, payment: &CashPayment) -> Result<()> {
        edit_book(self, payment.unit_id, payment.month, |book| {
            upsert_by_id(&mut book.payments, payment.clone(), |p| p.id)
        })
    }

    fn purchase(&self, unit_id: Uuid, id: Uuid) -> Result<Option<GroceryPurchase>> {
        let found = find_in_books(self, unit_id, |book| {
            book.purchases.iter().find(|p| p.id == id).cloned()
        })?;
        Ok(found.map(|(_, purchase)| purchase))
    }

    fn save_purchase(&self, purchase: &GroceryPurchase) -> Result<()> {
        edit_book(self, purchase.unit_id, purchase.month, |book| {
            upsert_by_id(&mut book.purchases, purchase.clone(), |p| p.id)
        })
    }

    fn remove_purchase(&self, unit_id: Uuid, id: Uuid) -> Result<Option<GroceryPurchase>> {
        let Some((month, _)) = find_in_books(self, unit_id, |book| {
            book.purchases.iter().position(|p| p.id == id)
        })?
        else {
            return Ok(None);
        };
        edit_book(self, unit_id, month, |book| {
            let index = book.purchases.iter().position(|p| p.id == id)?;
            Some(book.purchases.remove(index))
        })
    }

    fn upsert_meal(&self, record: &DailyMealRecord) -> Result<()> {
        edit_book(self, record.unit_id, record.month, |book| {
            book.upsert_meal(record.clone())
        })
    }

    fn replace_book(&self, book: &MonthBook) -> Result<()> {
        edit_book(self, book.unit_id, book.month, |stored| {
            let lock = book.lock.clone().or_else(|| stored.lock.take());
            *stored = book.clone();
            stored.lock = lock;
        })
    }
}

impl<S: BookStore> LockStore for S {
    fn get_lock(&self, unit_id: Uuid, month: MonthKey) -> Result<Option<MonthLockState>> {
        Ok(self.load_book(unit_id, month)?.and_then(|book| book.lock))
    }

    fn upsert_lock(&self, state: &MonthLockState) -> Result<()> {
        edit_book(self, state.unit_id, state.month, |book| {
            book.lock = Some(state.clone());
        })
    }

    fn update_lock(
        &self,
        unit_id: Uuid,
        month: MonthKey,
        apply: &mut dyn FnMut(Option<MonthLockState>) -> MonthLockState,
    ) -> Result<MonthLockState> {
        edit_book(self, unit_id, month, |book| {
            let next = apply(book.lock.take());
            book.lock = Some(next.clone());
            next
        })
    }
}

impl<S: BookStore> MembershipDirectory for S {
    fn roster(&self, unit_id: Uuid) -> Result<Option<MembershipRoster>> {
        self.load_roster(unit_id)
    }
}
