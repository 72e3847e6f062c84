#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use mess_ledger::{
    core::time::FixedClock,
    domain::{DailyMealRecord, MealUnit, Member, MembershipRoster, MonthKey, Role},
    storage::{BookStore, JsonStorage, MemoryStore},
};
use once_cell::sync::Lazy;
use tempfile::TempDir;
use uuid::Uuid;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// A unit with one manager and two plain members.
pub struct Household {
    pub unit_id: Uuid,
    pub manager: Member,
    pub alice: Member,
    pub bob: Member,
}

impl Household {
    pub fn new() -> Self {
        Self {
            unit_id: Uuid::new_v4(),
            manager: Member::new(Uuid::new_v4(), "Rafi").with_role(Role::Manager),
            alice: Member::new(Uuid::new_v4(), "Alice"),
            bob: Member::new(Uuid::new_v4(), "Bob"),
        }
    }

    pub fn roster(&self) -> MembershipRoster {
        MembershipRoster::new(
            self.unit_id,
            vec![self.manager.clone(), self.alice.clone(), self.bob.clone()],
        )
    }

    pub fn memory_store(&self) -> MemoryStore {
        MemoryStore::with_roster(self.roster())
    }

    /// One day of breakfast, lunch and dinner for `member`.
    pub fn meal(&self, member: &Member, day: u32, meals: (MealUnit, MealUnit, MealUnit)) -> DailyMealRecord {
        DailyMealRecord::new(self.unit_id, member.id, date(day)).with_meals(meals.0, meals.1, meals.2)
    }
}

pub fn month() -> MonthKey {
    MonthKey::new(2024, 3).expect("valid month")
}

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).expect("valid day")
}

pub fn instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap()
}

pub fn fixed_clock() -> FixedClock {
    FixedClock(instant())
}

/// Creates a unique directory that stays alive until the test binary exits.
pub fn temp_base() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

/// JSON storage rooted in a fresh temp directory, pre-loaded with the household roster.
pub fn json_storage(household: &Household) -> (JsonStorage, PathBuf) {
    let base = temp_base();
    let storage = JsonStorage::new(Some(base.clone())).expect("create json storage backend");
    storage
        .save_roster(&household.roster())
        .expect("save household roster");
    (storage, base)
}
