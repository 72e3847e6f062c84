use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::MonthScoped;
use crate::domain::month::MonthKey;

/// Persisted lock record for one (unit, month) key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthLockState {
    pub unit_id: Uuid,
    pub month: MonthKey,
    pub is_locked: bool,
    #[serde(default)]
    pub unlock_requested: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlock_expiry: Option<DateTime<Utc>>,
}

impl MonthLockState {
    pub fn new(unit_id: Uuid, month: MonthKey, is_locked: bool) -> Self {
        Self {
            unit_id,
            month,
            is_locked,
            unlock_requested: false,
            unlock_expiry: None,
        }
    }

    pub fn phase(&self) -> LockPhase {
        match (self.is_locked, self.unlock_requested) {
            (false, _) => LockPhase::Open,
            (true, false) => LockPhase::Locked,
            (true, true) => LockPhase::UnlockPending,
        }
    }

    /// True once a stamped auto-relock time has passed. Informational only.
    pub fn unlock_expired(&self, now: DateTime<Utc>) -> bool {
        !self.is_locked && self.unlock_expiry.map(|at| now >= at).unwrap_or(false)
    }
}

impl MonthScoped for MonthLockState {
    fn unit_id(&self) -> Uuid {
        self.unit_id
    }

    fn month(&self) -> MonthKey {
        self.month
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LockPhase {
    Open,
    Locked,
    UnlockPending,
}

impl LockPhase {
    /// Phase of a key with no lock record.
    pub fn of(state: Option<&MonthLockState>) -> Self {
        state.map(MonthLockState::phase).unwrap_or(LockPhase::Open)
    }

    pub fn accepts_writes(self) -> bool {
        self == LockPhase::Open
    }
}

impl fmt::Display for LockPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LockPhase::Open => "Open",
            LockPhase::Locked => "Locked",
            LockPhase::UnlockPending => "Unlock pending",
        };
        f.write_str(label)
    }
}
