//! Month lock workflow: lock, unlock request, approval with optional auto-relock stamp.
//!
//! The controller is advisory. Mutation paths call [`MonthLockService::ensure_writable`]
//! before writing; nothing here schedules the relock once `unlock_expiry` passes.

use chrono::Duration;
use tracing::info;
use uuid::Uuid;

use crate::core::time::Clock;
use crate::domain::{LockPhase, MonthKey, MonthLockState};
use crate::storage::LockStore;

use super::{ServiceError, ServiceResult};

pub struct MonthLockService;

impl MonthLockService {
    /// Flags a month for reopening. An absent record is created locked with the request set.
    pub fn request_unlock(
        store: &dyn LockStore,
        unit_id: Uuid,
        month: MonthKey,
    ) -> ServiceResult<MonthLockState> {
        let state = store.update_lock(unit_id, month, &mut |current| {
            let mut state = current.unwrap_or_else(|| MonthLockState::new(unit_id, month, true));
            state.unlock_requested = true;
            state
        })?;
        info!(%unit_id, %month, phase = %state.phase(), "unlock requested");
        Ok(state)
    }

    /// Administrative lock change. Always answers any pending unlock request.
    pub fn set_lock_status(
        store: &dyn LockStore,
        clock: &dyn Clock,
        unit_id: Uuid,
        month: MonthKey,
        is_locked: bool,
        auto_relock_after: Option<Duration>,
    ) -> ServiceResult<MonthLockState> {
        let now = clock.now();
        let state = store.update_lock(unit_id, month, &mut |current| {
            let mut state =
                current.unwrap_or_else(|| MonthLockState::new(unit_id, month, is_locked));
            state.is_locked = is_locked;
            state.unlock_requested = false;
            if is_locked {
                state.unlock_expiry = None;
            } else if let Some(after) = auto_relock_after.filter(|d| *d > Duration::zero()) {
                state.unlock_expiry = Some(now + after);
            }
            state
        })?;
        info!(
            %unit_id,
            %month,
            is_locked,
            unlock_expiry = ?state.unlock_expiry,
            "lock status set"
        );
        Ok(state)
    }

    /// Returns the stored record, or `None` when the month has no lock history.
    pub fn status(
        store: &dyn LockStore,
        unit_id: Uuid,
        month: MonthKey,
    ) -> ServiceResult<Option<MonthLockState>> {
        Ok(store.get_lock(unit_id, month)?)
    }

    pub fn phase(store: &dyn LockStore, unit_id: Uuid, month: MonthKey) -> ServiceResult<LockPhase> {
        let state = store.get_lock(unit_id, month)?;
        Ok(LockPhase::of(state.as_ref()))
    }

    /// Rejects writes to a locked month. A month with no record is open.
    pub fn ensure_writable(
        store: &dyn LockStore,
        unit_id: Uuid,
        month: MonthKey,
    ) -> ServiceResult<()> {
        match store.get_lock(unit_id, month)? {
            Some(state) if state.is_locked => Err(ServiceError::MonthLocked {
                unit: unit_id,
                month,
            }),
            _ => Ok(()),
        }
    }
}
