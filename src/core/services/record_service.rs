//! Mutation paths for ledger records and the lock workflow.
//!
//! Every write follows the same order: authorize the actor, check the month
//! lock, validate the record, then persist it.

use chrono::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::time::Clock;
use crate::core::validation::{
    validate_amount, validate_book, validate_meal, validate_shared_cost, SHARE_EPSILON,
};
use crate::domain::{
    Approvable, CashPayment, DailyMealRecord, GroceryPurchase, MembershipRoster, MonthBook,
    MonthKey, MonthLockState, RecordStatus, SettlementReport, SharedCostEntry,
};
use crate::storage::{LockStore, MembershipDirectory, RecordStore};

use super::{
    MonthLockService, ServiceError, ServiceResult, SettlementInputs, SettlementOptions,
    SettlementService,
};

/// Editable fields of a grocery purchase.
#[derive(Debug, Clone, Default)]
pub struct PurchaseUpdate {
    pub amount: Option<f64>,
    pub items: Option<String>,
    pub buyer_id: Option<Uuid>,
}

pub struct RecordService<'a> {
    records: &'a dyn RecordStore,
    locks: &'a dyn LockStore,
    directory: &'a dyn MembershipDirectory,
    clock: &'a dyn Clock,
    share_tolerance: f64,
    settlement: SettlementOptions,
}

impl<'a> RecordService<'a> {
    pub fn new(
        records: &'a dyn RecordStore,
        locks: &'a dyn LockStore,
        directory: &'a dyn MembershipDirectory,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            records,
            locks,
            directory,
            clock,
            share_tolerance: SHARE_EPSILON,
            settlement: SettlementOptions::default(),
        }
    }

    /// Uses one backend for records, locks and membership.
    pub fn over<S>(store: &'a S, clock: &'a dyn Clock) -> Self
    where
        S: RecordStore + LockStore + MembershipDirectory,
    {
        Self::new(store, store, store, clock)
    }

    pub fn with_share_tolerance(mut self, tolerance: f64) -> Self {
        self.share_tolerance = tolerance;
        self
    }

    pub fn with_settlement_options(mut self, options: SettlementOptions) -> Self {
        self.settlement = options;
        self
    }

    // --- shared costs ---

    pub fn add_shared_cost(
        &self,
        actor: Uuid,
        mut entry: SharedCostEntry,
    ) -> ServiceResult<SharedCostEntry> {
        self.require_manager(entry.unit_id, actor, "add shared costs")?;
        self.ensure_writable(entry.unit_id, entry.month)?;
        validate_shared_cost(&entry, self.share_tolerance)?;
        entry.created_by = Some(actor);
        entry.status = RecordStatus::Approved;
        self.records.save_shared_cost(&entry)?;
        info!(unit_id = %entry.unit_id, month = %entry.month, cost_id = %entry.id, amount = entry.amount, "shared cost added");
        Ok(entry)
    }

    pub fn delete_shared_cost(
        &self,
        actor: Uuid,
        unit_id: Uuid,
        cost_id: Uuid,
    ) -> ServiceResult<SharedCostEntry> {
        self.require_manager(unit_id, actor, "delete shared costs")?;
        let cost = self
            .records
            .shared_cost(unit_id, cost_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("shared cost {cost_id}")))?;
        self.ensure_writable(unit_id, cost.month)?;
        self.records.remove_shared_cost(unit_id, cost_id)?;
        info!(%unit_id, %cost_id, "shared cost deleted");
        Ok(cost)
    }

    // --- payments ---

    /// Managers record approved payments; members may submit their own for approval.
    pub fn submit_payment(
        &self,
        actor: Uuid,
        mut payment: CashPayment,
    ) -> ServiceResult<CashPayment> {
        if payment.member_id.is_nil() {
            payment.member_id = actor;
        }
        let status = self.submission_status(payment.unit_id, actor, payment.member_id, "payments")?;
        self.ensure_writable(payment.unit_id, payment.month)?;
        validate_amount(payment.amount)?;
        payment.status = status;
        payment.approved_by = (status == RecordStatus::Approved).then_some(actor);
        payment.created_at = Some(self.clock.now());
        self.records.save_payment(&payment)?;
        info!(unit_id = %payment.unit_id, month = %payment.month, payment_id = %payment.id, %status, "payment submitted");
        Ok(payment)
    }

    pub fn approve_payment(
        &self,
        actor: Uuid,
        unit_id: Uuid,
        payment_id: Uuid,
    ) -> ServiceResult<CashPayment> {
        self.require_manager(unit_id, actor, "approve payments")?;
        let mut payment = self
            .records
            .payment(unit_id, payment_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("payment {payment_id}")))?;
        self.ensure_writable(unit_id, payment.month)?;
        payment.set_status(RecordStatus::Approved);
        payment.approved_by = Some(actor);
        self.records.save_payment(&payment)?;
        info!(%unit_id, %payment_id, "payment approved");
        Ok(payment)
    }

    /// Payment history of one member across every stored month.
    pub fn member_payments(&self, unit_id: Uuid, member_id: Uuid) -> ServiceResult<Vec<CashPayment>> {
        Ok(self.records.member_payments(unit_id, member_id)?)
    }

    pub fn pending_payments(&self, unit_id: Uuid, month: MonthKey) -> ServiceResult<Vec<CashPayment>> {
        let mut payments = self.records.payments(unit_id, month)?;
        payments.retain(|p| !p.is_approved());
        Ok(payments)
    }

    // --- grocery purchases ---

    pub fn record_purchase(
        &self,
        actor: Uuid,
        mut purchase: GroceryPurchase,
    ) -> ServiceResult<GroceryPurchase> {
        if purchase.buyer_id.is_nil() {
            purchase.buyer_id = actor;
        }
        let status =
            self.submission_status(purchase.unit_id, actor, purchase.buyer_id, "grocery purchases")?;
        self.ensure_writable(purchase.unit_id, purchase.month)?;
        validate_amount(purchase.amount)?;
        purchase.status = status;
        if purchase.date.is_none() {
            purchase.date = Some(self.clock.today());
        }
        self.records.save_purchase(&purchase)?;
        info!(unit_id = %purchase.unit_id, month = %purchase.month, purchase_id = %purchase.id, %status, "grocery purchase recorded");
        Ok(purchase)
    }

    pub fn approve_purchase(
        &self,
        actor: Uuid,
        unit_id: Uuid,
        purchase_id: Uuid,
    ) -> ServiceResult<GroceryPurchase> {
        self.require_manager(unit_id, actor, "approve grocery purchases")?;
        let mut purchase = self.find_purchase(unit_id, purchase_id)?;
        self.ensure_writable(unit_id, purchase.month)?;
        purchase.set_status(RecordStatus::Approved);
        self.records.save_purchase(&purchase)?;
        info!(%unit_id, %purchase_id, "grocery purchase approved");
        Ok(purchase)
    }

    /// The buyer or a manager may edit amount, items and buyer.
    ///
    /// An amount or buyer change made by a non-manager sends the purchase back
    /// to the pending queue.
    pub fn update_purchase(
        &self,
        actor: Uuid,
        unit_id: Uuid,
        purchase_id: Uuid,
        changes: PurchaseUpdate,
    ) -> ServiceResult<GroceryPurchase> {
        let mut purchase = self.find_purchase(unit_id, purchase_id)?;
        self.require_owner_or_manager(unit_id, actor, purchase.buyer_id, "update this purchase")?;
        self.ensure_writable(unit_id, purchase.month)?;
        let mut needs_approval = false;
        if let Some(amount) = changes.amount {
            validate_amount(amount)?;
            needs_approval |= amount != purchase.amount;
            purchase.amount = amount;
        }
        if let Some(items) = changes.items {
            purchase.items = items;
        }
        if let Some(buyer_id) = changes.buyer_id {
            if self.roster(unit_id)?.member(buyer_id).is_none() {
                return Err(ServiceError::Validation(format!(
                    "buyer {buyer_id} is not a member of this unit"
                )));
            }
            needs_approval |= buyer_id != purchase.buyer_id;
            purchase.buyer_id = buyer_id;
        }
        if needs_approval && !self.directory.can_manage(unit_id, actor)? {
            purchase.set_status(RecordStatus::Pending);
        }
        self.records.save_purchase(&purchase)?;
        info!(%unit_id, %purchase_id, status = %purchase.status, "grocery purchase updated");
        Ok(purchase)
    }

    pub fn delete_purchase(
        &self,
        actor: Uuid,
        unit_id: Uuid,
        purchase_id: Uuid,
    ) -> ServiceResult<GroceryPurchase> {
        let purchase = self.find_purchase(unit_id, purchase_id)?;
        self.require_owner_or_manager(unit_id, actor, purchase.buyer_id, "delete this purchase")?;
        self.ensure_writable(unit_id, purchase.month)?;
        self.records.remove_purchase(unit_id, purchase_id)?;
        info!(%unit_id, %purchase_id, "grocery purchase deleted");
        Ok(purchase)
    }

    pub fn pending_purchases(
        &self,
        unit_id: Uuid,
        month: MonthKey,
    ) -> ServiceResult<Vec<GroceryPurchase>> {
        let mut purchases = self.records.purchases(unit_id, month)?;
        purchases.retain(|p| !p.is_approved());
        Ok(purchases)
    }

    // --- meals ---

    /// A member may log their own meals; managers may log anyone's.
    pub fn upsert_meal(&self, actor: Uuid, record: DailyMealRecord) -> ServiceResult<()> {
        self.require_owner_or_manager(record.unit_id, actor, record.member_id, "update these meals")?;
        self.ensure_writable(record.unit_id, record.month)?;
        validate_meal(&record)?;
        self.records.upsert_meal(&record)?;
        Ok(())
    }

    /// Manager-only bulk upsert for one unit. Returns the number of records written.
    pub fn batch_update_meals(
        &self,
        actor: Uuid,
        records: Vec<DailyMealRecord>,
    ) -> ServiceResult<usize> {
        let Some(first) = records.first() else {
            return Ok(0);
        };
        let unit_id = first.unit_id;
        self.require_manager(unit_id, actor, "update meals")?;

        let mut months: Vec<MonthKey> = Vec::new();
        for record in &records {
            if record.unit_id != unit_id {
                return Err(ServiceError::Validation(
                    "meal batch spans more than one housing unit".into(),
                ));
            }
            validate_meal(record)?;
            if !months.contains(&record.month) {
                months.push(record.month);
            }
        }
        for month in &months {
            self.ensure_writable(unit_id, *month)?;
        }

        for record in &records {
            self.records.upsert_meal(record)?;
        }
        info!(%unit_id, count = records.len(), "meal batch written");
        Ok(records.len())
    }

    // --- bulk import ---

    /// Manager-only restore of a whole month. A locked month is only replaced by a
    /// book carrying the same lock record.
    pub fn import_book(&self, actor: Uuid, book: MonthBook) -> ServiceResult<MonthBook> {
        let (unit_id, month) = (book.unit_id, book.month);
        self.require_manager(unit_id, actor, "import month books")?;
        if let Some(stored) = self.locks.get_lock(unit_id, month)? {
            if stored.is_locked && book.lock.as_ref() != Some(&stored) {
                warn!(%unit_id, %month, "rejected import over a locked month");
                return Err(ServiceError::MonthLocked {
                    unit: unit_id,
                    month,
                });
            }
        }
        validate_book(&book, self.share_tolerance)?;
        self.records.replace_book(&book)?;
        info!(
            %unit_id,
            %month,
            shared_costs = book.shared_costs.len(),
            payments = book.payments.len(),
            purchases = book.purchases.len(),
            meals = book.meals.len(),
            "month book imported"
        );
        Ok(book)
    }

    // --- month lock ---

    pub fn request_unlock(
        &self,
        actor: Uuid,
        unit_id: Uuid,
        month: MonthKey,
    ) -> ServiceResult<MonthLockState> {
        let roster = self.roster(unit_id)?;
        if roster.member(actor).is_none() {
            warn!(%unit_id, %actor, "unlock request from non-member rejected");
            return Err(ServiceError::Unauthorized(
                "only members can request an unlock".into(),
            ));
        }
        MonthLockService::request_unlock(self.locks, unit_id, month)
    }

    pub fn set_lock_status(
        &self,
        actor: Uuid,
        unit_id: Uuid,
        month: MonthKey,
        is_locked: bool,
        auto_relock_after: Option<Duration>,
    ) -> ServiceResult<MonthLockState> {
        self.require_manager(unit_id, actor, "change the month lock")?;
        MonthLockService::set_lock_status(
            self.locks,
            self.clock,
            unit_id,
            month,
            is_locked,
            auto_relock_after,
        )
    }

    pub fn lock_status(
        &self,
        unit_id: Uuid,
        month: MonthKey,
    ) -> ServiceResult<Option<MonthLockState>> {
        MonthLockService::status(self.locks, unit_id, month)
    }

    // --- reporting ---

    /// Loads a consistent snapshot for the month and settles it.
    pub fn monthly_report(&self, unit_id: Uuid, month: MonthKey) -> ServiceResult<SettlementReport> {
        let roster = self.roster(unit_id)?;
        let shared_costs = self.records.shared_costs(unit_id, month)?;
        let payments = self.records.payments(unit_id, month)?;
        let purchases = self.records.purchases(unit_id, month)?;
        let meals = self.records.meals(unit_id, month)?;
        let inputs = SettlementInputs {
            unit_id,
            month,
            roster: &roster,
            shared_costs: &shared_costs,
            payments: &payments,
            purchases: &purchases,
            meals: &meals,
        };
        Ok(SettlementService::compute_with(&inputs, self.settlement))
    }

    // --- helpers ---

    fn roster(&self, unit_id: Uuid) -> ServiceResult<MembershipRoster> {
        self.directory
            .roster(unit_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("housing unit {unit_id}")))
    }

    fn require_manager(&self, unit_id: Uuid, actor: Uuid, action: &str) -> ServiceResult<()> {
        if self.directory.can_manage(unit_id, actor)? {
            return Ok(());
        }
        warn!(%unit_id, %actor, action, "rejected: manager role required");
        Err(ServiceError::Unauthorized(format!(
            "only a manager or admin can {action}"
        )))
    }

    fn require_owner_or_manager(
        &self,
        unit_id: Uuid,
        actor: Uuid,
        owner: Uuid,
        action: &str,
    ) -> ServiceResult<()> {
        if actor == owner && self.is_active_member(unit_id, actor)? {
            return Ok(());
        }
        self.require_manager(unit_id, actor, action)
    }

    /// Approved for managers, pending for a member submitting on their own behalf.
    fn submission_status(
        &self,
        unit_id: Uuid,
        actor: Uuid,
        subject: Uuid,
        what: &str,
    ) -> ServiceResult<RecordStatus> {
        if self.directory.can_manage(unit_id, actor)? {
            return Ok(RecordStatus::Approved);
        }
        if actor == subject && self.is_active_member(unit_id, actor)? {
            return Ok(RecordStatus::Pending);
        }
        warn!(%unit_id, %actor, "rejected {what} submitted for another member");
        Err(ServiceError::Unauthorized(format!(
            "only a manager or admin can record {what} for other members"
        )))
    }

    fn is_active_member(&self, unit_id: Uuid, member_id: Uuid) -> ServiceResult<bool> {
        Ok(self
            .directory
            .roster(unit_id)?
            .and_then(|roster| roster.member(member_id).map(|m| m.is_active()))
            .unwrap_or(false))
    }

    fn ensure_writable(&self, unit_id: Uuid, month: MonthKey) -> ServiceResult<()> {
        MonthLockService::ensure_writable(self.locks, unit_id, month).map_err(|err| {
            warn!(%unit_id, %month, "rejected write to locked month");
            err
        })
    }

    fn find_purchase(&self, unit_id: Uuid, purchase_id: Uuid) -> ServiceResult<GroceryPurchase> {
        self.records
            .purchase(unit_id, purchase_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("grocery purchase {purchase_id}")))
    }
}
