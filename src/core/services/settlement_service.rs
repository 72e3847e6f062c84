//! Monthly settlement: turns a unit-month snapshot into per-member positions.
//!
//! The computation is a pure function of its inputs. Records are visited in a
//! fixed order so repeated calls produce bit-identical floating point output.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{
    Approvable, CashPayment, DailyMealRecord, GroceryPurchase, MemberSettlement,
    MembershipRoster, MonthBook, MonthKey, MonthScoped, NamedEntity, PaymentKind,
    SettlementReport, SharedCostEntry, UNKNOWN_MEMBER_NAME,
};

/// Borrowed snapshot of everything the settlement needs.
#[derive(Debug, Clone, Copy)]
pub struct SettlementInputs<'a> {
    pub unit_id: Uuid,
    pub month: MonthKey,
    pub roster: &'a MembershipRoster,
    pub shared_costs: &'a [SharedCostEntry],
    pub payments: &'a [CashPayment],
    pub purchases: &'a [GroceryPurchase],
    pub meals: &'a [DailyMealRecord],
}

impl<'a> SettlementInputs<'a> {
    pub fn from_book(roster: &'a MembershipRoster, book: &'a MonthBook) -> Self {
        Self {
            unit_id: book.unit_id,
            month: book.month,
            roster,
            shared_costs: &book.shared_costs,
            payments: &book.payments,
            purchases: &book.purchases,
            meals: &book.meals,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettlementOptions {
    /// Also report members who are no longer active but have records this month.
    pub include_departed: bool,
}

#[derive(Debug, Default)]
struct MemberTally {
    meal_units: f64,
    service_share: f64,
    grocery_spent: f64,
    house_paid: f64,
    meal_paid: f64,
    total_paid: f64,
}

pub struct SettlementService;

impl SettlementService {
    pub fn compute(inputs: &SettlementInputs<'_>) -> SettlementReport {
        Self::compute_with(inputs, SettlementOptions::default())
    }

    pub fn compute_with(
        inputs: &SettlementInputs<'_>,
        options: SettlementOptions,
    ) -> SettlementReport {
        let unit_id = inputs.unit_id;
        let month = inputs.month;
        let active_count = inputs.roster.active_count();
        if active_count == 0 && !options.include_departed {
            debug!(%unit_id, %month, "no active members; returning empty settlement");
            return SettlementReport::empty(unit_id, month);
        }

        let mut tallies: BTreeMap<Uuid, MemberTally> = BTreeMap::new();
        let mut report = SettlementReport::empty(unit_id, month);

        // Meal units: the last record for a (member, date) key wins.
        let mut meals_by_day: BTreeMap<(Uuid, NaiveDate), &DailyMealRecord> = BTreeMap::new();
        for record in in_scope(inputs.meals, unit_id, month, "meal record") {
            meals_by_day.insert(record.key(), record);
        }
        for ((member_id, _), record) in &meals_by_day {
            let units = record.daily_units();
            tallies.entry(*member_id).or_default().meal_units += units;
            report.total_meal_units += units;
        }

        for purchase in approved(inputs.purchases, unit_id, month, "grocery purchase") {
            tallies.entry(purchase.buyer_id).or_default().grocery_spent += purchase.amount;
            report.total_grocery_cost += purchase.amount;
        }

        report.meal_rate = if report.total_meal_units > 0.0 {
            report.total_grocery_cost / report.total_meal_units
        } else {
            0.0
        };

        let active_ids: Vec<Uuid> = inputs.roster.active_members().map(|m| m.id).collect();
        let split_count = active_ids.len().max(1) as f64;
        for cost in approved(inputs.shared_costs, unit_id, month, "shared cost") {
            report.total_service_cost += cost.amount;
            if cost.is_custom_split() {
                for share in &cost.shares {
                    tallies.entry(share.member_id).or_default().service_share += share.amount;
                }
            } else {
                let split = cost.amount / split_count;
                for member_id in &active_ids {
                    tallies.entry(*member_id).or_default().service_share += split;
                }
            }
        }

        for payment in approved(inputs.payments, unit_id, month, "cash payment") {
            let tally = tallies.entry(payment.member_id).or_default();
            match payment.kind {
                PaymentKind::House => tally.house_paid += payment.amount,
                PaymentKind::Meal => tally.meal_paid += payment.amount,
            }
            tally.total_paid += payment.amount;
        }

        for member in inputs.roster.active_members() {
            let tally = tallies.remove(&member.id).unwrap_or_default();
            let settlement = settle(member.id, member.name().to_string(), &tally, report.meal_rate);
            report.members.insert(member.id, settlement);
        }

        if options.include_departed {
            for (member_id, tally) in &tallies {
                let name = inputs
                    .roster
                    .member(*member_id)
                    .map(|member| member.name().to_string())
                    .unwrap_or_else(|| UNKNOWN_MEMBER_NAME.to_string());
                let mut settlement = settle(*member_id, name, tally, report.meal_rate);
                settlement.departed = true;
                report.members.insert(*member_id, settlement);
            }
        }

        debug!(
            %unit_id,
            %month,
            members = report.members.len(),
            total_service_cost = report.total_service_cost,
            total_grocery_cost = report.total_grocery_cost,
            total_meal_units = report.total_meal_units,
            meal_rate = report.meal_rate,
            "settlement computed"
        );
        report
    }
}

fn settle(member_id: Uuid, name: String, tally: &MemberTally, meal_rate: f64) -> MemberSettlement {
    MemberSettlement::from_parts(
        member_id,
        name,
        tally.meal_units,
        meal_rate,
        tally.service_share,
        tally.grocery_spent,
        tally.house_paid,
        tally.meal_paid,
        tally.total_paid,
    )
}

fn in_scope<'a, T: MonthScoped>(
    records: &'a [T],
    unit_id: Uuid,
    month: MonthKey,
    kind: &'static str,
) -> impl Iterator<Item = &'a T> + 'a {
    records.iter().filter(move |record| {
        let keep = record.belongs_to(unit_id, month);
        if !keep {
            warn!(
                %unit_id,
                %month,
                record_unit = %record.unit_id(),
                record_month = %record.month(),
                "skipping {kind} outside the requested month"
            );
        }
        keep
    })
}

fn approved<'a, T: MonthScoped + Approvable>(
    records: &'a [T],
    unit_id: Uuid,
    month: MonthKey,
    kind: &'static str,
) -> impl Iterator<Item = &'a T> + 'a {
    in_scope(records, unit_id, month, kind).filter(|record| record.is_approved())
}
