use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::lock::MonthLockState;
use crate::domain::month::MonthKey;
use crate::domain::records::{CashPayment, DailyMealRecord, GroceryPurchase, SharedCostEntry};

/// One member's position for the month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemberSettlement {
    pub member_id: Uuid,
    pub name: String,
    pub meal_units: f64,
    pub meal_cost: f64,
    pub service_share: f64,
    pub grocery_spent: f64,
    pub house_paid: f64,
    pub meal_paid: f64,
    pub total_paid: f64,
    pub total_debit: f64,
    pub total_credit: f64,
    pub house_balance: f64,
    pub meal_balance: f64,
    pub net_balance: f64,
    /// Set for members no longer active who still have records this month.
    #[serde(default)]
    pub departed: bool,
}

impl MemberSettlement {
    /// Derives debit, credit and balances from the raw per-member totals.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        member_id: Uuid,
        name: String,
        meal_units: f64,
        meal_rate: f64,
        service_share: f64,
        grocery_spent: f64,
        house_paid: f64,
        meal_paid: f64,
        total_paid: f64,
    ) -> Self {
        let meal_cost = meal_units * meal_rate;
        let total_debit = service_share + meal_cost;
        let total_credit = house_paid + meal_paid;
        Self {
            member_id,
            name,
            meal_units,
            meal_cost,
            service_share,
            grocery_spent,
            house_paid,
            meal_paid,
            total_paid,
            total_debit,
            total_credit,
            house_balance: house_paid - service_share,
            meal_balance: meal_paid - meal_cost,
            net_balance: total_credit - total_debit,
            departed: false,
        }
    }

    pub fn owes(&self) -> bool {
        self.net_balance < 0.0
    }
}

/// Derived month summary; never the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettlementReport {
    pub unit_id: Uuid,
    pub month: MonthKey,
    pub total_service_cost: f64,
    pub total_grocery_cost: f64,
    pub meal_rate: f64,
    pub total_meal_units: f64,
    pub members: BTreeMap<Uuid, MemberSettlement>,
}

impl SettlementReport {
    pub fn empty(unit_id: Uuid, month: MonthKey) -> Self {
        Self {
            unit_id,
            month,
            total_service_cost: 0.0,
            total_grocery_cost: 0.0,
            meal_rate: 0.0,
            total_meal_units: 0.0,
            members: BTreeMap::new(),
        }
    }

    pub fn member(&self, id: Uuid) -> Option<&MemberSettlement> {
        self.members.get(&id)
    }

    pub fn total_service_share(&self) -> f64 {
        self.members.values().map(|m| m.service_share).sum()
    }
}

/// Snapshot of everything recorded for one unit and month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthBook {
    pub unit_id: Uuid,
    pub month: MonthKey,
    #[serde(default)]
    pub shared_costs: Vec<SharedCostEntry>,
    #[serde(default)]
    pub payments: Vec<CashPayment>,
    #[serde(default)]
    pub purchases: Vec<GroceryPurchase>,
    #[serde(default)]
    pub meals: Vec<DailyMealRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock: Option<MonthLockState>,
}

impl MonthBook {
    pub fn new(unit_id: Uuid, month: MonthKey) -> Self {
        Self {
            unit_id,
            month,
            shared_costs: Vec::new(),
            payments: Vec::new(),
            purchases: Vec::new(),
            meals: Vec::new(),
            lock: None,
        }
    }

    /// Inserts or replaces the meal record with the same (member, date) key.
    pub fn upsert_meal(&mut self, record: DailyMealRecord) {
        match self.meals.iter_mut().find(|m| m.key() == record.key()) {
            Some(existing) => *existing = record,
            None => self.meals.push(record),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::records::MealUnit;
    use chrono::NaiveDate;

    #[test]
    fn balances_are_derived_from_parts() {
        let settlement = MemberSettlement::from_parts(
            Uuid::new_v4(),
            "Sami".into(),
            10.0,
            10.0,
            300.0,
            0.0,
            250.0,
            50.0,
            300.0,
        );
        assert_eq!(settlement.meal_cost, 100.0);
        assert_eq!(settlement.total_debit, 400.0);
        assert_eq!(settlement.total_credit, 300.0);
        assert_eq!(settlement.house_balance, -50.0);
        assert_eq!(settlement.meal_balance, -50.0);
        assert_eq!(settlement.net_balance, -100.0);
        assert!(settlement.owes());
    }

    #[test]
    fn upsert_meal_replaces_same_day_entry() {
        let unit = Uuid::new_v4();
        let member = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
        let mut book = MonthBook::new(unit, MonthKey::of(date));
        book.upsert_meal(DailyMealRecord::new(unit, member, date).with_guests(3));
        book.upsert_meal(
            DailyMealRecord::new(unit, member, date).with_meals(
                MealUnit::Full,
                MealUnit::Skipped,
                MealUnit::Skipped,
            ),
        );
        assert_eq!(book.meals.len(), 1);
        assert_eq!(book.meals[0].daily_units(), 1.0);
    }
}
