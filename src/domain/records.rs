//! Raw ledger records submitted independently for one housing unit and month.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::{Approvable, Identifiable, MonthScoped, NamedEntity};
use crate::domain::month::MonthKey;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
/// Approval state shared by costs, payments and purchases.
pub enum RecordStatus {
    #[default]
    Pending,
    Approved,
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Approved => "approved",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CostShare {
    pub member_id: Uuid,
    pub amount: f64,
}

impl CostShare {
    pub fn new(member_id: Uuid, amount: f64) -> Self {
        Self { member_id, amount }
    }
}

/// Household expense (utilities, rent, internet) split equally or by explicit shares.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SharedCostEntry {
    pub id: Uuid,
    pub unit_id: Uuid,
    pub month: MonthKey,
    pub name: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shares: Vec<CostShare>,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Uuid>,
}

impl SharedCostEntry {
    pub fn new(unit_id: Uuid, month: MonthKey, name: impl Into<String>, amount: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            unit_id,
            month,
            name: name.into(),
            amount,
            shares: Vec::new(),
            status: RecordStatus::Pending,
            created_by: None,
        }
    }

    pub fn with_shares(mut self, shares: Vec<CostShare>) -> Self {
        self.shares = shares;
        self
    }

    pub fn approved(mut self) -> Self {
        self.status = RecordStatus::Approved;
        self
    }

    pub fn is_custom_split(&self) -> bool {
        !self.shares.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    /// Rent and bills.
    House,
    /// Groceries and meals.
    Meal,
}

impl fmt::Display for PaymentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentKind::House => "house",
            PaymentKind::Meal => "meal",
        };
        f.write_str(label)
    }
}

/// Money a member contributed to the common fund.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CashPayment {
    pub id: Uuid,
    pub unit_id: Uuid,
    pub member_id: Uuid,
    pub month: MonthKey,
    pub amount: f64,
    pub kind: PaymentKind,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<Uuid>,
}

impl CashPayment {
    pub fn new(
        unit_id: Uuid,
        member_id: Uuid,
        month: MonthKey,
        amount: f64,
        kind: PaymentKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            unit_id,
            member_id,
            month,
            amount,
            kind,
            status: RecordStatus::Pending,
            created_at: None,
            approved_by: None,
        }
    }

    pub fn approved(mut self) -> Self {
        self.status = RecordStatus::Approved;
        self
    }
}

/// Grocery shopping paid out of the common fund on the household's behalf.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroceryPurchase {
    pub id: Uuid,
    pub unit_id: Uuid,
    pub buyer_id: Uuid,
    pub month: MonthKey,
    pub amount: f64,
    #[serde(default)]
    pub items: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub status: RecordStatus,
}

impl GroceryPurchase {
    pub fn new(unit_id: Uuid, buyer_id: Uuid, month: MonthKey, amount: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            unit_id,
            buyer_id,
            month,
            amount,
            items: String::new(),
            date: None,
            status: RecordStatus::Pending,
        }
    }

    pub fn with_items(mut self, items: impl Into<String>) -> Self {
        self.items = items.into();
        self
    }

    pub fn approved(mut self) -> Self {
        self.status = RecordStatus::Approved;
        self
    }
}

/// A single breakfast/lunch/dinner entry: skipped, half or full.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(try_from = "f64", into = "f64")]
pub enum MealUnit {
    #[default]
    Skipped,
    Half,
    Full,
}

impl MealUnit {
    pub fn value(self) -> f64 {
        match self {
            MealUnit::Skipped => 0.0,
            MealUnit::Half => 0.5,
            MealUnit::Full => 1.0,
        }
    }
}

impl TryFrom<f64> for MealUnit {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if value == 0.0 {
            Ok(MealUnit::Skipped)
        } else if value == 0.5 {
            Ok(MealUnit::Half)
        } else if value == 1.0 {
            Ok(MealUnit::Full)
        } else {
            Err(format!("meal unit must be 0, 0.5 or 1, got {value}"))
        }
    }
}

impl From<MealUnit> for f64 {
    fn from(unit: MealUnit) -> Self {
        unit.value()
    }
}

/// Meals one member ate on one day. Keyed by (member, date); later writes replace earlier ones.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyMealRecord {
    pub unit_id: Uuid,
    pub member_id: Uuid,
    pub date: NaiveDate,
    pub month: MonthKey,
    #[serde(default)]
    pub breakfast: MealUnit,
    #[serde(default)]
    pub lunch: MealUnit,
    #[serde(default)]
    pub dinner: MealUnit,
    #[serde(default)]
    pub guest_meals: u32,
}

impl DailyMealRecord {
    pub fn new(unit_id: Uuid, member_id: Uuid, date: NaiveDate) -> Self {
        Self {
            unit_id,
            member_id,
            date,
            month: MonthKey::of(date),
            breakfast: MealUnit::Skipped,
            lunch: MealUnit::Skipped,
            dinner: MealUnit::Skipped,
            guest_meals: 0,
        }
    }

    pub fn with_meals(mut self, breakfast: MealUnit, lunch: MealUnit, dinner: MealUnit) -> Self {
        self.breakfast = breakfast;
        self.lunch = lunch;
        self.dinner = dinner;
        self
    }

    pub fn with_guests(mut self, guest_meals: u32) -> Self {
        self.guest_meals = guest_meals;
        self
    }

    pub fn key(&self) -> (Uuid, NaiveDate) {
        (self.member_id, self.date)
    }

    pub fn daily_units(&self) -> f64 {
        self.breakfast.value() + self.lunch.value() + self.dinner.value() + self.guest_meals as f64
    }
}

macro_rules! impl_record_traits {
    ($ty:ty) => {
        impl Identifiable for $ty {
            fn id(&self) -> Uuid {
                self.id
            }
        }

        impl MonthScoped for $ty {
            fn unit_id(&self) -> Uuid {
                self.unit_id
            }

            fn month(&self) -> MonthKey {
                self.month
            }
        }

        impl Approvable for $ty {
            fn status(&self) -> RecordStatus {
                self.status
            }

            fn set_status(&mut self, status: RecordStatus) {
                self.status = status;
            }
        }
    };
}

impl_record_traits!(SharedCostEntry);
impl_record_traits!(CashPayment);
impl_record_traits!(GroceryPurchase);

impl MonthScoped for DailyMealRecord {
    fn unit_id(&self) -> Uuid {
        self.unit_id
    }

    fn month(&self) -> MonthKey {
        self.month
    }
}

impl NamedEntity for SharedCostEntry {
    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meal_units_reject_values_outside_the_set() {
        assert_eq!(MealUnit::try_from(0.5), Ok(MealUnit::Half));
        assert!(MealUnit::try_from(0.75).is_err());
        assert!(serde_json::from_str::<MealUnit>("2").is_err());
        assert_eq!(serde_json::to_string(&MealUnit::Full).unwrap(), "1.0");
    }

    #[test]
    fn daily_units_include_guest_meals() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 3).unwrap();
        let record = DailyMealRecord::new(Uuid::new_v4(), Uuid::new_v4(), date)
            .with_meals(MealUnit::Half, MealUnit::Full, MealUnit::Full)
            .with_guests(2);
        assert_eq!(record.daily_units(), 4.5);
        assert_eq!(record.month.to_string(), "2024-05");
    }

    #[test]
    fn new_records_start_pending() {
        let month = MonthKey::new(2024, 1).unwrap();
        let cost = SharedCostEntry::new(Uuid::new_v4(), month, "Gas", 1200.0);
        assert!(!cost.is_approved());
        assert!(cost.approved().is_approved());
    }
}
