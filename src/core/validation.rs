//! Write-time checks shared by the mutation paths and the test suite.

use std::collections::HashSet;

use uuid::Uuid;

use crate::domain::{DailyMealRecord, Identifiable, MonthBook, MonthScoped, SharedCostEntry};

/// Allowed gap between a shared cost and the sum of its custom shares.
pub const SHARE_EPSILON: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    NonPositiveAmount(f64),
    BlankName,
    NegativeShare { amount: f64 },
    DuplicateShare,
    ShareSumMismatch { expected: f64, actual: f64 },
    MealOutsideMonth,
    RecordOutsideBook { id: Uuid },
    DuplicateRecordId(Uuid),
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationIssue::NonPositiveAmount(amount) => {
                write!(f, "amount must be positive, got {amount}")
            }
            ValidationIssue::BlankName => f.write_str("name must not be blank"),
            ValidationIssue::NegativeShare { amount } => {
                write!(f, "share amounts must not be negative, got {amount}")
            }
            ValidationIssue::DuplicateShare => f.write_str("member listed twice in shares"),
            ValidationIssue::ShareSumMismatch { expected, actual } => write!(
                f,
                "sum of shares must equal total amount (expected {expected:.2}, got {actual:.2})"
            ),
            ValidationIssue::MealOutsideMonth => {
                f.write_str("meal date does not fall inside the record month")
            }
            ValidationIssue::RecordOutsideBook { id } => {
                write!(f, "record {id} belongs to another unit or month")
            }
            ValidationIssue::DuplicateRecordId(id) => write!(f, "record id {id} appears twice"),
        }
    }
}

/// True when `shares` sum to `amount` within `tolerance`.
pub fn shares_balance(amount: f64, shares_total: f64, tolerance: f64) -> bool {
    (amount - shares_total).abs() <= tolerance
}

/// Validates a shared cost before it is accepted into the books.
pub fn validate_shared_cost(entry: &SharedCostEntry, tolerance: f64) -> Result<(), ValidationIssue> {
    if entry.name.trim().is_empty() {
        return Err(ValidationIssue::BlankName);
    }
    validate_amount(entry.amount)?;
    if entry.shares.is_empty() {
        return Ok(());
    }

    let mut seen = HashSet::new();
    let mut total = 0.0;
    for share in &entry.shares {
        if share.amount < 0.0 {
            return Err(ValidationIssue::NegativeShare {
                amount: share.amount,
            });
        }
        if !seen.insert(share.member_id) {
            return Err(ValidationIssue::DuplicateShare);
        }
        total += share.amount;
    }
    if !shares_balance(entry.amount, total, tolerance) {
        return Err(ValidationIssue::ShareSumMismatch {
            expected: entry.amount,
            actual: total,
        });
    }
    Ok(())
}

pub fn validate_amount(amount: f64) -> Result<(), ValidationIssue> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ValidationIssue::NonPositiveAmount(amount));
    }
    Ok(())
}

pub fn validate_meal(record: &DailyMealRecord) -> Result<(), ValidationIssue> {
    if !record.month.contains(record.date) {
        return Err(ValidationIssue::MealOutsideMonth);
    }
    Ok(())
}

/// Runs the per-record checks over a whole book and confirms every record is keyed to it.
pub fn validate_book(book: &MonthBook, tolerance: f64) -> Result<(), ValidationIssue> {
    check_scoped(book, &book.shared_costs)?;
    check_scoped(book, &book.payments)?;
    check_scoped(book, &book.purchases)?;
    for entry in &book.shared_costs {
        validate_shared_cost(entry, tolerance)?;
    }
    for payment in &book.payments {
        validate_amount(payment.amount)?;
    }
    for purchase in &book.purchases {
        validate_amount(purchase.amount)?;
    }
    for meal in &book.meals {
        if !meal.belongs_to(book.unit_id, book.month) {
            return Err(ValidationIssue::RecordOutsideBook { id: meal.member_id });
        }
        validate_meal(meal)?;
    }
    Ok(())
}

fn check_scoped<T: Identifiable + MonthScoped>(
    book: &MonthBook,
    records: &[T],
) -> Result<(), ValidationIssue> {
    let mut seen = HashSet::new();
    for record in records {
        if !record.belongs_to(book.unit_id, book.month) {
            return Err(ValidationIssue::RecordOutsideBook { id: record.id() });
        }
        if !seen.insert(record.id()) {
            return Err(ValidationIssue::DuplicateRecordId(record.id()));
        }
    }
    Ok(())
}
