mod common;

use std::fs;

use common::{json_storage, month, Household};
use mess_ledger::{
    domain::{CashPayment, GroceryPurchase, MealUnit, MonthBook, MonthKey, PaymentKind},
    errors::LedgerError,
    storage::{BookStore, JsonStorage, RecordStore},
};

#[test]
fn books_are_laid_out_per_unit_and_month() {
    let household = Household::new();
    let (storage, base) = json_storage(&household);
    let payment = CashPayment::new(
        household.unit_id,
        household.alice.id,
        month(),
        400.0,
        PaymentKind::House,
    )
    .approved();
    storage.save_payment(&payment).unwrap();

    let unit_dir = base.join("books").join(household.unit_id.to_string());
    assert!(unit_dir.join("roster.json").exists());
    assert!(unit_dir.join("2024-03.json").exists());
    assert_eq!(storage.book_path(household.unit_id, month()), unit_dir.join("2024-03.json"));

    let raw = fs::read_to_string(unit_dir.join("2024-03.json")).unwrap();
    assert!(raw.contains("\"month\": \"2024-03\""));
    assert!(raw.contains("\"status\": \"approved\""));
}

#[test]
fn records_are_found_by_id_across_months() {
    let household = Household::new();
    let (storage, _base) = json_storage(&household);
    let unit = household.unit_id;
    let april = MonthKey::new(2024, 4).unwrap();

    let march = GroceryPurchase::new(unit, household.bob.id, month(), 120.0);
    let later = GroceryPurchase::new(unit, household.bob.id, april, 80.0);
    storage.save_purchase(&march).unwrap();
    storage.save_purchase(&later).unwrap();

    assert_eq!(storage.months(unit).unwrap(), vec![month(), april]);
    assert_eq!(storage.purchase(unit, later.id).unwrap(), Some(later.clone()));

    let removed = storage.remove_purchase(unit, later.id).unwrap();
    assert_eq!(removed, Some(later));
    assert!(storage.purchases(unit, april).unwrap().is_empty());
    assert_eq!(storage.purchases(unit, month()).unwrap(), vec![march]);
}

#[test]
fn meal_upserts_replace_by_member_and_day() {
    let household = Household::new();
    let (storage, _base) = json_storage(&household);

    let full = (MealUnit::Full, MealUnit::Full, MealUnit::Full);
    storage
        .upsert_meal(&household.meal(&household.alice, 3, full))
        .unwrap();
    storage
        .upsert_meal(&household.meal(&household.bob, 3, full))
        .unwrap();
    storage
        .upsert_meal(&household.meal(
            &household.alice,
            3,
            (MealUnit::Skipped, MealUnit::Half, MealUnit::Skipped),
        ))
        .unwrap();

    let meals = storage.meals(household.unit_id, month()).unwrap();
    assert_eq!(meals.len(), 2);
    let alice: f64 = meals
        .iter()
        .filter(|m| m.member_id == household.alice.id)
        .map(|m| m.daily_units())
        .sum();
    assert_eq!(alice, 0.5);
}

#[test]
fn mismatched_book_contents_are_rejected() {
    let household = Household::new();
    let (storage, base) = json_storage(&household);
    let other = MonthBook::new(household.unit_id, MonthKey::new(2023, 12).unwrap());
    let path = storage.book_path(household.unit_id, month());
    fs::write(&path, serde_json::to_string(&other).unwrap()).unwrap();

    let err = storage.load_book(household.unit_id, month()).unwrap_err();
    assert!(matches!(err, LedgerError::InvalidRef(_)));

    // A fresh handle over the same directory sees the same files.
    let reopened = JsonStorage::new(Some(base)).unwrap();
    assert_eq!(reopened.load_roster(household.unit_id).unwrap(), Some(household.roster()));
}

#[test]
fn corrupt_book_surfaces_a_serde_error() {
    let household = Household::new();
    let (storage, _base) = json_storage(&household);
    let path = storage.book_path(household.unit_id, month());
    fs::write(&path, "{ not json").unwrap();

    let err = storage.payments(household.unit_id, month()).unwrap_err();
    assert!(matches!(err, LedgerError::Serde(_)));
}

#[test]
fn roster_for_another_unit_is_rejected() {
    let household = Household::new();
    let (storage, _base) = json_storage(&household);
    let stray = Household::new().roster();
    fs::write(
        storage.roster_path(household.unit_id),
        serde_json::to_string(&stray).unwrap(),
    )
    .unwrap();

    let err = storage.load_roster(household.unit_id).unwrap_err();
    assert!(matches!(err, LedgerError::InvalidRef(_)));

    // A hand-edited roster without a unit id loads as the nil unit.
    fs::write(storage.roster_path(household.unit_id), r#"{"members": []}"#).unwrap();
    assert!(matches!(
        storage.load_roster(household.unit_id),
        Err(LedgerError::InvalidRef(_))
    ));
}
