mod common;

use common::{date, month, Household};
use mess_ledger::{
    core::validation::{shares_balance, validate_shared_cost, SHARE_EPSILON},
    domain::{
        CashPayment, CostShare, DailyMealRecord, GroceryPurchase, MealUnit, Member,
        MembershipRoster, PaymentKind, SharedCostEntry,
    },
    SettlementInputs, SettlementService,
};
use uuid::Uuid;

const FULL_DAY: (MealUnit, MealUnit, MealUnit) = (MealUnit::Full, MealUnit::Full, MealUnit::Full);
const TWO_MEALS: (MealUnit, MealUnit, MealUnit) =
    (MealUnit::Full, MealUnit::Full, MealUnit::Skipped);

fn inputs<'a>(
    household: &Household,
    roster: &'a MembershipRoster,
    shared_costs: &'a [SharedCostEntry],
    payments: &'a [CashPayment],
    purchases: &'a [GroceryPurchase],
    meals: &'a [DailyMealRecord],
) -> SettlementInputs<'a> {
    SettlementInputs {
        unit_id: household.unit_id,
        month: month(),
        roster,
        shared_costs,
        payments,
        purchases,
        meals,
    }
}

#[test]
fn zero_meal_units_give_zero_rate_and_costs() {
    let household = Household::new();
    let roster = household.roster();
    let purchases = vec![
        GroceryPurchase::new(household.unit_id, household.alice.id, month(), 450.0).approved(),
    ];
    let report = SettlementService::compute(&inputs(&household, &roster, &[], &[], &purchases, &[]));

    assert_eq!(report.total_meal_units, 0.0);
    assert_eq!(report.meal_rate, 0.0);
    assert_eq!(report.total_grocery_cost, 450.0);
    for member in report.members.values() {
        assert_eq!(member.meal_cost, 0.0);
        assert!(member.meal_cost.is_finite());
    }
    assert_eq!(report.member(household.alice.id).unwrap().grocery_spent, 450.0);
}

#[test]
fn custom_shares_conserve_the_cost_total() {
    let household = Household::new();
    let roster = household.roster();
    let costs = vec![
        SharedCostEntry::new(household.unit_id, month(), "Electricity", 1000.0)
            .with_shares(vec![
                CostShare::new(household.manager.id, 333.33),
                CostShare::new(household.alice.id, 333.33),
                CostShare::new(household.bob.id, 333.34),
            ])
            .approved(),
        SharedCostEntry::new(household.unit_id, month(), "Internet", 90.0)
            .with_shares(vec![
                CostShare::new(household.alice.id, 45.0),
                CostShare::new(household.bob.id, 45.05),
            ])
            .approved(),
    ];
    for cost in &costs {
        validate_shared_cost(cost, SHARE_EPSILON).expect("shares balance within epsilon");
    }

    let report = SettlementService::compute(&inputs(&household, &roster, &costs, &[], &[], &[]));
    let expected: f64 = costs.iter().map(|c| c.amount).sum();
    assert_eq!(report.total_service_cost, expected);
    assert!(shares_balance(expected, report.total_service_share(), SHARE_EPSILON));
}

#[test]
fn equal_split_divides_by_active_members() {
    let household = Household::new();
    let departed = Member::new(Uuid::new_v4(), "Moved out").inactive();
    let mut members = household.roster().members;
    members.push(departed.clone());
    let roster = MembershipRoster::new(household.unit_id, members);

    let amount = 1000.0;
    let costs = vec![SharedCostEntry::new(household.unit_id, month(), "Rent", amount).approved()];
    let report = SettlementService::compute(&inputs(&household, &roster, &costs, &[], &[], &[]));

    assert_eq!(report.members.len(), 3);
    assert!(report.member(departed.id).is_none());
    for member in report.members.values() {
        assert_eq!(member.service_share, amount / 3.0);
    }
    assert!((report.total_service_share() - amount).abs() < 1e-9);
}

#[test]
fn net_balance_is_credit_minus_debit_for_every_member() {
    let household = Household::new();
    let roster = household.roster();
    let unit = household.unit_id;
    let costs = vec![SharedCostEntry::new(unit, month(), "Gas", 1250.0).approved()];
    let payments = vec![
        CashPayment::new(unit, household.alice.id, month(), 600.0, PaymentKind::House).approved(),
        CashPayment::new(unit, household.alice.id, month(), 250.5, PaymentKind::Meal).approved(),
        CashPayment::new(unit, household.bob.id, month(), 100.0, PaymentKind::Meal).approved(),
    ];
    let purchases = vec![GroceryPurchase::new(unit, household.bob.id, month(), 777.0).approved()];
    let meals = vec![
        household.meal(&household.alice, 1, FULL_DAY),
        household.meal(&household.bob, 1, TWO_MEALS),
        household.meal(&household.manager, 2, (MealUnit::Half, MealUnit::Skipped, MealUnit::Full)),
    ];

    let report = SettlementService::compute(&inputs(
        &household, &roster, &costs, &payments, &purchases, &meals,
    ));

    for member in report.members.values() {
        assert_eq!(member.net_balance, member.total_credit - member.total_debit);
        assert_eq!(member.total_debit, member.service_share + member.meal_cost);
        assert_eq!(member.total_credit, member.house_paid + member.meal_paid);
    }
    let alice = report.member(household.alice.id).unwrap();
    assert_eq!(alice.house_paid, 600.0);
    assert_eq!(alice.meal_paid, 250.5);
    assert_eq!(alice.total_paid, 850.5);
}

#[test]
fn repeated_computation_is_identical() {
    let household = Household::new();
    let roster = household.roster();
    let unit = household.unit_id;
    let costs = vec![SharedCostEntry::new(unit, month(), "Water", 100.0).approved()];
    let purchases = vec![
        GroceryPurchase::new(unit, household.alice.id, month(), 123.45).approved(),
        GroceryPurchase::new(unit, household.bob.id, month(), 67.89).approved(),
    ];
    let meals: Vec<DailyMealRecord> = (1..=7)
        .flat_map(|day| {
            vec![
                household.meal(&household.alice, day, TWO_MEALS),
                household.meal(&household.bob, day, (MealUnit::Half, MealUnit::Full, MealUnit::Half)),
            ]
        })
        .collect();
    let snapshot = inputs(&household, &roster, &costs, &[], &purchases, &meals);

    let first = SettlementService::compute(&snapshot);
    let second = SettlementService::compute(&snapshot);
    assert_eq!(first, second);
    assert_eq!(first.meal_rate.to_bits(), second.meal_rate.to_bits());
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn single_member_scenario_settles_to_expected_totals() {
    let unit = Uuid::new_v4();
    let member = Member::new(Uuid::new_v4(), "Solo");
    let former = Member::new(Uuid::new_v4(), "Former").inactive();
    let roster = MembershipRoster::new(unit, vec![member.clone(), former.clone()]);

    let costs = vec![SharedCostEntry::new(unit, month(), "Rent", 300.0).approved()];
    let purchases = vec![
        GroceryPurchase::new(unit, member.id, month(), 200.0).approved(),
        GroceryPurchase::new(unit, former.id, month(), 100.0).approved(),
    ];
    // 10 units for the active member, 20 for the departed one: 30 in total.
    let mut meals = Vec::new();
    for day in 1..=5 {
        meals.push(DailyMealRecord::new(unit, member.id, date(day)).with_meals(
            TWO_MEALS.0,
            TWO_MEALS.1,
            TWO_MEALS.2,
        ));
    }
    for day in 1..=10 {
        meals.push(DailyMealRecord::new(unit, former.id, date(day)).with_meals(
            TWO_MEALS.0,
            TWO_MEALS.1,
            TWO_MEALS.2,
        ));
    }

    let report = SettlementService::compute(&SettlementInputs {
        unit_id: unit,
        month: month(),
        roster: &roster,
        shared_costs: &costs,
        payments: &[],
        purchases: &purchases,
        meals: &meals,
    });

    assert_eq!(report.total_grocery_cost, 300.0);
    assert_eq!(report.total_meal_units, 30.0);
    assert_eq!(report.meal_rate, 10.0);
    let settled = report.member(member.id).unwrap();
    assert_eq!(settled.service_share, 300.0);
    assert_eq!(settled.meal_units, 10.0);
    assert_eq!(settled.meal_cost, 100.0);
    assert_eq!(settled.total_debit, 400.0);
    assert_eq!(settled.net_balance, -400.0);
    assert!(settled.owes());
}

#[test]
fn pending_shared_cost_is_excluded() {
    let household = Household::new();
    let roster = household.roster();
    let costs = vec![
        SharedCostEntry::new(household.unit_id, month(), "Repairs", 500.0),
        SharedCostEntry::new(household.unit_id, month(), "Internet", 90.0).approved(),
    ];
    let report = SettlementService::compute(&inputs(&household, &roster, &costs, &[], &[], &[]));

    assert_eq!(report.total_service_cost, 90.0);
    for member in report.members.values() {
        assert_eq!(member.service_share, 30.0);
    }
}

#[test]
fn pending_payments_and_purchases_are_excluded() {
    let household = Household::new();
    let roster = household.roster();
    let unit = household.unit_id;
    let payments = vec![CashPayment::new(unit, household.bob.id, month(), 800.0, PaymentKind::House)];
    let purchases = vec![GroceryPurchase::new(unit, household.bob.id, month(), 300.0)];
    let meals = vec![household.meal(&household.bob, 3, FULL_DAY)];

    let report = SettlementService::compute(&inputs(
        &household, &roster, &[], &payments, &purchases, &meals,
    ));

    let bob = report.member(household.bob.id).unwrap();
    assert_eq!(bob.total_paid, 0.0);
    assert_eq!(bob.grocery_spent, 0.0);
    assert_eq!(report.meal_rate, 0.0);
    assert_eq!(bob.meal_units, 3.0);
}

#[test]
fn members_without_records_still_appear_with_zeroes() {
    let household = Household::new();
    let roster = household.roster();
    let report = SettlementService::compute(&inputs(&household, &roster, &[], &[], &[], &[]));

    assert_eq!(report.members.len(), 3);
    let bob = report.member(household.bob.id).unwrap();
    assert_eq!(bob.name, "Bob");
    assert_eq!(bob.net_balance, 0.0);
    assert!(!bob.owes());
}
