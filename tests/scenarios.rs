use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Duration, TimeZone, Utc};
use debt_ledger::{
    Cadence, DebtService, DebtStatus, EngineConfig, EventStore, MemoryStore, Money,
    NewDebt, NewPayment, OwnerId, PlanBasis, SafeTimeProvider, SlotStatus, TimeSource, Uuid,
};
use rust_decimal_macros::dec;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
}

fn service() -> DebtService<MemoryStore> {
    DebtService::new(MemoryStore::new(), EngineConfig::default()).unwrap()
}

fn test_time() -> SafeTimeProvider {
    SafeTimeProvider::new(TimeSource::Test(start()))
}

fn four_monthly(owner: OwnerId) -> NewDebt {
    NewDebt::builder()
        .owner(owner)
        .counterparty(Uuid::new_v4())
        .total_amount(Money::from(dec!(1000.00)))
        .cadence(Cadence::Monthly)
        .number_of_payments(4)
        .build()
        .unwrap()
}

fn completed(debt_id: Uuid, amount: Money, time: &SafeTimeProvider) -> NewPayment {
    NewPayment::builder()
        .debt_id(debt_id)
        .amount(amount)
        .payment_date(time.now())
        .build()
        .unwrap()
}

#[test]
fn scenario_a_fresh_plan_is_all_pending() {
    let service = service();
    let time = test_time();
    let mut events = EventStore::new();
    let owner = Uuid::new_v4();

    let debt = service.create_debt(four_monthly(owner), &time, &mut events).unwrap();
    let schedule = service.payment_schedule(owner, debt.id).unwrap();

    assert_eq!(schedule.slots.len(), 4);
    for slot in &schedule.slots {
        assert_eq!(slot.scheduled_amount, Money::from(dec!(250.00)));
        assert_eq!(slot.status, SlotStatus::Pending);
    }
    assert_eq!(debt.remaining_total(), Money::from(dec!(1000.00)));
    assert_eq!(debt.status(), DebtStatus::Active);
}

#[test]
fn scenario_b_exact_installment_pays_first_slot() {
    let service = service();
    let time = test_time();
    let mut events = EventStore::new();
    let owner = Uuid::new_v4();

    let debt = service.create_debt(four_monthly(owner), &time, &mut events).unwrap();
    service
        .record_payment(owner, completed(debt.id, Money::from(dec!(250.00)), &time), &time, &mut events)
        .unwrap();

    let schedule = service.payment_schedule(owner, debt.id).unwrap();
    assert_eq!(schedule.slots[0].status, SlotStatus::Paid);
    assert!(schedule.slots[1..].iter().all(|s| s.status == SlotStatus::Pending));

    let debt = service.get_debt(owner, debt.id).unwrap();
    assert_eq!(debt.paid_total(), Money::from(dec!(250.00)));
    assert_eq!(debt.remaining_total(), Money::from(dec!(750.00)));
}

#[test]
fn scenario_c_partial_spills_into_second_slot() {
    let service = service();
    let time = test_time();
    let mut events = EventStore::new();
    let owner = Uuid::new_v4();

    let debt = service.create_debt(four_monthly(owner), &time, &mut events).unwrap();
    service
        .record_payment(owner, completed(debt.id, Money::from(dec!(400.00)), &time), &time, &mut events)
        .unwrap();

    let schedule = service.payment_schedule(owner, debt.id).unwrap();
    assert_eq!(schedule.slots[0].status, SlotStatus::Paid);
    assert_eq!(schedule.slots[1].paid_amount, Money::from(dec!(150.00)));
    assert_eq!(schedule.slots[1].remaining_amount, Money::from(dec!(100.00)));
    assert_eq!(schedule.slots[1].status, SlotStatus::Pending);
    assert_eq!(
        service.get_debt(owner, debt.id).unwrap().paid_total(),
        Money::from(dec!(400.00))
    );
}

#[test]
fn scenario_d_due_date_derives_payment_count() {
    let service = service();
    let time = test_time();
    let mut events = EventStore::new();
    let owner = Uuid::new_v4();

    let new_debt = NewDebt::builder()
        .owner(owner)
        .counterparty(Uuid::new_v4())
        .total_amount(Money::from(dec!(1000.00)))
        .cadence(Cadence::Monthly)
        .due_date(Utc.with_ymd_and_hms(2024, 5, 15, 10, 0, 0).unwrap())
        .build()
        .unwrap();
    let debt = service.create_debt(new_debt, &time, &mut events).unwrap();

    assert_eq!(debt.number_of_payments(), 4);
    assert_eq!(debt.installment_amount(), Money::from(dec!(250.00)));
    assert_eq!(debt.plan.basis, PlanBasis::DueDate);
}

#[test]
fn scenario_e_past_due_balance_is_overdue() {
    let service = service();
    let time = test_time();
    let mut events = EventStore::new();
    let owner = Uuid::new_v4();

    let debt = service.create_debt(four_monthly(owner), &time, &mut events).unwrap();
    service
        .record_payment(owner, completed(debt.id, Money::from(dec!(250.00)), &time), &time, &mut events)
        .unwrap();

    time.test_control().unwrap().advance(Duration::days(150));

    let overdue = service.overdue_debts(owner, &time).unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].id, debt.id);

    let late_slots = service.overdue_installments(owner, debt.id, &time).unwrap();
    assert_eq!(late_slots.len(), 3);

    // the cached status catches up once the ledger is refreshed
    assert_eq!(service.get_debt(owner, debt.id).unwrap().status(), DebtStatus::Active);
    let refreshed = service.refresh_ledger(owner, debt.id, &time, &mut events).unwrap();
    assert_eq!(refreshed.status(), DebtStatus::Overdue);
}

#[test]
fn scenario_f_weekly_due_dates_are_exact() {
    let service = service();
    let time = test_time();
    let mut events = EventStore::new();
    let owner = Uuid::new_v4();

    let new_debt = NewDebt::builder()
        .owner(owner)
        .counterparty(Uuid::new_v4())
        .total_amount(Money::from_major(300))
        .cadence(Cadence::Weekly)
        .number_of_payments(3)
        .build()
        .unwrap();
    let debt = service.create_debt(new_debt, &time, &mut events).unwrap();
    let schedule = service.payment_schedule(owner, debt.id).unwrap();

    let due: Vec<DateTime<Utc>> = schedule.slots.iter().map(|s| s.due_date).collect();
    assert_eq!(
        due,
        vec![
            start() + Duration::days(7),
            start() + Duration::days(14),
            start() + Duration::days(21),
        ]
    );
}

#[test]
fn overpayment_settles_and_reports_overflow() {
    let service = service();
    let time = test_time();
    let mut events = EventStore::new();
    let owner = Uuid::new_v4();

    let debt = service.create_debt(four_monthly(owner), &time, &mut events).unwrap();
    service
        .record_payment(owner, completed(debt.id, Money::from(dec!(1100.00)), &time), &time, &mut events)
        .unwrap();

    let debt = service.get_debt(owner, debt.id).unwrap();
    assert_eq!(debt.status(), DebtStatus::Settled);
    assert_eq!(debt.paid_total(), Money::from(dec!(1100.00)));
    assert_eq!(debt.remaining_total(), Money::ZERO);

    let schedule = service.payment_schedule(owner, debt.id).unwrap();
    assert_eq!(schedule.paid_in_slots(), Money::from(dec!(1000.00)));
    assert_eq!(schedule.overflow, Money::from(dec!(100.00)));
}

#[test]
fn concurrent_payments_all_land_in_the_ledger() {
    let service = Arc::new(service());
    let time = test_time();
    let mut events = EventStore::new();
    let owner = Uuid::new_v4();

    let debt = service.create_debt(four_monthly(owner), &time, &mut events).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            let debt_id = debt.id;
            thread::spawn(move || {
                let time = SafeTimeProvider::new(TimeSource::Test(start()));
                let mut events = EventStore::new();
                for _ in 0..5 {
                    let payment = completed(debt_id, Money::from(dec!(10.00)), &time);
                    // every call succeeds even when its ledger write lost the race
                    service.record_payment(owner, payment, &time, &mut events).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // any ledger write that gave up is repaired by the next reconcile
    let final_time = test_time();
    let debt = service
        .refresh_ledger(owner, debt.id, &final_time, &mut events)
        .unwrap();

    assert_eq!(debt.paid_total(), Money::from(dec!(400.00)));
    assert_eq!(debt.remaining_total(), Money::from(dec!(600.00)));
    assert_eq!(service.list_payments(owner, debt.id).unwrap().len(), 40);
}
