//! time windows - overdue, due-soon and upcoming queries under controlled time
use chrono::{Duration, TimeZone, Utc};
use debt_ledger::{
    Cadence, DebtService, DebtType, EngineConfig, EventStore, MemoryStore, Money, NewDebt,
    SafeTimeProvider, TimeSource, Uuid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== time windows example ===\n");

    let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let time = SafeTimeProvider::new(TimeSource::Test(start));
    let controller = time.test_control().unwrap();

    let service = DebtService::new(MemoryStore::new(), EngineConfig::default())?;
    let mut events = EventStore::new();
    let owner = Uuid::new_v4();

    // weekly repayments owed to a friend
    service.create_debt(
        NewDebt::builder()
            .owner(owner)
            .counterparty(Uuid::new_v4())
            .debt_type(DebtType::IOwe)
            .total_amount(Money::from_major(900))
            .cadence(Cadence::Weekly)
            .number_of_payments(3)
            .build()?,
        &time,
        &mut events,
    )?;

    // one-off debt due in ten days
    service.create_debt(
        NewDebt::builder()
            .owner(owner)
            .counterparty(Uuid::new_v4())
            .total_amount(Money::from_major(2_500))
            .cadence(Cadence::OneTime)
            .due_date(start + Duration::days(10))
            .build()?,
        &time,
        &mut events,
    )?;

    for step in 0..4 {
        println!("-- {} --", time.now().format("%Y-%m-%d"));
        for upcoming in service.upcoming_payments(owner, Some(7), &time)? {
            println!(
                "upcoming: slot {} of {} due {} ({} {})",
                upcoming.payment_number,
                upcoming.debt_id,
                upcoming.due_date.format("%Y-%m-%d"),
                upcoming.amount_due,
                upcoming.currency
            );
        }
        for debt in service.due_soon_debts(owner, None, &time)? {
            println!("due soon: {} due {}", debt.id, debt.due_date().format("%Y-%m-%d"));
        }
        for debt in service.overdue_debts(owner, &time)? {
            println!("overdue: {} ({} remaining)", debt.id, debt.remaining_total());
        }
        if step < 3 {
            controller.advance(Duration::days(8));
        }
        println!();
    }

    Ok(())
}
