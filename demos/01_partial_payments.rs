//! partial payments - how payments fill installment slots in order
use chrono::{Duration, TimeZone, Utc};
use debt_ledger::{
    DebtService, EngineConfig, EventStore, MemoryStore, Money, NewDebt, NewPayment,
    SafeTimeProvider, ScheduleView, TimeSource, Uuid,
};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== partial payments example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));
    let controller = time.test_control().unwrap();

    let service = DebtService::new(MemoryStore::new(), EngineConfig::default())?;
    let mut events = EventStore::new();
    let owner = Uuid::new_v4();

    let debt = service.create_debt(
        NewDebt::builder()
            .owner(owner)
            .counterparty(Uuid::new_v4())
            .total_amount(Money::from(dec!(1000.00)))
            .number_of_payments(3)
            .build()?,
        &time,
        &mut events,
    )?;
    println!(
        "plan: {} x {} (last slot {})",
        debt.number_of_payments(),
        debt.installment_amount(),
        debt.plan.final_installment()
    );

    // small payments accumulate into the first slot, then spill into the next
    for amount in [dec!(150.00), dec!(150.00), dec!(100.00)] {
        controller.advance(Duration::days(10));
        service.record_payment(
            owner,
            NewPayment::builder()
                .debt_id(debt.id)
                .amount(Money::from(amount))
                .payment_date(time.now())
                .build()?,
            &time,
            &mut events,
        )?;
        println!("paid {} on {}", amount, time.now().format("%Y-%m-%d"));
    }

    let allocation = service.payment_schedule(owner, debt.id)?;
    for slot in &allocation.slots {
        println!(
            "slot {} due {}: scheduled {} paid {} remaining {} ({:?})",
            slot.payment_number,
            slot.due_date.format("%Y-%m-%d"),
            slot.scheduled_amount,
            slot.paid_amount,
            slot.remaining_amount,
            slot.status
        );
    }

    let summary = service.payment_summary(owner, debt.id)?;
    println!(
        "\npaid {} of {} ({}), {} installment(s) to go",
        summary.paid_total, summary.total_amount, summary.percentage_paid, summary.remaining_installments
    );

    let debt = service.get_debt(owner, debt.id)?;
    println!("\n{}", ScheduleView::from_allocation(&debt, &allocation).to_json_pretty()?);

    Ok(())
}
