//! quick start - minimal example to get started
use debt_ledger::{
    DebtService, DebtView, EngineConfig, EventStore, MemoryStore, Money, NewDebt, NewPayment,
    SafeTimeProvider, TimeSource, Uuid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    debt_ledger::telemetry::init_tracing();

    let service = DebtService::new(MemoryStore::new(), EngineConfig::default())?;
    let time = SafeTimeProvider::new(TimeSource::System);
    let mut events = EventStore::new();
    let owner = Uuid::new_v4();

    // lend 12,000 to a friend, repaid in 6 monthly installments
    let debt = service.create_debt(
        NewDebt::builder()
            .owner(owner)
            .counterparty(Uuid::new_v4())
            .total_amount(Money::from_major(12_000))
            .number_of_payments(6)
            .description("laptop loan")
            .build()?,
        &time,
        &mut events,
    )?;

    // first installment comes in
    service.record_payment(
        owner,
        NewPayment::builder()
            .debt_id(debt.id)
            .amount(Money::from_major(2_000))
            .payment_date(time.now())
            .build()?,
        &time,
        &mut events,
    )?;

    let debt = service.get_debt(owner, debt.id)?;
    println!("{}", DebtView::from_debt(&debt).to_json_pretty()?);
    println!("{} events emitted", events.events().len());

    Ok(())
}
