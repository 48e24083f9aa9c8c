use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::debt::Debt;
use crate::decimal::Money;
use crate::errors::Result;
use crate::payment::Payment;
use crate::schedule::{Allocation, PaymentAllocator, ScheduleBuilder, ScheduleSlot};
use crate::types::{CounterpartyId, Currency, DebtId};

/// an installment falling inside a query window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueInstallment {
    pub debt_id: DebtId,
    pub counterparty_id: CounterpartyId,
    pub payment_number: u32,
    pub due_date: DateTime<Utc>,
    pub amount_due: Money,
    pub currency: Currency,
}

impl DueInstallment {
    fn from_slot(debt: &Debt, slot: &ScheduleSlot) -> Self {
        Self {
            debt_id: debt.id,
            counterparty_id: debt.counterparty_id,
            payment_number: slot.payment_number,
            due_date: slot.due_date,
            amount_due: slot.remaining_amount,
            currency: debt.currency.clone(),
        }
    }
}

fn window_end(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now.checked_add_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// schedule of `debt` with `payments` applied
pub fn allocate(debt: &Debt, payments: &[Payment]) -> Result<Allocation> {
    let slots = ScheduleBuilder::build(&debt.plan)?;
    PaymentAllocator::allocate(slots, payments)
}

/// balance outstanding past the due date
pub fn is_overdue(debt: &Debt, now: DateTime<Utc>) -> bool {
    !debt.is_archived() && debt.has_balance() && debt.due_date() < now
}

/// balance outstanding and the due date within `days` from now
pub fn is_due_soon(debt: &Debt, now: DateTime<Utc>, days: u32) -> bool {
    !debt.is_archived()
        && debt.has_balance()
        && debt.due_date() >= now
        && debt.due_date() <= window_end(now, days)
}

/// pending installments due after `now` and at most `days` out
pub fn upcoming_installments(
    debt: &Debt,
    payments: &[Payment],
    now: DateTime<Utc>,
    days: u32,
) -> Result<Vec<DueInstallment>> {
    if debt.is_archived() {
        return Ok(Vec::new());
    }

    let end = window_end(now, days);
    let allocation = allocate(debt, payments)?;
    Ok(allocation
        .pending()
        .filter(|s| s.due_date > now && s.due_date <= end)
        .map(|s| DueInstallment::from_slot(debt, s))
        .collect())
}

/// pending installments whose due date has passed
pub fn overdue_installments(
    debt: &Debt,
    payments: &[Payment],
    now: DateTime<Utc>,
) -> Result<Vec<DueInstallment>> {
    if debt.is_archived() {
        return Ok(Vec::new());
    }

    let allocation = allocate(debt, payments)?;
    Ok(allocation
        .pending()
        .filter(|s| s.due_date < now)
        .map(|s| DueInstallment::from_slot(debt, s))
        .collect())
}
