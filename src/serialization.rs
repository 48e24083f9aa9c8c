//! serialization support for debts
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::debt::Debt;
use crate::decimal::{Money, Rate};
use crate::payment::Payment;
use crate::plan::PlanBasis;
use crate::schedule::{Allocation, ScheduleSlot};
use crate::types::{Cadence, CounterpartyId, Currency, DebtId, DebtStatus, DebtType, OwnerId};

/// serializable view of a debt and its cached ledger
#[derive(Debug, Serialize, Deserialize)]
pub struct DebtView {
    pub id: DebtId,
    pub owner_id: OwnerId,
    pub counterparty_id: CounterpartyId,
    pub debt_type: DebtType,
    pub status: DebtStatus,
    pub currency: Currency,
    pub plan: PlanView,
    pub ledger: LedgerView,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlanView {
    pub total_amount: Money,
    pub installment_amount: Money,
    pub final_installment: Money,
    pub number_of_payments: u32,
    pub cadence: Cadence,
    pub due_date: DateTime<Utc>,
    pub basis: PlanBasis,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LedgerView {
    pub paid_total: Money,
    pub remaining_total: Money,
    pub next_payment_date: DateTime<Utc>,
}

impl DebtView {
    pub fn from_debt(debt: &Debt) -> Self {
        DebtView {
            id: debt.id,
            owner_id: debt.owner_id,
            counterparty_id: debt.counterparty_id,
            debt_type: debt.debt_type,
            status: debt.status(),
            currency: debt.currency.clone(),
            plan: PlanView {
                total_amount: debt.plan.total_amount,
                installment_amount: debt.plan.installment_amount,
                final_installment: debt.plan.final_installment(),
                number_of_payments: debt.plan.number_of_payments,
                cadence: debt.plan.cadence,
                due_date: debt.plan.due_date,
                basis: debt.plan.basis,
            },
            ledger: LedgerView {
                paid_total: debt.ledger.paid_total,
                remaining_total: debt.ledger.remaining_total,
                next_payment_date: debt.ledger.next_payment_date,
            },
            description: debt.description.clone(),
            notes: debt.notes.clone(),
            created_at: debt.created_at,
            updated_at: debt.updated_at,
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// installment schedule of one debt with payments applied
#[derive(Debug, Serialize, Deserialize)]
pub struct ScheduleView {
    pub debt_id: DebtId,
    pub currency: Currency,
    pub slots: Vec<ScheduleSlot>,
    pub scheduled_total: Money,
    pub paid_in_slots: Money,
    /// paid beyond the final installment
    pub overflow: Money,
}

impl ScheduleView {
    pub fn from_allocation(debt: &Debt, allocation: &Allocation) -> Self {
        ScheduleView {
            debt_id: debt.id,
            currency: debt.currency.clone(),
            scheduled_total: allocation.slots.iter().map(|s| s.scheduled_amount).sum(),
            paid_in_slots: allocation.paid_in_slots(),
            slots: allocation.slots.clone(),
            overflow: allocation.overflow,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// payment progress of one debt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub debt_id: DebtId,
    pub currency: Currency,
    pub status: DebtStatus,
    pub total_amount: Money,
    pub paid_total: Money,
    pub remaining_total: Money,
    /// share of the total paid, capped at 100%
    pub percentage_paid: Rate,
    pub completed_payments: usize,
    pub installment_amount: Money,
    pub remaining_installments: u32,
    pub next_payment_date: Option<DateTime<Utc>>,
}

impl PaymentSummary {
    /// `allocation` is the debt's schedule with `payments` applied; its
    /// unpaid slots are the installments still owed
    pub fn from_debt(debt: &Debt, payments: &[Payment], allocation: &Allocation) -> Self {
        let percentage_paid = debt
            .paid_total()
            .ratio_of(debt.total_amount())
            .unwrap_or(Rate::ZERO)
            .min(Rate::ONE);

        PaymentSummary {
            debt_id: debt.id,
            currency: debt.currency.clone(),
            status: debt.status(),
            total_amount: debt.total_amount(),
            paid_total: debt.paid_total(),
            remaining_total: debt.remaining_total(),
            percentage_paid,
            completed_payments: payments.iter().filter(|p| p.is_completed()).count(),
            installment_amount: debt.installment_amount(),
            remaining_installments: allocation.pending().count() as u32,
            next_payment_date: debt.has_balance().then(|| debt.next_payment_date()),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
