use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{DebtError, Result};
use crate::ledger::Ledger;
use crate::plan::{PaymentPlan, PlanRequest};
use crate::types::{Cadence, CounterpartyId, Currency, DebtId, DebtStatus, DebtType, OwnerId};

/// an obligation between an owner and a counterparty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debt {
    pub id: DebtId,
    pub owner_id: OwnerId,
    pub counterparty_id: CounterpartyId,
    pub debt_type: DebtType,
    pub currency: Currency,
    pub plan: PaymentPlan,
    pub ledger: Ledger,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// bumped by the store on every write to the debt or its payments
    pub version: u64,
}

impl Debt {
    pub fn total_amount(&self) -> Money {
        self.plan.total_amount
    }

    pub fn installment_amount(&self) -> Money {
        self.plan.installment_amount
    }

    pub fn number_of_payments(&self) -> u32 {
        self.plan.number_of_payments
    }

    pub fn cadence(&self) -> Cadence {
        self.plan.cadence
    }

    pub fn due_date(&self) -> DateTime<Utc> {
        self.plan.due_date
    }

    pub fn status(&self) -> DebtStatus {
        self.ledger.status
    }

    pub fn paid_total(&self) -> Money {
        self.ledger.paid_total
    }

    pub fn remaining_total(&self) -> Money {
        self.ledger.remaining_total
    }

    pub fn next_payment_date(&self) -> DateTime<Utc> {
        self.ledger.next_payment_date
    }

    pub fn is_archived(&self) -> bool {
        self.ledger.status == DebtStatus::Archived
    }

    pub fn has_balance(&self) -> bool {
        self.ledger.remaining_total.is_positive()
    }
}

/// validated input for creating a debt
#[derive(Debug, Clone, PartialEq)]
pub struct NewDebt {
    pub owner_id: OwnerId,
    pub counterparty_id: CounterpartyId,
    pub debt_type: DebtType,
    pub total_amount: Money,
    pub currency: Option<Currency>,
    pub cadence: Cadence,
    pub due_date: Option<DateTime<Utc>>,
    pub number_of_payments: Option<u32>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl NewDebt {
    pub fn builder() -> NewDebtBuilder {
        NewDebtBuilder::new()
    }

    pub(crate) fn plan_request(
        &self,
        currency: Currency,
        created_at: DateTime<Utc>,
    ) -> PlanRequest {
        PlanRequest {
            total_amount: self.total_amount,
            cadence: self.cadence,
            currency,
            created_at,
            due_date: self.due_date,
            number_of_payments: self.number_of_payments,
        }
    }
}

/// builder for debts
#[derive(Debug, Default)]
pub struct NewDebtBuilder {
    owner_id: Option<OwnerId>,
    counterparty_id: Option<CounterpartyId>,
    debt_type: Option<DebtType>,
    total_amount: Option<Money>,
    currency: Option<Currency>,
    cadence: Option<Cadence>,
    due_date: Option<DateTime<Utc>>,
    number_of_payments: Option<u32>,
    description: Option<String>,
    notes: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

impl NewDebtBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner(mut self, owner_id: OwnerId) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    pub fn counterparty(mut self, counterparty_id: CounterpartyId) -> Self {
        self.counterparty_id = Some(counterparty_id);
        self
    }

    pub fn debt_type(mut self, debt_type: DebtType) -> Self {
        self.debt_type = Some(debt_type);
        self
    }

    pub fn total_amount(mut self, amount: Money) -> Self {
        self.total_amount = Some(amount);
        self
    }

    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    pub fn cadence(mut self, cadence: Cadence) -> Self {
        self.cadence = Some(cadence);
        self
    }

    pub fn due_date(mut self, date: DateTime<Utc>) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn number_of_payments(mut self, count: u32) -> Self {
        self.number_of_payments = Some(count);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// backdate creation, otherwise the service stamps the current time
    pub fn created_at(mut self, date: DateTime<Utc>) -> Self {
        self.created_at = Some(date);
        self
    }

    pub fn build(self) -> Result<NewDebt> {
        let owner_id = self
            .owner_id
            .ok_or_else(|| DebtError::validation("owner required"))?;
        let counterparty_id = self
            .counterparty_id
            .ok_or_else(|| DebtError::validation("counterparty required"))?;
        let total_amount = self
            .total_amount
            .ok_or_else(|| DebtError::validation("total amount required"))?;

        if !total_amount.is_positive() {
            return Err(DebtError::validation(format!(
                "total amount must be positive, got {}",
                total_amount
            )));
        }
        if self.due_date.is_none() && self.number_of_payments.is_none() {
            return Err(DebtError::validation(
                "either a due date or a number of payments is required",
            ));
        }

        Ok(NewDebt {
            owner_id,
            counterparty_id,
            debt_type: self.debt_type.unwrap_or(DebtType::OwedToMe),
            total_amount,
            currency: self.currency,
            cadence: self.cadence.unwrap_or(Cadence::Monthly),
            due_date: self.due_date,
            number_of_payments: self.number_of_payments,
            description: self.description,
            notes: self.notes,
            created_at: self.created_at,
        })
    }
}

/// partial edit of a debt
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebtUpdate {
    pub total_amount: Option<Money>,
    pub cadence: Option<Cadence>,
    pub due_date: Option<DateTime<Utc>>,
    pub number_of_payments: Option<u32>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

impl DebtUpdate {
    pub fn touches_plan(&self) -> bool {
        self.total_amount.is_some()
            || self.cadence.is_some()
            || self.due_date.is_some()
            || self.number_of_payments.is_some()
    }

    /// plan input after this edit.
    ///
    /// Naming a due date makes the date authoritative, naming a count makes
    /// the count authoritative; otherwise the existing basis is kept.
    pub fn plan_request(&self, debt: &Debt) -> PlanRequest {
        let mut request = debt.plan.to_request(debt.currency.clone());

        if let Some(total) = self.total_amount {
            request.total_amount = total;
        }
        if let Some(cadence) = self.cadence {
            request.cadence = cadence;
        }

        match (self.number_of_payments, self.due_date) {
            (Some(count), _) => {
                request.number_of_payments = Some(count);
                request.due_date = None;
            }
            (None, Some(due_date)) => {
                request.due_date = Some(due_date);
                request.number_of_payments = None;
            }
            (None, None) => {}
        }

        request
    }

    pub(crate) fn apply_details(&self, debt: &mut Debt) {
        if let Some(description) = &self.description {
            debt.description = Some(description.clone());
        }
        if let Some(notes) = &self.notes {
            debt.notes = Some(notes.clone());
        }
    }
}
