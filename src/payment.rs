use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{DebtError, Result};
use crate::types::{Currency, DebtId, OwnerId, PaymentId, PaymentMethod, PaymentStatus};

/// a recorded payment against one debt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub debt_id: DebtId,
    pub amount: Money,
    pub currency: Currency,
    pub payment_date: DateTime<Utc>,
    pub payment_method: PaymentMethod,
    pub description: Option<String>,
    pub status: PaymentStatus,
    pub verification: Option<Verification>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// insertion order assigned by the store, breaks payment date ties
    pub sequence: u64,
}

impl Payment {
    pub fn is_completed(&self) -> bool {
        self.status.counts_toward_ledger()
    }

    /// ordering used by allocation: payment date, then creation order
    pub fn allocation_key(&self) -> (DateTime<Utc>, DateTime<Utc>, u64) {
        (self.payment_date, self.created_at, self.sequence)
    }
}

/// who confirmed a payment and when
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    pub verified_by: OwnerId,
    pub verified_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// validated input for recording a payment
#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub debt_id: DebtId,
    pub amount: Money,
    pub currency: Option<Currency>,
    pub payment_date: DateTime<Utc>,
    pub payment_method: PaymentMethod,
    pub description: Option<String>,
    pub status: PaymentStatus,
}

impl NewPayment {
    pub fn builder() -> NewPaymentBuilder {
        NewPaymentBuilder::new()
    }
}

/// builder for payments
#[derive(Debug, Default)]
pub struct NewPaymentBuilder {
    debt_id: Option<DebtId>,
    amount: Option<Money>,
    currency: Option<Currency>,
    payment_date: Option<DateTime<Utc>>,
    payment_method: Option<PaymentMethod>,
    description: Option<String>,
    status: Option<PaymentStatus>,
}

impl NewPaymentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debt_id(mut self, debt_id: DebtId) -> Self {
        self.debt_id = Some(debt_id);
        self
    }

    pub fn amount(mut self, amount: Money) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    pub fn payment_date(mut self, date: DateTime<Utc>) -> Self {
        self.payment_date = Some(date);
        self
    }

    pub fn payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(method);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// payments are recorded as completed unless told otherwise
    pub fn status(mut self, status: PaymentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn build(self) -> Result<NewPayment> {
        let debt_id = self
            .debt_id
            .ok_or_else(|| DebtError::validation("debt id required"))?;
        let amount = self
            .amount
            .ok_or_else(|| DebtError::validation("amount required"))?;
        let payment_date = self
            .payment_date
            .ok_or_else(|| DebtError::validation("payment date required"))?;

        validate_amount(amount)?;

        Ok(NewPayment {
            debt_id,
            amount,
            currency: self.currency,
            payment_date,
            payment_method: self.payment_method.unwrap_or_default(),
            description: self.description,
            status: self.status.unwrap_or(PaymentStatus::Completed),
        })
    }
}

/// partial edit of a recorded payment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentUpdate {
    pub amount: Option<Money>,
    pub payment_date: Option<DateTime<Utc>>,
    pub payment_method: Option<PaymentMethod>,
    pub description: Option<String>,
    pub status: Option<PaymentStatus>,
}

impl PaymentUpdate {
    /// apply to `payment`, leaving it untouched on error
    pub fn apply(&self, payment: &mut Payment, now: DateTime<Utc>) -> Result<()> {
        if let Some(amount) = self.amount {
            validate_amount(amount)?;
            validate_precision(amount, &payment.currency)?;
        }

        if let Some(amount) = self.amount {
            payment.amount = amount;
        }
        if let Some(date) = self.payment_date {
            payment.payment_date = date;
        }
        if let Some(method) = self.payment_method {
            payment.payment_method = method;
        }
        if let Some(description) = &self.description {
            payment.description = Some(description.clone());
        }
        if let Some(status) = self.status {
            payment.status = status;
        }
        payment.updated_at = now;
        Ok(())
    }

    /// whether the edit can change ledger totals
    pub fn touches_ledger(&self) -> bool {
        self.amount.is_some() || self.payment_date.is_some() || self.status.is_some()
    }
}

fn validate_amount(amount: Money) -> Result<()> {
    if !amount.is_positive() {
        return Err(DebtError::validation(format!(
            "payment amount must be positive, got {}",
            amount
        )));
    }
    Ok(())
}

pub(crate) fn validate_precision(amount: Money, currency: &Currency) -> Result<()> {
    if amount.as_decimal().normalize().scale() > currency.minor_units() {
        return Err(DebtError::validation(format!(
            "amount {} is finer than the {} minor unit",
            amount, currency
        )));
    }
    Ok(())
}
