pub mod normalizer;
pub mod period;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{Cadence, Currency};

pub use normalizer::PlanNormalizer;

/// which input the plan was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanBasis {
    /// the due date was given, the payment count is derived
    DueDate,
    /// the payment count was given, the due date is derived
    NumberOfPayments,
}

/// raw plan input as supplied by a caller
#[derive(Debug, Clone, PartialEq)]
pub struct PlanRequest {
    pub total_amount: Money,
    pub cadence: Cadence,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub number_of_payments: Option<u32>,
}

/// canonical payment plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentPlan {
    pub cadence: Cadence,
    pub total_amount: Money,
    pub installment_amount: Money,
    pub number_of_payments: u32,
    pub created_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub basis: PlanBasis,
}

impl PaymentPlan {
    /// amount carried by the final slot after earlier slots took their share
    pub fn final_installment(&self) -> Money {
        // a normalized plan keeps the earlier slots below the total
        let earlier = self
            .installment_amount
            .checked_mul_count(self.number_of_payments.saturating_sub(1))
            .unwrap_or(self.total_amount);
        self.total_amount - earlier
    }

    /// plan input that reproduces this plan from its authoritative side
    pub fn to_request(&self, currency: Currency) -> PlanRequest {
        let (due_date, number_of_payments) = match self.basis {
            PlanBasis::DueDate => (Some(self.due_date), None),
            PlanBasis::NumberOfPayments => (None, Some(self.number_of_payments)),
        };

        PlanRequest {
            total_amount: self.total_amount,
            cadence: self.cadence,
            currency,
            created_at: self.created_at,
            due_date,
            number_of_payments,
        }
    }
}
