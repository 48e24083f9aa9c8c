pub mod reconciler;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::plan::PaymentPlan;
use crate::types::DebtStatus;

pub use reconciler::{LedgerReconciler, Reconciled};

/// cached aggregates kept in step with a debt's completed payments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    pub paid_total: Money,
    pub remaining_total: Money,
    pub status: DebtStatus,
    pub next_payment_date: DateTime<Utc>,
}

impl Ledger {
    /// ledger of a debt nothing has been paid against
    pub fn opening(plan: &PaymentPlan, next_payment_date: DateTime<Utc>) -> Self {
        Self {
            paid_total: Money::ZERO,
            remaining_total: plan.total_amount,
            status: DebtStatus::Active,
            next_payment_date,
        }
    }
}
