pub mod allocator;
pub mod builder;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;

pub use allocator::{Allocation, PaymentAllocator};
pub use builder::ScheduleBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Paid,
    Pending,
}

/// one installment of a payment plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSlot {
    /// 1-based position in the plan
    pub payment_number: u32,
    pub due_date: DateTime<Utc>,
    pub scheduled_amount: Money,
    pub paid_amount: Money,
    pub remaining_amount: Money,
    pub status: SlotStatus,
}

impl ScheduleSlot {
    pub(crate) fn unpaid(payment_number: u32, due_date: DateTime<Utc>, amount: Money) -> Self {
        Self {
            payment_number,
            due_date,
            scheduled_amount: amount,
            paid_amount: Money::ZERO,
            remaining_amount: amount,
            status: SlotStatus::Pending,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.status == SlotStatus::Paid
    }

    pub fn is_pending(&self) -> bool {
        self.status == SlotStatus::Pending
    }

    /// put `amount` toward this slot, marking it paid once nothing remains
    pub(crate) fn credit(&mut self, amount: Money) {
        self.paid_amount += amount;
        self.remaining_amount = self.scheduled_amount - self.paid_amount;
        if !self.remaining_amount.is_positive() {
            self.status = SlotStatus::Paid;
        }
    }
}
