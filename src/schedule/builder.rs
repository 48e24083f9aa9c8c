use crate::decimal::Money;
use crate::errors::{DebtError, Result};
use crate::plan::period::advance;
use crate::plan::PaymentPlan;
use crate::types::Cadence;

use super::ScheduleSlot;

/// expands a normalized plan into its installment slots
pub struct ScheduleBuilder;

impl ScheduleBuilder {
    /// slots `1..=n` of `plan`, before any payment is applied.
    ///
    /// Slot `i` falls `i` periods after creation, never later than the
    /// plan's due date. Every slot but the last carries the installment
    /// amount; the last one absorbs the rounding remainder.
    pub fn build(plan: &PaymentPlan) -> Result<Vec<ScheduleSlot>> {
        let count = plan.number_of_payments;
        if count == 0 {
            return Err(DebtError::invariant("plan has no installments"));
        }

        let final_amount = plan.final_installment();
        if final_amount.is_negative() {
            return Err(DebtError::invariant(format!(
                "final installment of {} is negative ({} x {} exceeds {})",
                final_amount, plan.installment_amount, count, plan.total_amount
            )));
        }

        let mut slots = Vec::with_capacity(count as usize);
        for number in 1..=count {
            let due_date = if plan.cadence == Cadence::OneTime {
                plan.due_date
            } else {
                advance(plan.cadence, plan.created_at, number)
                    .ok_or_else(|| DebtError::invariant("slot due date is out of range"))?
                    .min(plan.due_date)
            };

            let amount = if number == count {
                final_amount
            } else {
                plan.installment_amount
            };

            slots.push(ScheduleSlot::unpaid(number, due_date, amount));
        }

        Ok(slots)
    }

    /// sum of scheduled amounts, equal to the plan total for any built schedule
    pub fn scheduled_total(slots: &[ScheduleSlot]) -> Money {
        slots.iter().map(|s| s.scheduled_amount).sum()
    }
}
