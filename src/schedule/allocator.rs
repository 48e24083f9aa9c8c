use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{DebtError, Result};
use crate::payment::Payment;

use super::ScheduleSlot;

/// schedule slots after completed payments have been applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub slots: Vec<ScheduleSlot>,
    /// paid beyond the last slot, not represented in any slot
    pub overflow: Money,
}

impl Allocation {
    pub fn paid_in_slots(&self) -> Money {
        self.slots.iter().map(|s| s.paid_amount).sum()
    }

    pub fn pending(&self) -> impl Iterator<Item = &ScheduleSlot> {
        self.slots.iter().filter(|s| s.is_pending())
    }

    /// first slot not yet fully paid
    pub fn next_pending(&self) -> Option<&ScheduleSlot> {
        self.pending().next()
    }
}

/// fills slots in order from a single carry pool of completed payments
pub struct PaymentAllocator;

impl PaymentAllocator {
    /// apply `payments` to `slots`.
    ///
    /// Only completed payments are used, oldest payment date first with
    /// creation order breaking ties. A slot is only credited once every
    /// earlier slot is fully paid.
    pub fn allocate(mut slots: Vec<ScheduleSlot>, payments: &[Payment]) -> Result<Allocation> {
        let mut completed: Vec<&Payment> = payments.iter().filter(|p| p.is_completed()).collect();
        completed.sort_by_key(|p| p.allocation_key());

        let mut carry = Money::ZERO;
        let mut cursor = 0usize;

        for payment in completed {
            carry += payment.amount;

            while cursor < slots.len() && carry.is_positive() {
                let slot = &mut slots[cursor];
                let owed = slot.remaining_amount;

                if carry >= owed {
                    slot.credit(owed);
                    carry -= owed;
                    cursor += 1;
                } else {
                    slot.credit(carry);
                    carry = Money::ZERO;
                }
            }

            if carry.is_negative() {
                return Err(DebtError::invariant(format!(
                    "carry went negative ({}) after payment {}",
                    carry, payment.id
                )));
            }
        }

        Ok(Allocation {
            slots,
            overflow: carry,
        })
    }
}
