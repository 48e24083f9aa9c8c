use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;

use crate::debt::Debt;
use crate::errors::{DebtError, Result};
use crate::payment::Payment;
use crate::types::{DebtId, OwnerId, PaymentId};

use super::DebtStore;

#[derive(Error, Debug)]
#[error("{0} lock poisoned")]
struct LockPoisoned(&'static str);

/// in-memory [`DebtStore`].
///
/// Writers take the debt map before the payment map, so a payment write
/// and its version bump are observed together.
#[derive(Debug, Default)]
pub struct MemoryStore {
    debts: RwLock<HashMap<DebtId, Debt>>,
    payments: RwLock<HashMap<PaymentId, Payment>>,
    sequence: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_debts(&self) -> Result<RwLockReadGuard<'_, HashMap<DebtId, Debt>>> {
        self.debts
            .read()
            .map_err(|_| DebtError::Storage(Box::new(LockPoisoned("debt"))))
    }

    fn write_debts(&self) -> Result<RwLockWriteGuard<'_, HashMap<DebtId, Debt>>> {
        self.debts
            .write()
            .map_err(|_| DebtError::Storage(Box::new(LockPoisoned("debt"))))
    }

    fn read_payments(&self) -> Result<RwLockReadGuard<'_, HashMap<PaymentId, Payment>>> {
        self.payments
            .read()
            .map_err(|_| DebtError::Storage(Box::new(LockPoisoned("payment"))))
    }

    fn write_payments(&self) -> Result<RwLockWriteGuard<'_, HashMap<PaymentId, Payment>>> {
        self.payments
            .write()
            .map_err(|_| DebtError::Storage(Box::new(LockPoisoned("payment"))))
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }
}

fn bump_version(debts: &mut HashMap<DebtId, Debt>, debt_id: DebtId) -> Result<()> {
    let debt = debts
        .get_mut(&debt_id)
        .ok_or(DebtError::DebtNotFound { id: debt_id })?;
    debt.version += 1;
    Ok(())
}

impl DebtStore for MemoryStore {
    fn insert_debt(&self, mut debt: Debt) -> Result<Debt> {
        let mut debts = self.write_debts()?;
        if debts.contains_key(&debt.id) {
            return Err(DebtError::validation(format!("debt {} already exists", debt.id)));
        }
        debt.version = 1;
        debts.insert(debt.id, debt.clone());
        Ok(debt)
    }

    fn get_debt(&self, id: DebtId) -> Result<Option<Debt>> {
        Ok(self.read_debts()?.get(&id).cloned())
    }

    fn list_debts(&self, owner_id: OwnerId) -> Result<Vec<Debt>> {
        let mut debts: Vec<Debt> = self
            .read_debts()?
            .values()
            .filter(|d| d.owner_id == owner_id)
            .cloned()
            .collect();
        debts.sort_by_key(|d| (d.created_at, d.id));
        Ok(debts)
    }

    fn update_debt(&self, mut debt: Debt, expected_version: u64) -> Result<Debt> {
        let mut debts = self.write_debts()?;
        let stored = debts
            .get_mut(&debt.id)
            .ok_or(DebtError::DebtNotFound { id: debt.id })?;

        if stored.version != expected_version {
            return Err(DebtError::ConcurrencyConflict {
                debt_id: debt.id,
                attempts: 1,
            });
        }

        debt.version = expected_version + 1;
        *stored = debt.clone();
        Ok(debt)
    }

    fn delete_debt(&self, id: DebtId) -> Result<Option<(Debt, usize)>> {
        let mut debts = self.write_debts()?;
        let mut payments = self.write_payments()?;

        let Some(debt) = debts.remove(&id) else {
            return Ok(None);
        };
        let before = payments.len();
        payments.retain(|_, p| p.debt_id != id);
        Ok(Some((debt, before - payments.len())))
    }

    fn insert_payment(&self, mut payment: Payment) -> Result<Payment> {
        let mut debts = self.write_debts()?;
        let mut payments = self.write_payments()?;

        if payments.contains_key(&payment.id) {
            return Err(DebtError::validation(format!("payment {} already exists", payment.id)));
        }
        bump_version(&mut debts, payment.debt_id)?;

        payment.sequence = self.next_sequence();
        payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        Ok(self.read_payments()?.get(&id).cloned())
    }

    fn list_payments(&self, debt_id: DebtId) -> Result<Vec<Payment>> {
        let mut found: Vec<Payment> = self
            .read_payments()?
            .values()
            .filter(|p| p.debt_id == debt_id)
            .cloned()
            .collect();
        found.sort_by_key(|p| p.allocation_key());
        Ok(found)
    }

    fn update_payment(&self, payment: Payment) -> Result<Payment> {
        let mut debts = self.write_debts()?;
        let mut payments = self.write_payments()?;

        let stored = payments
            .get_mut(&payment.id)
            .ok_or(DebtError::PaymentNotFound { id: payment.id })?;
        if stored.debt_id != payment.debt_id {
            return Err(DebtError::validation("a payment cannot move to another debt"));
        }
        bump_version(&mut debts, payment.debt_id)?;

        let sequence = stored.sequence;
        *stored = Payment { sequence, ..payment };
        Ok(stored.clone())
    }

    fn delete_payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        let mut debts = self.write_debts()?;
        let mut payments = self.write_payments()?;

        let removed = payments.remove(&id);
        if let Some(payment) = &removed {
            // the owning debt may already be gone
            if let Some(debt) = debts.get_mut(&payment.debt_id) {
                debt.version += 1;
            }
        }
        Ok(removed)
    }
}
