pub mod memory;

use crate::debt::Debt;
use crate::errors::Result;
use crate::payment::Payment;
use crate::types::{DebtId, OwnerId, PaymentId};

pub use memory::MemoryStore;

/// persistence for debts and their payments.
///
/// Every write that touches a debt or one of its payments bumps the debt's
/// `version`. [`DebtStore::update_debt`] only commits when the caller's
/// expected version still matches, which is what serializes ledger updates.
pub trait DebtStore: Send + Sync {
    /// store a new debt, returning it with its initial version
    fn insert_debt(&self, debt: Debt) -> Result<Debt>;

    fn get_debt(&self, id: DebtId) -> Result<Option<Debt>>;

    /// debts of one owner, oldest first
    fn list_debts(&self, owner_id: OwnerId) -> Result<Vec<Debt>>;

    /// compare-and-swap the whole debt record.
    ///
    /// Fails with `ConcurrencyConflict` when the stored version differs from
    /// `expected_version`, and with `DebtNotFound` when the debt is gone.
    fn update_debt(&self, debt: Debt, expected_version: u64) -> Result<Debt>;

    /// remove a debt and all of its payments, returning the removed debt and
    /// how many payments went with it
    fn delete_debt(&self, id: DebtId) -> Result<Option<(Debt, usize)>>;

    /// store a new payment, assigning its insertion sequence
    fn insert_payment(&self, payment: Payment) -> Result<Payment>;

    fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>>;

    /// payments of one debt in allocation order
    fn list_payments(&self, debt_id: DebtId) -> Result<Vec<Payment>>;

    /// completed payments of one debt in allocation order
    fn completed_payments(&self, debt_id: DebtId) -> Result<Vec<Payment>> {
        Ok(self
            .list_payments(debt_id)?
            .into_iter()
            .filter(Payment::is_completed)
            .collect())
    }

    fn update_payment(&self, payment: Payment) -> Result<Payment>;

    fn delete_payment(&self, id: PaymentId) -> Result<Option<Payment>>;
}
