use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use tracing::{debug, info, instrument, warn};

use crate::config::EngineConfig;
use crate::debt::Debt;
use crate::decimal::Money;
use crate::errors::{DebtError, Result};
use crate::events::{Event, EventStore};
use crate::payment::Payment;
use crate::plan::PlanNormalizer;
use crate::store::DebtStore;
use crate::types::{DebtId, DebtStatus};

use super::Ledger;

/// outcome of a committed reconcile
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub previous: Ledger,
    pub debt: Debt,
    /// compare-and-swap attempts it took to commit
    pub attempts: u32,
}

impl Reconciled {
    pub fn status_changed(&self) -> bool {
        self.previous.status != self.debt.ledger.status
    }
}

/// keeps a debt's cached ledger in step with its payments
#[derive(Debug, Clone, Copy)]
pub struct LedgerReconciler {
    normalizer: PlanNormalizer,
    max_attempts: u32,
}

impl LedgerReconciler {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            normalizer: PlanNormalizer::new(config),
            max_attempts: config.max_reconcile_attempts,
        }
    }

    /// ledger for `debt` given its payments, as of `now`
    pub fn compute(&self, debt: &Debt, payments: &[Payment], now: DateTime<Utc>) -> Result<Ledger> {
        let completed = payments.iter().filter(|p| p.is_completed());

        let paid_total: Money = completed.clone().map(|p| p.amount).sum();
        if paid_total.is_negative() {
            return Err(DebtError::invariant(format!(
                "paid total of debt {} is negative ({})",
                debt.id, paid_total
            )));
        }

        let remaining_total = (debt.total_amount() - paid_total).max(Money::ZERO);

        let status = if debt.is_archived() {
            DebtStatus::Archived
        } else if remaining_total.is_zero() {
            DebtStatus::Settled
        } else if now > debt.due_date() {
            DebtStatus::Overdue
        } else {
            DebtStatus::Active
        };

        let last_payment_date = completed.map(|p| p.payment_date).max();
        let next_payment_date = self
            .normalizer
            .next_payment_date(&debt.plan, last_payment_date)?;

        Ok(Ledger {
            paid_total,
            remaining_total,
            status,
            next_payment_date,
        })
    }

    /// recompute and commit the ledger of `debt_id`
    pub fn reconcile<S: DebtStore + ?Sized>(
        &self,
        store: &S,
        debt_id: DebtId,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<Reconciled> {
        self.reconcile_with(store, debt_id, time, events, |_| Ok(()))
    }

    /// apply `edit` to the stored debt, recompute its ledger and commit both
    /// in one compare-and-swap.
    ///
    /// The read, edit and compute steps are repeated on a version conflict,
    /// so `edit` must be safe to run more than once.
    #[instrument(
        name = "debt_ledger.ledger.reconcile",
        skip(self, store, time, events, edit),
        fields(debt_id = %debt_id),
        err
    )]
    pub fn reconcile_with<S, F>(
        &self,
        store: &S,
        debt_id: DebtId,
        time: &SafeTimeProvider,
        events: &mut EventStore,
        mut edit: F,
    ) -> Result<Reconciled>
    where
        S: DebtStore + ?Sized,
        F: FnMut(&mut Debt) -> Result<()>,
    {
        for attempt in 1..=self.max_attempts {
            let snapshot = store
                .get_debt(debt_id)?
                .ok_or(DebtError::DebtNotFound { id: debt_id })?;
            let payments = store.completed_payments(debt_id)?;
            let now = time.now();

            let mut debt = snapshot.clone();
            edit(&mut debt)?;
            debt.ledger = self.compute(&debt, &payments, now)?;
            debt.updated_at = now;

            match store.update_debt(debt, snapshot.version) {
                Ok(committed) => {
                    let reconciled = Reconciled {
                        previous: snapshot.ledger,
                        debt: committed,
                        attempts: attempt,
                    };
                    self.emit(&reconciled, now, events);
                    return Ok(reconciled);
                }
                Err(DebtError::ConcurrencyConflict { .. }) => {
                    warn!(attempt, max = self.max_attempts, "ledger write lost a version race, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(DebtError::ConcurrencyConflict {
            debt_id,
            attempts: self.max_attempts,
        })
    }

    fn emit(&self, reconciled: &Reconciled, now: DateTime<Utc>, events: &mut EventStore) {
        let debt = &reconciled.debt;

        debug!(
            paid_total = %debt.ledger.paid_total,
            remaining_total = %debt.ledger.remaining_total,
            attempts = reconciled.attempts,
            "ledger reconciled"
        );
        events.emit(Event::LedgerReconciled {
            debt_id: debt.id,
            paid_total: debt.ledger.paid_total,
            remaining_total: debt.ledger.remaining_total,
            next_payment_date: debt.ledger.next_payment_date,
            timestamp: now,
        });

        if !reconciled.status_changed() {
            return;
        }

        info!(
            from = ?reconciled.previous.status,
            to = ?debt.ledger.status,
            "debt status changed"
        );
        events.emit(Event::StatusChanged {
            debt_id: debt.id,
            old_status: reconciled.previous.status,
            new_status: debt.ledger.status,
            timestamp: now,
        });

        if debt.ledger.status == DebtStatus::Settled {
            events.emit(Event::DebtSettled {
                debt_id: debt.id,
                paid_total: debt.ledger.paid_total,
                timestamp: now,
            });
        }
    }
}
