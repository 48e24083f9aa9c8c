use hourglass_rs::SafeTimeProvider;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::debt::{Debt, DebtUpdate, NewDebt};
use crate::errors::{DebtError, Result};
use crate::events::{Event, EventStore};
use crate::ledger::{Ledger, LedgerReconciler};
use crate::payment::{validate_precision, NewPayment, Payment, PaymentUpdate, Verification};
use crate::plan::{PaymentPlan, PlanNormalizer};
use crate::schedule::Allocation;
use crate::serialization::PaymentSummary;
use crate::store::DebtStore;
use crate::types::{DebtId, DebtStatus, OwnerId, PaymentId, PaymentStatus, Verdict};
use crate::windows::{self, DueInstallment};

/// entry point for debt and payment operations.
///
/// Every operation is scoped to an owner: ids belonging to someone else are
/// reported as not found. Mutations reconcile the debt's ledger before
/// returning.
pub struct DebtService<S: DebtStore> {
    store: S,
    config: EngineConfig,
    normalizer: PlanNormalizer,
    reconciler: LedgerReconciler,
}

impl<S: DebtStore> DebtService<S> {
    pub fn new(store: S, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            normalizer: PlanNormalizer::new(&config),
            reconciler: LedgerReconciler::new(&config),
            store,
            config,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // debts

    #[instrument(name = "debt_ledger.debts.create", skip(self, new_debt, time, events), fields(owner_id = %new_debt.owner_id), err)]
    pub fn create_debt(
        &self,
        new_debt: NewDebt,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<Debt> {
        let now = time.now();
        let created_at = new_debt.created_at.unwrap_or(now);
        let currency = new_debt
            .currency
            .clone()
            .unwrap_or_else(|| self.config.default_currency.clone());

        let plan = self
            .normalizer
            .normalize(&new_debt.plan_request(currency.clone(), created_at))?;
        let next_payment_date = self.normalizer.next_payment_date(&plan, None)?;

        let mut debt = Debt {
            id: Uuid::new_v4(),
            owner_id: new_debt.owner_id,
            counterparty_id: new_debt.counterparty_id,
            debt_type: new_debt.debt_type,
            currency,
            ledger: Ledger::opening(&plan, next_payment_date),
            plan,
            description: new_debt.description,
            notes: new_debt.notes,
            created_at,
            updated_at: now,
            version: 0,
        };
        // a backdated debt may already be past due
        debt.ledger = self.reconciler.compute(&debt, &[], now)?;

        let debt = self.store.insert_debt(debt)?;

        info!(debt_id = %debt.id, total = %debt.total_amount(), "debt created");
        events.emit(Event::DebtCreated {
            debt_id: debt.id,
            owner_id: debt.owner_id,
            total_amount: debt.total_amount(),
            cadence: debt.cadence(),
            number_of_payments: debt.number_of_payments(),
            due_date: debt.due_date(),
            timestamp: now,
        });

        Ok(debt)
    }

    #[instrument(name = "debt_ledger.debts.get", skip(self), err)]
    pub fn get_debt(&self, owner_id: OwnerId, debt_id: DebtId) -> Result<Debt> {
        self.store
            .get_debt(debt_id)?
            .filter(|d| d.owner_id == owner_id)
            .ok_or(DebtError::DebtNotFound { id: debt_id })
    }

    #[instrument(name = "debt_ledger.debts.list", skip(self), err)]
    pub fn list_debts(&self, owner_id: OwnerId) -> Result<Vec<Debt>> {
        self.store.list_debts(owner_id)
    }

    /// edit a debt. Plan edits re-normalize the plan and reconcile the ledger
    /// in the same write.
    #[instrument(name = "debt_ledger.debts.update", skip(self, update, time, events), err)]
    pub fn update_debt(
        &self,
        owner_id: OwnerId,
        debt_id: DebtId,
        update: DebtUpdate,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<Debt> {
        self.get_debt(owner_id, debt_id)?;

        let mut renormalized: Option<(PaymentPlan, PaymentPlan)> = None;
        let reconciled = self
            .reconciler
            .reconcile_with(&self.store, debt_id, time, events, |debt| {
                update.apply_details(debt);
                renormalized = None;

                if update.touches_plan() {
                    let plan = self.normalizer.normalize(&update.plan_request(debt))?;
                    if plan != debt.plan {
                        renormalized = Some((debt.plan.clone(), plan.clone()));
                    }
                    debt.plan = plan;
                }
                Ok(())
            })?;

        if let Some((old, new)) = renormalized {
            info!(
                installments = new.number_of_payments,
                installment = %new.installment_amount,
                "plan renormalized"
            );
            events.emit(Event::PlanRenormalized {
                debt_id,
                old_installment: old.installment_amount,
                new_installment: new.installment_amount,
                old_number_of_payments: old.number_of_payments,
                new_number_of_payments: new.number_of_payments,
                due_date: new.due_date,
                timestamp: reconciled.debt.updated_at,
            });
        }

        Ok(reconciled.debt)
    }

    #[instrument(name = "debt_ledger.debts.archive", skip(self, time, events), err)]
    pub fn archive_debt(
        &self,
        owner_id: OwnerId,
        debt_id: DebtId,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<Debt> {
        self.get_debt(owner_id, debt_id)?;

        let reconciled = self
            .reconciler
            .reconcile_with(&self.store, debt_id, time, events, |debt| {
                debt.ledger.status = DebtStatus::Archived;
                Ok(())
            })?;

        events.emit(Event::DebtArchived {
            debt_id,
            remaining_total: reconciled.debt.remaining_total(),
            timestamp: reconciled.debt.updated_at,
        });
        Ok(reconciled.debt)
    }

    /// remove a debt together with its payments
    #[instrument(name = "debt_ledger.debts.delete", skip(self, time, events), err)]
    pub fn delete_debt(
        &self,
        owner_id: OwnerId,
        debt_id: DebtId,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<()> {
        self.get_debt(owner_id, debt_id)?;

        let (_, payments_removed) = self
            .store
            .delete_debt(debt_id)?
            .ok_or(DebtError::DebtNotFound { id: debt_id })?;

        info!(payments_removed, "debt deleted");
        events.emit(Event::DebtDeleted {
            debt_id,
            payments_removed,
            timestamp: time.now(),
        });
        Ok(())
    }

    /// recompute the cached ledger as of now, picking up status changes
    /// caused by the passage of time
    #[instrument(name = "debt_ledger.debts.refresh", skip(self, time, events), err)]
    pub fn refresh_ledger(
        &self,
        owner_id: OwnerId,
        debt_id: DebtId,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<Debt> {
        self.get_debt(owner_id, debt_id)?;
        Ok(self.reconciler.reconcile(&self.store, debt_id, time, events)?.debt)
    }

    // payments

    /// record a payment, completed unless the input says otherwise
    #[instrument(name = "debt_ledger.payments.record", skip(self, new_payment, time, events), fields(debt_id = %new_payment.debt_id), err)]
    pub fn record_payment(
        &self,
        owner_id: OwnerId,
        new_payment: NewPayment,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<Payment> {
        let debt = self.get_debt(owner_id, new_payment.debt_id)?;

        let currency = new_payment.currency.unwrap_or_else(|| debt.currency.clone());
        if currency != debt.currency {
            return Err(DebtError::validation(format!(
                "payment currency {} does not match debt currency {}",
                currency, debt.currency
            )));
        }
        validate_precision(new_payment.amount, &currency)?;

        let now = time.now();
        let payment = self.store.insert_payment(Payment {
            id: Uuid::new_v4(),
            debt_id: debt.id,
            amount: new_payment.amount,
            currency,
            payment_date: new_payment.payment_date,
            payment_method: new_payment.payment_method,
            description: new_payment.description,
            status: new_payment.status,
            verification: None,
            created_at: now,
            updated_at: now,
            sequence: 0,
        })?;

        events.emit(Event::PaymentRecorded {
            debt_id: debt.id,
            payment_id: payment.id,
            amount: payment.amount,
            status: payment.status,
            payment_date: payment.payment_date,
            timestamp: now,
        });
        self.settle_ledger(debt.id, time, events)?;

        Ok(payment)
    }

    #[instrument(name = "debt_ledger.payments.get", skip(self), err)]
    pub fn get_payment(&self, owner_id: OwnerId, payment_id: PaymentId) -> Result<Payment> {
        let payment = self
            .store
            .get_payment(payment_id)?
            .ok_or(DebtError::PaymentNotFound { id: payment_id })?;

        match self.store.get_debt(payment.debt_id)? {
            Some(debt) if debt.owner_id == owner_id => Ok(payment),
            _ => Err(DebtError::PaymentNotFound { id: payment_id }),
        }
    }

    /// payments of a debt in allocation order
    #[instrument(name = "debt_ledger.payments.list", skip(self), err)]
    pub fn list_payments(&self, owner_id: OwnerId, debt_id: DebtId) -> Result<Vec<Payment>> {
        self.get_debt(owner_id, debt_id)?;
        self.store.list_payments(debt_id)
    }

    #[instrument(name = "debt_ledger.payments.update", skip(self, update, time, events), err)]
    pub fn update_payment(
        &self,
        owner_id: OwnerId,
        payment_id: PaymentId,
        update: PaymentUpdate,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<Payment> {
        let mut payment = self.get_payment(owner_id, payment_id)?;
        let now = time.now();

        update.apply(&mut payment, now)?;
        let touches_ledger = update.touches_ledger();
        let payment = self.store.update_payment(payment)?;

        events.emit(Event::PaymentUpdated {
            debt_id: payment.debt_id,
            payment_id,
            amount: payment.amount,
            status: payment.status,
            timestamp: now,
        });
        if touches_ledger {
            self.settle_ledger(payment.debt_id, time, events)?;
        }

        Ok(payment)
    }

    /// settle a pending payment as completed or rejected
    #[instrument(name = "debt_ledger.payments.verify", skip(self, notes, time, events), err)]
    pub fn verify_payment(
        &self,
        owner_id: OwnerId,
        payment_id: PaymentId,
        verdict: Verdict,
        notes: Option<String>,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<Payment> {
        let mut payment = self.get_payment(owner_id, payment_id)?;
        if payment.status != PaymentStatus::Pending {
            return Err(DebtError::validation(format!(
                "only pending payments can be verified, payment {} is {:?}",
                payment_id, payment.status
            )));
        }

        let now = time.now();
        payment.status = verdict.into();
        payment.verification = Some(Verification {
            verified_by: owner_id,
            verified_at: now,
            notes,
        });
        payment.updated_at = now;
        let payment = self.store.update_payment(payment)?;

        events.emit(Event::PaymentVerified {
            debt_id: payment.debt_id,
            payment_id,
            status: payment.status,
            verified_by: owner_id,
            timestamp: now,
        });
        self.settle_ledger(payment.debt_id, time, events)?;

        Ok(payment)
    }

    #[instrument(name = "debt_ledger.payments.delete", skip(self, time, events), err)]
    pub fn delete_payment(
        &self,
        owner_id: OwnerId,
        payment_id: PaymentId,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<()> {
        let payment = self.get_payment(owner_id, payment_id)?;
        self.store
            .delete_payment(payment_id)?
            .ok_or(DebtError::PaymentNotFound { id: payment_id })?;

        events.emit(Event::PaymentRemoved {
            debt_id: payment.debt_id,
            payment_id,
            amount: payment.amount,
            timestamp: time.now(),
        });
        self.settle_ledger(payment.debt_id, time, events)?;

        Ok(())
    }

    /// reconcile after a payment write has committed.
    ///
    /// The payment write stands even when every ledger attempt loses its
    /// race, so a conflict here is not handed back as a retryable error. The
    /// cached ledger stays stale until the debt's next reconcile.
    fn settle_ledger(
        &self,
        debt_id: DebtId,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<()> {
        match self.reconciler.reconcile(&self.store, debt_id, time, events) {
            Ok(_) => Ok(()),
            Err(DebtError::ConcurrencyConflict { attempts, .. }) => {
                warn!(%debt_id, attempts, "payment stored, ledger left for the next reconcile");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    // queries

    /// installment slots with completed payments applied, plus any overflow
    #[instrument(name = "debt_ledger.queries.schedule", skip(self), err)]
    pub fn payment_schedule(&self, owner_id: OwnerId, debt_id: DebtId) -> Result<Allocation> {
        let debt = self.get_debt(owner_id, debt_id)?;
        let payments = self.store.completed_payments(debt_id)?;
        windows::allocate(&debt, &payments)
    }

    #[instrument(name = "debt_ledger.queries.summary", skip(self), err)]
    pub fn payment_summary(&self, owner_id: OwnerId, debt_id: DebtId) -> Result<PaymentSummary> {
        let debt = self.get_debt(owner_id, debt_id)?;
        let payments = self.store.completed_payments(debt_id)?;
        let allocation = windows::allocate(&debt, &payments)?;
        Ok(PaymentSummary::from_debt(&debt, &payments, &allocation))
    }

    #[instrument(name = "debt_ledger.queries.overdue", skip(self, time), err)]
    pub fn overdue_debts(&self, owner_id: OwnerId, time: &SafeTimeProvider) -> Result<Vec<Debt>> {
        let now = time.now();
        Ok(self
            .store
            .list_debts(owner_id)?
            .into_iter()
            .filter(|d| windows::is_overdue(d, now))
            .collect())
    }

    /// debts with a balance falling due within `days`, the configured
    /// window when `None`
    #[instrument(name = "debt_ledger.queries.due_soon", skip(self, time), err)]
    pub fn due_soon_debts(
        &self,
        owner_id: OwnerId,
        days: Option<u32>,
        time: &SafeTimeProvider,
    ) -> Result<Vec<Debt>> {
        let now = time.now();
        let days = days.unwrap_or(self.config.due_soon_days);
        let mut debts: Vec<Debt> = self
            .store
            .list_debts(owner_id)?
            .into_iter()
            .filter(|d| windows::is_due_soon(d, now, days))
            .collect();
        debts.sort_by_key(|d| d.due_date());
        Ok(debts)
    }

    #[instrument(name = "debt_ledger.queries.upcoming", skip(self, time), err)]
    pub fn upcoming_payments(
        &self,
        owner_id: OwnerId,
        days: Option<u32>,
        time: &SafeTimeProvider,
    ) -> Result<Vec<DueInstallment>> {
        let now = time.now();
        let days = days.unwrap_or(self.config.upcoming_days);

        let mut upcoming = Vec::new();
        for debt in self.store.list_debts(owner_id)? {
            if debt.is_archived() || !debt.has_balance() {
                continue;
            }
            let payments = self.store.completed_payments(debt.id)?;
            upcoming.extend(windows::upcoming_installments(&debt, &payments, now, days)?);
        }
        upcoming.sort_by_key(|u| (u.due_date, u.debt_id, u.payment_number));
        Ok(upcoming)
    }

    #[instrument(name = "debt_ledger.queries.overdue_installments", skip(self, time), err)]
    pub fn overdue_installments(
        &self,
        owner_id: OwnerId,
        debt_id: DebtId,
        time: &SafeTimeProvider,
    ) -> Result<Vec<DueInstallment>> {
        let debt = self.get_debt(owner_id, debt_id)?;
        let payments = self.store.completed_payments(debt_id)?;
        windows::overdue_installments(&debt, &payments, time.now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Money;
    use crate::store::MemoryStore;
    use crate::types::{Cadence, Currency};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use rust_decimal_macros::dec;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    }

    fn setup() -> (DebtService<MemoryStore>, SafeTimeProvider, EventStore) {
        let service = DebtService::new(MemoryStore::new(), EngineConfig::default()).unwrap();
        let time = SafeTimeProvider::new(TimeSource::Test(start()));
        (service, time, EventStore::new())
    }

    fn monthly(owner: OwnerId, total: Money, count: u32) -> NewDebt {
        NewDebt::builder()
            .owner(owner)
            .counterparty(Uuid::new_v4())
            .total_amount(total)
            .cadence(Cadence::Monthly)
            .number_of_payments(count)
            .build()
            .unwrap()
    }

    fn pay(debt_id: DebtId, amount: Money, time: &SafeTimeProvider) -> NewPayment {
        NewPayment::builder()
            .debt_id(debt_id)
            .amount(amount)
            .payment_date(time.now())
            .build()
            .unwrap()
    }

    #[test]
    fn test_create_debt_defaults_currency_and_emits() {
        let (service, time, mut events) = setup();
        let owner = Uuid::new_v4();

        let debt = service
            .create_debt(monthly(owner, Money::from_major(1000), 4), &time, &mut events)
            .unwrap();

        assert_eq!(debt.currency.code(), "PHP");
        assert_eq!(debt.version, 1);
        assert_eq!(debt.status(), DebtStatus::Active);
        assert_eq!(debt.created_at, start());
        assert!(matches!(events.events()[0], Event::DebtCreated { .. }));
    }

    #[test]
    fn test_foreign_owner_sees_not_found() {
        let (service, time, mut events) = setup();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let debt = service
            .create_debt(monthly(owner, Money::from_major(1000), 4), &time, &mut events)
            .unwrap();
        let payment = service
            .record_payment(owner, pay(debt.id, Money::from_major(100), &time), &time, &mut events)
            .unwrap();

        assert!(matches!(service.get_debt(stranger, debt.id), Err(DebtError::DebtNotFound { .. })));
        assert!(matches!(
            service.get_payment(stranger, payment.id),
            Err(DebtError::PaymentNotFound { .. })
        ));
        assert!(matches!(
            service.record_payment(stranger, pay(debt.id, Money::from_major(1), &time), &time, &mut events),
            Err(DebtError::DebtNotFound { .. })
        ));
        assert!(service.list_debts(stranger).unwrap().is_empty());
    }

    #[test]
    fn test_record_payment_reconciles_ledger() {
        let (service, time, mut events) = setup();
        let owner = Uuid::new_v4();
        let debt = service
            .create_debt(monthly(owner, Money::from(dec!(1000.00)), 4), &time, &mut events)
            .unwrap();

        time.test_control().unwrap().advance(Duration::days(10));
        service
            .record_payment(owner, pay(debt.id, Money::from(dec!(400.00)), &time), &time, &mut events)
            .unwrap();

        let debt = service.get_debt(owner, debt.id).unwrap();
        assert_eq!(debt.paid_total(), Money::from_major(400));
        assert_eq!(debt.remaining_total(), Money::from_major(600));
        assert_eq!(debt.next_payment_date(), start() + Duration::days(10 + 31));

        let summary = service.payment_summary(owner, debt.id).unwrap();
        assert_eq!(summary.completed_payments, 1);
        assert_eq!(summary.remaining_installments, 3);
        assert_eq!(summary.percentage_paid.as_percentage(), dec!(40));
    }

    #[test]
    fn test_payment_currency_must_match() {
        let (service, time, mut events) = setup();
        let owner = Uuid::new_v4();
        let debt = service
            .create_debt(monthly(owner, Money::from_major(1000), 4), &time, &mut events)
            .unwrap();

        let usd = NewPayment::builder()
            .debt_id(debt.id)
            .amount(Money::from_major(100))
            .currency(Currency::new("USD").unwrap())
            .payment_date(time.now())
            .build()
            .unwrap();
        assert!(matches!(
            service.record_payment(owner, usd, &time, &mut events),
            Err(DebtError::Validation { .. })
        ));

        let too_fine = pay(debt.id, Money::from(dec!(10.001)), &time);
        assert!(matches!(
            service.record_payment(owner, too_fine, &time, &mut events),
            Err(DebtError::Validation { .. })
        ));
    }

    #[test]
    fn test_pending_payment_counts_after_verification() {
        let (service, time, mut events) = setup();
        let owner = Uuid::new_v4();
        let debt = service
            .create_debt(monthly(owner, Money::from_major(1000), 4), &time, &mut events)
            .unwrap();

        let pending = NewPayment::builder()
            .debt_id(debt.id)
            .amount(Money::from_major(250))
            .payment_date(time.now())
            .status(PaymentStatus::Pending)
            .build()
            .unwrap();
        let payment = service.record_payment(owner, pending, &time, &mut events).unwrap();
        assert_eq!(service.get_debt(owner, debt.id).unwrap().paid_total(), Money::ZERO);

        let verified = service
            .verify_payment(owner, payment.id, Verdict::Completed, Some("receipt seen".into()), &time, &mut events)
            .unwrap();
        assert_eq!(verified.status, PaymentStatus::Completed);
        assert_eq!(verified.verification.as_ref().unwrap().verified_by, owner);
        assert_eq!(service.get_debt(owner, debt.id).unwrap().paid_total(), Money::from_major(250));

        // a settled verification cannot be repeated
        assert!(service
            .verify_payment(owner, payment.id, Verdict::Rejected, None, &time, &mut events)
            .is_err());
    }

    #[test]
    fn test_update_and_delete_payment_keep_ledger_in_step() {
        let (service, time, mut events) = setup();
        let owner = Uuid::new_v4();
        let debt = service
            .create_debt(monthly(owner, Money::from_major(1000), 4), &time, &mut events)
            .unwrap();
        let payment = service
            .record_payment(owner, pay(debt.id, Money::from_major(1000), &time), &time, &mut events)
            .unwrap();
        assert_eq!(service.get_debt(owner, debt.id).unwrap().status(), DebtStatus::Settled);

        let update = PaymentUpdate {
            amount: Some(Money::from_major(300)),
            ..Default::default()
        };
        service.update_payment(owner, payment.id, update, &time, &mut events).unwrap();
        let reopened = service.get_debt(owner, debt.id).unwrap();
        assert_eq!(reopened.status(), DebtStatus::Active);
        assert_eq!(reopened.remaining_total(), Money::from_major(700));

        service.delete_payment(owner, payment.id, &time, &mut events).unwrap();
        assert_eq!(service.get_debt(owner, debt.id).unwrap().paid_total(), Money::ZERO);
        assert!(events.events().iter().any(|e| matches!(e, Event::PaymentRemoved { .. })));
    }

    #[test]
    fn test_update_debt_renormalizes_plan() {
        let (service, time, mut events) = setup();
        let owner = Uuid::new_v4();
        let debt = service
            .create_debt(monthly(owner, Money::from_major(1200), 4), &time, &mut events)
            .unwrap();
        service
            .record_payment(owner, pay(debt.id, Money::from_major(300), &time), &time, &mut events)
            .unwrap();
        events.clear();

        let update = DebtUpdate {
            number_of_payments: Some(6),
            notes: Some("stretched after job change".into()),
            ..Default::default()
        };
        let updated = service.update_debt(owner, debt.id, update, &time, &mut events).unwrap();

        assert_eq!(updated.number_of_payments(), 6);
        assert_eq!(updated.installment_amount(), Money::from_major(200));
        assert_eq!(updated.due_date(), start() + Duration::days(182));
        assert_eq!(updated.paid_total(), Money::from_major(300));
        assert_eq!(updated.notes.as_deref(), Some("stretched after job change"));
        assert!(events.events().iter().any(|e| matches!(e, Event::PlanRenormalized { .. })));

        let invalid = DebtUpdate {
            total_amount: Some(Money::ZERO),
            ..Default::default()
        };
        assert!(service.update_debt(owner, debt.id, invalid, &time, &mut events).is_err());
        assert_eq!(service.get_debt(owner, debt.id).unwrap().number_of_payments(), 6);
    }

    #[test]
    fn test_archive_survives_reconcile_and_hides_debt() {
        let (service, time, mut events) = setup();
        let owner = Uuid::new_v4();
        let debt = service
            .create_debt(monthly(owner, Money::from_major(1000), 4), &time, &mut events)
            .unwrap();

        service.archive_debt(owner, debt.id, &time, &mut events).unwrap();
        service
            .record_payment(owner, pay(debt.id, Money::from_major(1000), &time), &time, &mut events)
            .unwrap();
        assert_eq!(service.get_debt(owner, debt.id).unwrap().status(), DebtStatus::Archived);

        time.test_control().unwrap().advance(Duration::days(400));
        assert!(service.overdue_debts(owner, &time).unwrap().is_empty());
        assert!(service.upcoming_payments(owner, None, &time).unwrap().is_empty());
    }

    #[test]
    fn test_delete_debt_cascades_and_emits() {
        let (service, time, mut events) = setup();
        let owner = Uuid::new_v4();
        let debt = service
            .create_debt(monthly(owner, Money::from_major(1000), 4), &time, &mut events)
            .unwrap();
        let payment = service
            .record_payment(owner, pay(debt.id, Money::from_major(100), &time), &time, &mut events)
            .unwrap();

        service.delete_debt(owner, debt.id, &time, &mut events).unwrap();

        assert!(service.get_debt(owner, debt.id).is_err());
        assert!(service.store().get_payment(payment.id).unwrap().is_none());
        assert!(events
            .events()
            .iter()
            .any(|e| matches!(e, Event::DebtDeleted { payments_removed: 1, .. })));
    }

    #[test]
    fn test_backdated_debt_starts_overdue() {
        let (service, time, mut events) = setup();
        let owner = Uuid::new_v4();
        let new_debt = NewDebt::builder()
            .owner(owner)
            .counterparty(Uuid::new_v4())
            .total_amount(Money::from_major(500))
            .cadence(Cadence::Weekly)
            .number_of_payments(2)
            .created_at(start() - Duration::days(60))
            .build()
            .unwrap();

        let debt = service.create_debt(new_debt, &time, &mut events).unwrap();
        assert_eq!(debt.status(), DebtStatus::Overdue);
        assert_eq!(service.overdue_installments(owner, debt.id, &time).unwrap().len(), 2);
    }

    /// store whose ledger writes always lose the version race
    struct ContendedStore(MemoryStore);

    impl DebtStore for ContendedStore {
        fn insert_debt(&self, debt: Debt) -> Result<Debt> {
            self.0.insert_debt(debt)
        }

        fn get_debt(&self, id: DebtId) -> Result<Option<Debt>> {
            self.0.get_debt(id)
        }

        fn list_debts(&self, owner_id: OwnerId) -> Result<Vec<Debt>> {
            self.0.list_debts(owner_id)
        }

        fn update_debt(&self, debt: Debt, _expected_version: u64) -> Result<Debt> {
            Err(DebtError::ConcurrencyConflict {
                debt_id: debt.id,
                attempts: 1,
            })
        }

        fn delete_debt(&self, id: DebtId) -> Result<Option<(Debt, usize)>> {
            self.0.delete_debt(id)
        }

        fn insert_payment(&self, payment: Payment) -> Result<Payment> {
            self.0.insert_payment(payment)
        }

        fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>> {
            self.0.get_payment(id)
        }

        fn list_payments(&self, debt_id: DebtId) -> Result<Vec<Payment>> {
            self.0.list_payments(debt_id)
        }

        fn update_payment(&self, payment: Payment) -> Result<Payment> {
            self.0.update_payment(payment)
        }

        fn delete_payment(&self, id: PaymentId) -> Result<Option<Payment>> {
            self.0.delete_payment(id)
        }
    }

    #[test]
    fn test_stored_payment_is_not_reported_as_retryable() {
        let service = DebtService::new(ContendedStore(MemoryStore::new()), EngineConfig::default()).unwrap();
        let time = SafeTimeProvider::new(TimeSource::Test(start()));
        let mut events = EventStore::new();
        let owner = Uuid::new_v4();
        let debt = service
            .create_debt(monthly(owner, Money::from_major(1000), 4), &time, &mut events)
            .unwrap();

        // a caller retrying transient errors must not record the payment twice
        let mut attempts = 0;
        let payment = loop {
            attempts += 1;
            match service.record_payment(owner, pay(debt.id, Money::from_major(250), &time), &time, &mut events) {
                Err(e) if e.is_transient() && attempts < 3 => continue,
                other => break other.unwrap(),
            }
        };
        assert_eq!(attempts, 1);
        assert_eq!(service.list_payments(owner, debt.id).unwrap().len(), 1);
        // the cached ledger waits for the next successful reconcile
        assert_eq!(service.get_debt(owner, debt.id).unwrap().paid_total(), Money::ZERO);

        let update = PaymentUpdate {
            amount: Some(Money::from_major(300)),
            ..Default::default()
        };
        service.update_payment(owner, payment.id, update, &time, &mut events).unwrap();
        service.delete_payment(owner, payment.id, &time, &mut events).unwrap();

        let pending = NewPayment::builder()
            .debt_id(debt.id)
            .amount(Money::from_major(100))
            .payment_date(time.now())
            .status(PaymentStatus::Pending)
            .build()
            .unwrap();
        let pending = service.record_payment(owner, pending, &time, &mut events).unwrap();
        service
            .verify_payment(owner, pending.id, Verdict::Completed, None, &time, &mut events)
            .unwrap();
        assert_eq!(service.list_payments(owner, debt.id).unwrap().len(), 1);

        // edits that commit nothing before the ledger write still surface the conflict
        let err = service.archive_debt(owner, debt.id, &time, &mut events).unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_description_edit_skips_reconcile() {
        let (service, time, mut events) = setup();
        let owner = Uuid::new_v4();
        let debt = service
            .create_debt(monthly(owner, Money::from_major(1000), 4), &time, &mut events)
            .unwrap();
        let payment = service
            .record_payment(owner, pay(debt.id, Money::from_major(100), &time), &time, &mut events)
            .unwrap();
        events.clear();

        let update = PaymentUpdate {
            description: Some("cash handed over at lunch".into()),
            ..Default::default()
        };
        let updated = service.update_payment(owner, payment.id, update, &time, &mut events).unwrap();

        assert_eq!(updated.description.as_deref(), Some("cash handed over at lunch"));
        assert!(!events.events().iter().any(|e| matches!(e, Event::LedgerReconciled { .. })));
        assert_eq!(service.get_debt(owner, debt.id).unwrap().paid_total(), Money::from_major(100));
    }

    #[test]
    fn test_summary_counts_unpaid_slots_on_uneven_split() {
        let (service, time, mut events) = setup();
        let owner = Uuid::new_v4();
        let debt = service
            .create_debt(monthly(owner, Money::from(dec!(1000.00)), 3), &time, &mut events)
            .unwrap();
        assert_eq!(debt.installment_amount(), Money::from(dec!(333.33)));

        let fresh = service.payment_summary(owner, debt.id).unwrap();
        assert_eq!(fresh.remaining_installments, 3);

        service
            .record_payment(owner, pay(debt.id, Money::from(dec!(333.33)), &time), &time, &mut events)
            .unwrap();
        let after_one = service.payment_summary(owner, debt.id).unwrap();
        assert_eq!(after_one.remaining_installments, 2);
        assert_eq!(
            after_one.remaining_installments as usize,
            service.payment_schedule(owner, debt.id).unwrap().pending().count()
        );
    }
}
