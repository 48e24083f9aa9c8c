use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{Cadence, DebtId, DebtStatus, OwnerId, PaymentId, PaymentStatus};

/// all events that can be emitted by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // debt lifecycle events
    DebtCreated {
        debt_id: DebtId,
        owner_id: OwnerId,
        total_amount: Money,
        cadence: Cadence,
        number_of_payments: u32,
        due_date: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },
    PlanRenormalized {
        debt_id: DebtId,
        old_installment: Money,
        new_installment: Money,
        old_number_of_payments: u32,
        new_number_of_payments: u32,
        due_date: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },
    DebtArchived {
        debt_id: DebtId,
        remaining_total: Money,
        timestamp: DateTime<Utc>,
    },
    DebtDeleted {
        debt_id: DebtId,
        payments_removed: usize,
        timestamp: DateTime<Utc>,
    },

    // payment events
    PaymentRecorded {
        debt_id: DebtId,
        payment_id: PaymentId,
        amount: Money,
        status: PaymentStatus,
        payment_date: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },
    PaymentUpdated {
        debt_id: DebtId,
        payment_id: PaymentId,
        amount: Money,
        status: PaymentStatus,
        timestamp: DateTime<Utc>,
    },
    PaymentVerified {
        debt_id: DebtId,
        payment_id: PaymentId,
        status: PaymentStatus,
        verified_by: OwnerId,
        timestamp: DateTime<Utc>,
    },
    PaymentRemoved {
        debt_id: DebtId,
        payment_id: PaymentId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },

    // ledger events
    LedgerReconciled {
        debt_id: DebtId,
        paid_total: Money,
        remaining_total: Money,
        next_payment_date: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },
    StatusChanged {
        debt_id: DebtId,
        old_status: DebtStatus,
        new_status: DebtStatus,
        timestamp: DateTime<Utc>,
    },
    DebtSettled {
        debt_id: DebtId,
        paid_total: Money,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    pub fn debt_id(&self) -> DebtId {
        match self {
            Event::DebtCreated { debt_id, .. }
            | Event::PlanRenormalized { debt_id, .. }
            | Event::DebtArchived { debt_id, .. }
            | Event::DebtDeleted { debt_id, .. }
            | Event::PaymentRecorded { debt_id, .. }
            | Event::PaymentUpdated { debt_id, .. }
            | Event::PaymentVerified { debt_id, .. }
            | Event::PaymentRemoved { debt_id, .. }
            | Event::LedgerReconciled { debt_id, .. }
            | Event::StatusChanged { debt_id, .. }
            | Event::DebtSettled { debt_id, .. } => *debt_id,
        }
    }
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
