pub mod config;
pub mod debt;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod payment;
pub mod plan;
pub mod schedule;
pub mod serialization;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod types;
pub mod windows;

// re-export key types
pub use config::EngineConfig;
pub use debt::{Debt, DebtUpdate, NewDebt, NewDebtBuilder};
pub use decimal::{Money, Rate};
pub use errors::{DebtError, Result};
pub use events::{Event, EventStore};
pub use ledger::{Ledger, LedgerReconciler, Reconciled};
pub use payment::{NewPayment, NewPaymentBuilder, Payment, PaymentUpdate, Verification};
pub use plan::{PaymentPlan, PlanBasis, PlanNormalizer, PlanRequest};
pub use schedule::{Allocation, PaymentAllocator, ScheduleBuilder, ScheduleSlot, SlotStatus};
pub use serialization::{DebtView, PaymentSummary, ScheduleView};
pub use service::DebtService;
pub use store::{DebtStore, MemoryStore};
pub use types::{
    Cadence, CounterpartyId, Currency, DebtId, DebtStatus, DebtType, OwnerId, PaymentId,
    PaymentMethod, PaymentStatus, Verdict,
};
pub use windows::DueInstallment;

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
