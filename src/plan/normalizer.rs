use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::EngineConfig;
use crate::decimal::Money;
use crate::errors::{DebtError, Result};
use crate::types::Cadence;

use super::period::{advance, whole_periods_between};
use super::{PaymentPlan, PlanBasis, PlanRequest};

/// resolves raw plan input into a canonical [`PaymentPlan`]
#[derive(Debug, Clone, Copy)]
pub struct PlanNormalizer {
    max_installments: u32,
}

impl PlanNormalizer {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            max_installments: config.max_installments,
        }
    }

    /// normalize a plan request.
    ///
    /// A payment count wins over a due date when both are present. The due
    /// date derived from a count of `n` is `n` periods after creation, which
    /// is also where the last slot of the schedule falls.
    ///
    /// Do not shorten that to `n - 1` periods: normalizing the derived due
    /// date must give back `n` payments (see
    /// `test_count_round_trips_through_due_date`), and a due date four months
    /// out must mean four monthly payments. Whole-period counting cannot
    /// satisfy both with `n - 1`.
    pub fn normalize(&self, request: &PlanRequest) -> Result<PaymentPlan> {
        let minor_units = request.currency.minor_units();

        if !request.total_amount.is_positive() {
            return Err(DebtError::validation(format!(
                "total amount must be positive, got {}",
                request.total_amount
            )));
        }
        if request.total_amount.as_decimal().scale() > minor_units {
            return Err(DebtError::validation(format!(
                "total amount {} is finer than the {} minor unit",
                request.total_amount, request.currency
            )));
        }

        let (number_of_payments, due_date, basis) =
            match (request.number_of_payments, request.due_date) {
                (Some(0), _) => {
                    return Err(DebtError::validation("number of payments must be at least 1"));
                }
                (Some(count), _) => {
                    let count = if request.cadence == Cadence::OneTime { 1 } else { count };
                    self.check_bound(count)?;
                    let due_date = advance(request.cadence, request.created_at, count)
                        .ok_or_else(|| DebtError::validation("derived due date is out of range"))?;
                    (count, due_date, PlanBasis::NumberOfPayments)
                }
                (None, Some(due_date)) => {
                    if due_date <= request.created_at {
                        return Err(DebtError::validation(format!(
                            "due date {} must be after creation {}",
                            due_date, request.created_at
                        )));
                    }
                    let count = match request.cadence {
                        Cadence::OneTime => 1,
                        cadence => whole_periods_between(cadence, request.created_at, due_date).max(1),
                    };
                    self.check_bound(count)?;
                    (count, due_date, PlanBasis::DueDate)
                }
                (None, None) => {
                    return Err(DebtError::validation(
                        "either a due date or a number of payments is required",
                    ));
                }
            };

        let installment_amount =
            split_installment(request.total_amount, number_of_payments, minor_units)?;

        let plan = PaymentPlan {
            cadence: request.cadence,
            total_amount: request.total_amount,
            installment_amount,
            number_of_payments,
            created_at: request.created_at,
            due_date,
            basis,
        };

        if !plan.final_installment().is_positive() {
            return Err(DebtError::validation(format!(
                "{} cannot be split into {} installments of {}",
                plan.total_amount, number_of_payments, installment_amount
            )));
        }

        debug!(
            cadence = %plan.cadence,
            installments = plan.number_of_payments,
            installment = %plan.installment_amount,
            "plan normalized"
        );

        Ok(plan)
    }

    /// next date a payment is expected.
    ///
    /// One period after the latest completed payment, or one period after
    /// creation when nothing has been paid. A one-time debt is always
    /// expected on its due date.
    pub fn next_payment_date(
        &self,
        plan: &PaymentPlan,
        last_payment_date: Option<DateTime<Utc>>,
    ) -> Result<DateTime<Utc>> {
        if plan.cadence == Cadence::OneTime {
            return Ok(plan.due_date);
        }

        let reference = last_payment_date.unwrap_or(plan.created_at);
        advance(plan.cadence, reference, 1)
            .ok_or_else(|| DebtError::validation("next payment date is out of range"))
    }

    fn check_bound(&self, count: u32) -> Result<()> {
        if count > self.max_installments {
            return Err(DebtError::validation(format!(
                "plan implies {} installments, limit is {}",
                count, self.max_installments
            )));
        }
        Ok(())
    }
}

/// total ÷ count, rounded half-up only when the exact share is finer than
/// the currency allows
fn split_installment(total: Money, count: u32, minor_units: u32) -> Result<Money> {
    let share = total
        .checked_div_count(count)
        .ok_or_else(|| DebtError::invariant("division by zero installments"))?;

    let installment = if share.as_decimal().normalize().scale() > minor_units {
        share.round_half_up(minor_units)
    } else {
        Money::from_decimal(share.as_decimal())
    };

    if !installment.is_positive() {
        return Err(DebtError::validation(format!(
            "{} is too small to split into {} installments",
            total, count
        )));
    }
    Ok(installment)
}
