use chrono::{DateTime, Datelike, Duration, Months, Utc};

use crate::types::Cadence;

/// length of one cadence period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Period {
    Days(i64),
    Months(u32),
}

fn period_of(cadence: Cadence) -> Period {
    match cadence {
        Cadence::Weekly => Period::Days(7),
        Cadence::Biweekly => Period::Days(14),
        // a one-time debt without an explicit due date falls due a month out
        Cadence::OneTime | Cadence::Monthly => Period::Months(1),
        Cadence::Quarterly => Period::Months(3),
        Cadence::Yearly => Period::Months(12),
    }
}

/// advance `from` by `periods` whole cadence periods.
///
/// Month based cadences are computed from the anchor in one step, so a
/// debt created on the 31st lands on the last day of shorter months without
/// drifting for the rest of the schedule. Returns `None` when the result is
/// outside chrono's range.
pub fn advance(cadence: Cadence, from: DateTime<Utc>, periods: u32) -> Option<DateTime<Utc>> {
    match period_of(cadence) {
        Period::Days(days) => {
            let total = days.checked_mul(periods as i64)?;
            from.checked_add_signed(Duration::try_days(total)?)
        }
        Period::Months(months) => {
            let total = months.checked_mul(periods)?;
            from.checked_add_months(Months::new(total))
        }
    }
}

/// count of whole cadence periods that fit between `start` and `end`.
///
/// This is the largest `k` with `advance(start, k) <= end`, and zero when
/// `end` is not after `start`.
pub fn whole_periods_between(cadence: Cadence, start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    if end <= start {
        return 0;
    }

    match period_of(cadence) {
        Period::Days(days) => {
            let elapsed = (end - start).num_days();
            u32::try_from(elapsed / days).unwrap_or(u32::MAX)
        }
        Period::Months(months) => whole_months_between(start, end) / months,
    }
}

fn whole_months_between(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    let mut months = (end.year() as i64 - start.year() as i64) * 12
        + (end.month() as i64 - start.month() as i64);

    if months <= 0 {
        return 0;
    }

    // same calendar month as `end`, so at most one step back is needed
    let candidate = u32::try_from(months).unwrap_or(u32::MAX);
    match start.checked_add_months(Months::new(candidate)) {
        Some(landed) if landed <= end => {}
        _ => months -= 1,
    }

    u32::try_from(months).unwrap_or(u32::MAX)
}
