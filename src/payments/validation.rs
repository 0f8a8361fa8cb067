use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{MortgageError, Result};

use super::StagedPeriod;

/// verdict for one checked period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodOutcome {
    Accepted {
        /// payment below the annuity, made up from the previous rest
        covered_from_rest: bool,
    },
    /// payment pays off the whole remaining debt
    ClosesLoan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodCheck {
    pub due_date: NaiveDate,
    pub outcome: PeriodOutcome,
}

/// apply the acceptance rules to a staged batch, in date order
///
/// Stops at the first violation. Any period after one that closes the
/// loan is rejected as settled.
pub(crate) fn check_periods(periods: &[StagedPeriod]) -> Result<Vec<PeriodCheck>> {
    let mut checks = Vec::with_capacity(periods.len());
    let mut closed = false;

    for period in periods {
        let due_date = period.record.due_date;
        if closed {
            return Err(MortgageError::LoanSettled { date: due_date });
        }

        let outcome = check_period(period)?;
        closed = outcome == PeriodOutcome::ClosesLoan;
        checks.push(PeriodCheck { due_date, outcome });
    }

    Ok(checks)
}

/// whole units only: the annuity cannot resolve the last few cents
pub(crate) fn closes_loan(paid: Money, outstanding: Money) -> bool {
    paid.whole_units() == outstanding.whole_units()
}

fn check_period(period: &StagedPeriod) -> Result<PeriodOutcome> {
    let record = &period.record;
    let paid = record.total_paid();
    let rest = period.prior_rest;

    let mut covered_from_rest = false;
    if paid < record.annuity {
        if rest.is_positive() && paid + rest >= record.annuity {
            covered_from_rest = true;
        } else {
            return Err(MortgageError::ShortfallNotCovered {
                due_date: record.due_date,
                required: record.annuity - rest.max(Money::ZERO),
            });
        }
    }

    let outstanding = period.balance_before + record.bank_interest;
    if paid + rest > outstanding {
        return Err(MortgageError::ExceedsOutstandingDebt {
            due_date: record.due_date,
            outstanding,
        });
    }

    if closes_loan(paid, outstanding) {
        return Ok(PeriodOutcome::ClosesLoan);
    }

    Ok(PeriodOutcome::Accepted { covered_from_rest })
}
