pub mod amortization;
pub mod ledger;
pub mod validation;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;

pub use amortization::{annuity_payment, profit_from_overpayment};
pub use ledger::Ledger;
pub use validation::{PeriodCheck, PeriodOutcome};

/// payments submitted for one due date
///
/// `payments` holds one amount per payer in the order the payers were
/// entered. Only their sum takes part in the arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub payments: Vec<Money>,
    pub recalc: bool,
}

impl PaymentEvent {
    pub fn new(payments: Vec<Money>, recalc: bool) -> Self {
        Self { payments, recalc }
    }

    /// single payer paying the whole amount
    pub fn single(amount: Money, recalc: bool) -> Self {
        Self::new(vec![amount], recalc)
    }

    pub fn total(&self) -> Money {
        self.payments.iter().sum()
    }
}

/// how a period's surplus or deficit was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentBranch {
    /// difference to the annuity carried to the next period
    Normal,
    /// difference applied as an overpayment, annuity re-derived
    Recalc,
}

/// one processed billing period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub due_date: NaiveDate,
    pub payments: Vec<Money>,
    pub recalc: bool,
    /// annuity in effect when the period was processed
    pub annuity: Money,
    pub bank_interest: Money,
    pub principal_portion: Money,
    pub balance_after: Money,
    pub period_after: u32,
    pub carry_rest: Money,
    pub overpayment: Money,
    /// interest saved by the overpayment over the remaining term
    pub profit: Money,
    /// payment settled the whole debt in whole units
    #[serde(default)]
    pub closes_loan: bool,
}

impl PaymentRecord {
    pub fn branch(&self) -> PaymentBranch {
        if self.recalc {
            PaymentBranch::Recalc
        } else {
            PaymentBranch::Normal
        }
    }

    pub fn total_paid(&self) -> Money {
        self.payments.iter().sum()
    }
}

/// a computed period before it is committed to the ledger
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StagedPeriod {
    pub record: PaymentRecord,
    pub balance_before: Money,
    /// carry rest of the previous period, without accrual
    pub prior_rest: Money,
    pub annuity_after: Money,
}
