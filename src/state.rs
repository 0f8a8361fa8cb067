use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::LoanTerms;
use crate::decimal::Money;
use crate::errors::Result;
use crate::payments::{annuity_payment, Ledger, PaymentRecord};

/// unique identifier for a loan engine
pub type LoanId = Uuid;

/// moving part of the loan: everything that changes period to period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanState {
    pub balance: Money,
    pub period_months: u32,
    pub annuity: Money,
    /// due date of the latest processed period, origination when none
    pub current_date: NaiveDate,
    /// a payment covered the whole debt
    #[serde(default)]
    pub closed: bool,
}

impl LoanState {
    /// state at origination
    pub fn initial(terms: &LoanTerms) -> Result<Self> {
        Ok(Self {
            balance: terms.principal,
            period_months: terms.period_months,
            annuity: annuity_payment(terms.principal, terms.rate(), terms.period_months)?,
            current_date: terms.origin_date,
            closed: false,
        })
    }

    /// state right after `record` was processed
    ///
    /// A recalculated period re-derives the annuity from its balance and
    /// remaining term; a normal period leaves the annuity it was charged.
    pub fn after(record: &PaymentRecord, terms: &LoanTerms) -> Result<Self> {
        let annuity = if record.recalc {
            annuity_payment(record.balance_after, terms.rate(), record.period_after)?
        } else {
            record.annuity
        };

        Ok(Self {
            balance: record.balance_after,
            period_months: record.period_after,
            annuity,
            current_date: record.due_date,
            closed: record.closes_loan,
        })
    }

    pub fn is_settled(&self) -> bool {
        self.closed || !self.balance.is_positive()
    }
}

/// captured engine state that can be reapplied later
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub snapshot_id: Uuid,
    pub loan_id: LoanId,
    pub state: LoanState,
    pub ledger: Ledger,
}

impl EngineSnapshot {
    pub fn capture(loan_id: LoanId, state: LoanState, ledger: &Ledger) -> Self {
        Self {
            snapshot_id: Uuid::new_v4(),
            loan_id,
            state,
            ledger: ledger.clone(),
        }
    }
}
