//! serializable views of an engine for rendering collaborators
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::LoanTerms;
use crate::decimal::Money;
use crate::engine::AmortizationEngine;
use crate::errors::Result;
use crate::payments::PaymentRecord;
use crate::state::{LoanId, LoanState};

/// decimal places kept in progress fractions
const FRACTION_DP: u32 = 4;

/// share of the principal retired so far
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepaymentProgress {
    /// 1 - balance / principal, overpayments included
    pub repaid_fraction: Decimal,
    /// principal portions of the annuity alone, over the principal
    pub scheduled_fraction: Decimal,
}

impl RepaymentProgress {
    pub fn from_engine(engine: &AmortizationEngine) -> Self {
        let principal = engine.terms().principal.as_decimal();
        let balance = engine.balance().as_decimal();
        let scheduled = engine.ledger().total_principal().as_decimal();

        Self {
            repaid_fraction: (Decimal::ONE - balance / principal).round_dp(FRACTION_DP),
            scheduled_fraction: (scheduled / principal).round_dp(FRACTION_DP),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalsView {
    pub total_paid: Money,
    pub total_interest: Money,
    pub total_principal: Money,
    pub total_overpayment: Money,
    pub total_profit: Money,
}

/// serializable view of an engine's state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanView {
    pub loan_id: LoanId,
    pub terms: LoanTerms,
    pub initial_annuity: Money,
    pub maturity_date: NaiveDate,
    pub state: LoanState,
    pub next_due_date: Option<NaiveDate>,
    pub settled: bool,
    pub progress: RepaymentProgress,
    pub totals: TotalsView,
    pub records: Vec<PaymentRecord>,
}

impl LoanView {
    pub fn from_engine(engine: &AmortizationEngine) -> Self {
        let ledger = engine.ledger();
        let settled = engine.is_settled();

        LoanView {
            loan_id: engine.id(),
            terms: *engine.terms(),
            initial_annuity: engine.initial_state().annuity,
            maturity_date: engine.terms().maturity_date(),
            state: engine.state(),
            next_due_date: (!settled).then(|| engine.next_due_date()),
            settled,
            progress: RepaymentProgress::from_engine(engine),
            totals: TotalsView {
                total_paid: ledger.total_paid(),
                total_interest: ledger.total_interest(),
                total_principal: ledger.total_principal(),
                total_overpayment: ledger.total_overpayment(),
                total_profit: ledger.total_profit(),
            },
            records: ledger.iter().cloned().collect(),
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl AmortizationEngine {
    pub fn progress(&self) -> RepaymentProgress {
        RepaymentProgress::from_engine(self)
    }

    pub fn view(&self) -> LoanView {
        LoanView::from_engine(self)
    }
}
