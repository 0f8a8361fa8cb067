use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::payments::PaymentBranch;
use crate::state::LoanId;

/// all events that can be emitted by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    PaymentApplied {
        loan_id: LoanId,
        due_date: NaiveDate,
        total_paid: Money,
        bank_interest: Money,
        principal_portion: Money,
        balance_after: Money,
        branch: PaymentBranch,
    },
    AnnuityRecalculated {
        loan_id: LoanId,
        due_date: NaiveDate,
        overpayment: Money,
        old_annuity: Money,
        new_annuity: Money,
        period_months: u32,
        profit: Money,
    },
    LoanClosed {
        loan_id: LoanId,
        due_date: NaiveDate,
    },
    PaymentsRemoved {
        loan_id: LoanId,
        from_date: NaiveDate,
        removed: usize,
        current_date: NaiveDate,
    },
    StateRestored {
        loan_id: LoanId,
        snapshot_id: Uuid,
        current_date: NaiveDate,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default, Clone)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
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
}
