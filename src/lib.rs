pub mod calendar;
pub mod config;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod events;
pub mod payments;
pub mod planning;
pub mod state;
pub mod view;

// re-export key types
pub use calendar::DueDateCalendar;
pub use config::LoanTerms;
pub use decimal::{Money, Rate};
pub use engine::{AmortizationEngine, PaymentPreview};
pub use errors::{MortgageError, Result};
pub use events::{Event, EventStore};
pub use payments::{
    annuity_payment, Ledger, PaymentBranch, PaymentEvent, PaymentRecord, PeriodCheck, PeriodOutcome,
};
pub use state::{EngineSnapshot, LoanId, LoanState};
pub use view::{LoanView, RepaymentProgress};

// re-export external dependencies that users will need
pub use chrono;
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
