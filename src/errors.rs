use chrono::NaiveDate;
use thiserror::Error;

use crate::decimal::Money;

#[derive(Error, Debug)]
pub enum MortgageError {
    #[error("invalid argument: {message}")]
    InvalidArgument {
        message: String,
    },

    #[error("degenerate annuity parameters: {message}")]
    DegenerateParameters {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("invalid date {date}: {message}")]
    InvalidDate {
        date: NaiveDate,
        message: String,
    },

    #[error("due date {date} is past loan maturity {maturity}")]
    BeyondTerm {
        date: NaiveDate,
        maturity: NaiveDate,
    },

    #[error("loan already settled, cannot process period {date}")]
    LoanSettled {
        date: NaiveDate,
    },

    #[error("payment for {due_date} below annuity and not covered by carried rest: at least {required} required")]
    ShortfallNotCovered {
        due_date: NaiveDate,
        required: Money,
    },

    #[error("payment for {due_date} exceeds outstanding debt {outstanding}")]
    ExceedsOutstandingDebt {
        due_date: NaiveDate,
        outstanding: Money,
    },

    #[error("calculation error: {message}")]
    CalculationError {
        message: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MortgageError>;
