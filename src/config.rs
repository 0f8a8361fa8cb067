use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::calendar::DueDateCalendar;
use crate::decimal::{Money, Rate};
use crate::errors::{MortgageError, Result};

/// accrual applied to a carried-over rest each period it is carried
pub const CARRY_OVER_FACTOR: Decimal = dec!(1.005);

/// longest term accepted, in months
pub const MAX_PERIOD_MONTHS: u32 = 12 * 100;

/// loan terms fixed at origination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub origin_date: NaiveDate,
    pub principal: Money,
    pub annual_rate_percent: Decimal,
    pub period_months: u32,
}

impl LoanTerms {
    pub fn new(
        origin_date: NaiveDate,
        principal: Money,
        annual_rate_percent: Decimal,
        period_months: u32,
    ) -> Self {
        Self {
            origin_date,
            principal,
            annual_rate_percent,
            period_months,
        }
    }

    /// parse and validate terms from json
    pub fn from_json(json: &str) -> Result<Self> {
        let terms: LoanTerms = serde_json::from_str(json)?;
        terms.validate()?;
        Ok(terms)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.principal.is_positive() {
            return Err(MortgageError::InvalidConfiguration {
                message: format!("principal must be positive, got {}", self.principal),
            });
        }
        if self.annual_rate_percent < Decimal::ZERO {
            return Err(MortgageError::InvalidConfiguration {
                message: format!("annual rate cannot be negative, got {}%", self.annual_rate_percent),
            });
        }
        if self.period_months == 0 || self.period_months > MAX_PERIOD_MONTHS {
            return Err(MortgageError::InvalidConfiguration {
                message: format!(
                    "period must be between 1 and {} months, got {}",
                    MAX_PERIOD_MONTHS, self.period_months
                ),
            });
        }
        Ok(())
    }

    /// annual rate as a fraction
    pub fn rate(&self) -> Rate {
        Rate::from_percentage(self.annual_rate_percent)
    }

    pub fn calendar(&self) -> DueDateCalendar {
        DueDateCalendar::new(self.origin_date)
    }

    /// due date of the last scheduled period
    pub fn maturity_date(&self) -> NaiveDate {
        self.calendar().nth(self.period_months as i32)
    }
}
