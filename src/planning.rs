use chrono::{Datelike, NaiveDate};
use log::debug;
use rust_decimal::Decimal;

use crate::decimal::Money;
use crate::engine::AmortizationEngine;
use crate::errors::{MortgageError, Result};

impl AmortizationEngine {
    /// due date on which a fixed monthly `payment` retires the loan
    ///
    /// Simulates paying `payment` every month from the current state,
    /// charging interest with the day-count ratio of each period, until the
    /// balance no longer exceeds one payment. The returned date is the due
    /// date of that final, smaller payment.
    pub fn solve_repayment_date_for_payment(&self, payment: Money) -> Result<NaiveDate> {
        if payment <= self.annuity() {
            return Err(MortgageError::InvalidArgument {
                message: format!(
                    "payment {} must exceed the current annuity {}",
                    payment,
                    self.annuity()
                ),
            });
        }

        let rate = self.rate().as_decimal();
        let calendar = self.calendar();
        let mut balance = self.balance();
        let mut date = self.current_date();

        while balance > payment {
            let interest = Money::from_decimal(balance.as_decimal() * rate * calendar.ratio(date));
            if payment <= interest {
                return Err(MortgageError::CalculationError {
                    message: format!(
                        "payment {} does not cover interest {} due {}",
                        payment,
                        interest,
                        calendar.next(date)
                    ),
                });
            }
            balance -= payment - interest;
            date = calendar.next(date);
        }

        let repaid_on = calendar.next(date);
        debug!("paying {} monthly repays the loan on {}", payment, repaid_on);
        Ok(repaid_on)
    }

    /// level monthly payment that retires the loan on `target`
    ///
    /// A target between due dates moves to the next due date. Each period
    /// compounds with its own day-count ratio:
    /// payment = B * prod(r_k) / (1 + r_n + r_n * r_(n-1) + ...).
    pub fn solve_repayment_payment_for_date(&self, target: NaiveDate) -> Result<Money> {
        if target <= self.current_date() {
            return Err(MortgageError::InvalidArgument {
                message: format!(
                    "target {} must fall after the latest processed date {}",
                    target,
                    self.current_date()
                ),
            });
        }

        let calendar = self.calendar();
        let anchored = calendar.anchor(target.year(), target.month());
        let target = if target > anchored {
            calendar.next(anchored)
        } else {
            anchored
        };

        let rate = self.rate().as_decimal();
        let mut date = self.current_date();
        let months = calendar.period_index(target) - calendar.period_index(date);
        let overflow = || MortgageError::CalculationError {
            message: format!("compounding {} month(s) up to {} is out of range", months, target),
        };

        let mut numerator = Decimal::ONE + rate * calendar.ratio(date);
        let mut denominator = Decimal::ONE;
        date = calendar.next(date);

        for _ in 1..months {
            let growth = Decimal::ONE + rate * calendar.ratio(date);
            numerator = numerator.checked_mul(growth).ok_or_else(overflow)?;
            denominator = growth
                .checked_mul(denominator)
                .and_then(|d| d.checked_add(Decimal::ONE))
                .ok_or_else(overflow)?;
            date = calendar.next(date);
        }

        let payment = self
            .balance()
            .as_decimal()
            .checked_mul(numerator)
            .and_then(|n| n.checked_div(denominator))
            .ok_or_else(overflow)?;
        let payment = Money::from_decimal(payment);
        debug!("repaying by {} takes {} over {} month(s)", target, payment, months);
        Ok(payment)
    }
}
