use rust_decimal::Decimal;

use crate::decimal::{Money, Rate};
use crate::errors::{MortgageError, Result};

/// level monthly payment amortizing `balance` over `periods` months
///
/// EMI = P * i * (1 + i)^n / ((1 + i)^n - 1) with i the nominal monthly
/// rate. A zero rate spreads the balance evenly; zero periods is rejected.
pub fn annuity_payment(balance: Money, annual_rate: Rate, periods: u32) -> Result<Money> {
    if periods == 0 {
        return Err(MortgageError::DegenerateParameters {
            message: format!("cannot amortize {} over zero periods", balance),
        });
    }

    if annual_rate.is_zero() {
        return Ok(balance / Decimal::from(periods));
    }

    let i = annual_rate.monthly_rate();
    let overflow = || MortgageError::CalculationError {
        message: format!(
            "annuity of {} at {} over {} periods is out of range",
            balance, annual_rate, periods
        ),
    };

    let mut compound = Decimal::ONE;
    let base = Decimal::ONE + i;
    for _ in 0..periods {
        compound = compound.checked_mul(base).ok_or_else(overflow)?;
    }

    let numerator = balance
        .as_decimal()
        .checked_mul(i)
        .and_then(|n| n.checked_mul(compound))
        .ok_or_else(overflow)?;
    let denominator = compound - Decimal::ONE;

    Ok(Money::from_decimal(numerator.checked_div(denominator).ok_or_else(overflow)?))
}

/// interest saved by repaying `overpayment` now instead of financing it
///
/// Prices a scratch loan of the overpaid amount at the same rate over the
/// remaining term and returns its total interest.
pub fn profit_from_overpayment(overpayment: Money, annual_rate: Rate, remaining_periods: u32) -> Result<Money> {
    if overpayment.is_zero() {
        return Ok(Money::ZERO);
    }

    let scratch_annuity = annuity_payment(overpayment, annual_rate, remaining_periods)?;
    let repaid = scratch_annuity
        .as_decimal()
        .checked_mul(Decimal::from(remaining_periods))
        .ok_or_else(|| MortgageError::CalculationError {
            message: format!("profit on {} over {} periods is out of range", overpayment, remaining_periods),
        })?;
    Ok(Money::from_decimal(repaid - overpayment.as_decimal()))
}
