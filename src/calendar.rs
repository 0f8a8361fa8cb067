//! Leap-aware calendar stepping for anchored monthly due dates.
//!
//! Mortgage due dates always target the origination day-of-month. Stepping
//! re-clamps that anchor for every target month, so a loan originated on
//! the 31st pays on Feb 28 and then again on Mar 31 rather than sticking
//! at the 28th.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const MIN_YEAR: i32 = 1;
pub const MAX_YEAR: i32 = 9999;

/// check if year is a leap year
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

pub fn days_in_year(year: i32) -> u32 {
    if is_leap_year(year) {
        366
    } else {
        365
    }
}

/// clamp year, month and day into a valid calendar date
///
/// Returns whether the components were already valid together with the
/// clamped date. Year is held to 1..=9999, month to 1..=12 and day to the
/// length of the resulting month.
pub fn clamp_date(year: i32, month: i32, day: i32) -> (bool, NaiveDate) {
    let y = year.clamp(MIN_YEAR, MAX_YEAR);
    let m = month.clamp(1, 12) as u32;
    let d = day.clamp(1, days_in_month(y, m) as i32) as u32;

    let was_valid = y == year && m as i32 == month && d as i32 == day;
    // components are clamped above so construction cannot fail
    let date = NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN);
    (was_valid, date)
}

/// add (or subtract) whole months, landing on the anchor day of the target month
pub fn add_months(date: NaiveDate, delta: i32, anchor_day: u32) -> NaiveDate {
    let total = date.year() * 12 + date.month0() as i32 + delta;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) + 1;
    clamp_date(year, month, anchor_day as i32).1
}

/// calendar month difference, ignoring day-of-month
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    (to.year() - from.year()) * 12 + (to.month() as i32 - from.month() as i32)
}

/// fraction of a year covered by the billing period starting at `prior_due`
///
/// When the period ends in January of a leap year the days up to Dec 31
/// are weighted by the old year's length and the rest by the new year's.
pub fn day_count_ratio(prior_due: NaiveDate, anchor_day: u32) -> Decimal {
    let next_due = add_months(prior_due, 1, anchor_day);

    if next_due.month() == 1 && is_leap_year(next_due.year()) {
        let year_end = clamp_date(prior_due.year(), 12, 31).1;
        let before = Decimal::from((year_end - prior_due).num_days())
            / Decimal::from(days_in_year(prior_due.year()));
        let after = Decimal::from((next_due - year_end).num_days())
            / Decimal::from(days_in_year(next_due.year()));
        before + after
    } else {
        Decimal::from((next_due - prior_due).num_days())
            / Decimal::from(days_in_year(next_due.year()))
    }
}

/// due-date calendar anchored at the loan origination date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueDateCalendar {
    origin: NaiveDate,
    anchor_day: u32,
}

impl DueDateCalendar {
    pub fn new(origin: NaiveDate) -> Self {
        Self {
            origin,
            anchor_day: origin.day(),
        }
    }

    pub fn anchor_day(&self) -> u32 {
        self.anchor_day
    }

    pub fn next(&self, date: NaiveDate) -> NaiveDate {
        add_months(date, 1, self.anchor_day)
    }

    pub fn prior(&self, date: NaiveDate) -> NaiveDate {
        add_months(date, -1, self.anchor_day)
    }

    /// the n-th due date after origination
    pub fn nth(&self, n: i32) -> NaiveDate {
        add_months(self.origin, n, self.anchor_day)
    }

    /// due date falling in the given month
    pub fn anchor(&self, year: i32, month: u32) -> NaiveDate {
        clamp_date(year, month as i32, self.anchor_day as i32).1
    }

    /// day-count ratio of the period that starts at `prior_due`
    pub fn ratio(&self, prior_due: NaiveDate) -> Decimal {
        day_count_ratio(prior_due, self.anchor_day)
    }

    /// whole periods elapsed between origination and `date`
    pub fn period_index(&self, date: NaiveDate) -> i32 {
        months_between(self.origin, date)
    }

    pub fn is_due_date(&self, date: NaiveDate) -> bool {
        self.anchor(date.year(), date.month()) == date
    }
}
