use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::calendar::DueDateCalendar;
use crate::config::{LoanTerms, CARRY_OVER_FACTOR};
use crate::decimal::{Money, Rate};
use crate::errors::{MortgageError, Result};
use crate::events::{Event, EventStore};
use crate::payments::validation::{check_periods, closes_loan};
use crate::payments::{
    annuity_payment, profit_from_overpayment, Ledger, PaymentEvent, PaymentRecord, PeriodCheck,
    StagedPeriod,
};
use crate::state::{EngineSnapshot, LoanId, LoanState};

/// result of running a batch without committing it
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentPreview {
    pub records: Vec<PaymentRecord>,
    pub state: LoanState,
}

/// amortization engine for one borrower scenario
///
/// Owns the loan state and the ledger of processed periods. Every batch is
/// computed on a staged copy and committed only when all of its periods
/// succeed.
#[derive(Debug, Clone)]
pub struct AmortizationEngine {
    id: LoanId,
    terms: LoanTerms,
    rate: Rate,
    calendar: DueDateCalendar,
    initial: LoanState,
    state: LoanState,
    ledger: Ledger,
    events: EventStore,
}

impl AmortizationEngine {
    /// create engine and derive the initial annuity
    pub fn new(
        origin_date: NaiveDate,
        principal: Money,
        annual_rate_percent: Decimal,
        period_months: u32,
    ) -> Result<Self> {
        Self::from_terms(LoanTerms::new(origin_date, principal, annual_rate_percent, period_months))
    }

    pub fn from_terms(terms: LoanTerms) -> Result<Self> {
        terms.validate()?;
        let initial = LoanState::initial(&terms)?;

        debug!(
            "loan of {} at {} over {} months, annuity {}",
            terms.principal,
            terms.rate(),
            terms.period_months,
            initial.annuity
        );

        Ok(Self {
            id: Uuid::new_v4(),
            rate: terms.rate(),
            calendar: terms.calendar(),
            terms,
            initial,
            state: initial,
            ledger: Ledger::new(),
            events: EventStore::new(),
        })
    }

    pub fn id(&self) -> LoanId {
        self.id
    }

    pub fn terms(&self) -> &LoanTerms {
        &self.terms
    }

    pub fn rate(&self) -> Rate {
        self.rate
    }

    pub fn calendar(&self) -> &DueDateCalendar {
        &self.calendar
    }

    pub fn state(&self) -> LoanState {
        self.state
    }

    /// state at origination, before any period was processed
    pub fn initial_state(&self) -> LoanState {
        self.initial
    }

    pub fn balance(&self) -> Money {
        self.state.balance
    }

    pub fn annuity(&self) -> Money {
        self.state.annuity
    }

    pub fn period_months(&self) -> u32 {
        self.state.period_months
    }

    pub fn current_date(&self) -> NaiveDate {
        self.state.current_date
    }

    pub fn next_due_date(&self) -> NaiveDate {
        self.calendar.next(self.state.current_date)
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn is_settled(&self) -> bool {
        self.state.is_settled()
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    /// process a batch of payment events in due-date order
    ///
    /// Input order does not matter. Nothing is committed if any period of
    /// the batch fails.
    pub fn process_payments<I>(&mut self, events: I) -> Result<LoanState>
    where
        I: IntoIterator<Item = (NaiveDate, PaymentEvent)>,
    {
        let batch: BTreeMap<NaiveDate, PaymentEvent> = events.into_iter().collect();
        let (periods, state) = self.stage(&batch)?;

        for period in periods {
            self.commit(period);
        }
        self.state = state;

        info!(
            "committed {} period(s), balance {} annuity {} as of {}",
            batch.len(),
            state.balance,
            state.annuity,
            state.current_date
        );
        Ok(state)
    }

    /// compute a batch against the current state without committing it
    pub fn preview_payments<I>(&self, events: I) -> Result<PaymentPreview>
    where
        I: IntoIterator<Item = (NaiveDate, PaymentEvent)>,
    {
        let batch: BTreeMap<NaiveDate, PaymentEvent> = events.into_iter().collect();
        let (periods, state) = self.stage(&batch)?;

        Ok(PaymentPreview {
            records: periods.into_iter().map(|p| p.record).collect(),
            state,
        })
    }

    /// run the acceptance rules over a batch without committing it
    pub fn check_payments<I>(&self, events: I) -> Result<Vec<PeriodCheck>>
    where
        I: IntoIterator<Item = (NaiveDate, PaymentEvent)>,
    {
        let batch: BTreeMap<NaiveDate, PaymentEvent> = events.into_iter().collect();
        let (periods, _) = self.stage(&batch)?;
        check_periods(&periods)
    }

    /// delete every period on or after `from_date` and rewind the state
    ///
    /// Returns the removed records. Removing past the latest period is a
    /// no-op.
    pub fn remove_payments(&mut self, from_date: NaiveDate) -> Result<Vec<PaymentRecord>> {
        if self.ledger.range_from(from_date).next().is_none() {
            return Ok(Vec::new());
        }

        let state = match self.ledger.latest_before(from_date) {
            Some(record) => LoanState::after(record, &self.terms)?,
            None => self.initial,
        };

        let removed = self.ledger.remove_from(from_date);
        self.state = state;

        info!(
            "removed {} period(s) from {}, rewound to {}",
            removed.len(),
            from_date,
            state.current_date
        );
        self.events.emit(Event::PaymentsRemoved {
            loan_id: self.id,
            from_date,
            removed: removed.len(),
            current_date: state.current_date,
        });

        Ok(removed)
    }

    /// capture state and ledger for a later `restore`
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot::capture(self.id, self.state, &self.ledger)
    }

    pub fn restore(&mut self, snapshot: EngineSnapshot) -> Result<()> {
        if snapshot.loan_id != self.id {
            return Err(MortgageError::InvalidArgument {
                message: format!(
                    "snapshot belongs to loan {}, not {}",
                    snapshot.loan_id, self.id
                ),
            });
        }

        self.state = snapshot.state;
        self.ledger = snapshot.ledger;

        info!("restored snapshot {} at {}", snapshot.snapshot_id, self.state.current_date);
        self.events.emit(Event::StateRestored {
            loan_id: self.id,
            snapshot_id: snapshot.snapshot_id,
            current_date: self.state.current_date,
        });
        Ok(())
    }

    fn validate_batch(&self, batch: &BTreeMap<NaiveDate, PaymentEvent>) -> Result<()> {
        let maturity = self.terms.maturity_date();

        for &date in batch.keys() {
            if date <= self.terms.origin_date {
                return Err(MortgageError::InvalidDate {
                    date,
                    message: format!("due dates start after origination on {}", self.terms.origin_date),
                });
            }
            if !self.calendar.is_due_date(date) {
                return Err(MortgageError::InvalidDate {
                    date,
                    message: format!("not a due date, payments fall on day {}", self.calendar.anchor_day()),
                });
            }
            if date > maturity {
                return Err(MortgageError::BeyondTerm { date, maturity });
            }
        }
        Ok(())
    }

    /// compute every period of the batch on a copy of the state
    fn stage(&self, batch: &BTreeMap<NaiveDate, PaymentEvent>) -> Result<(Vec<StagedPeriod>, LoanState)> {
        self.validate_batch(batch)?;

        let mut state = self.state;
        let mut staged_rests: BTreeMap<NaiveDate, Money> = BTreeMap::new();
        let mut periods = Vec::with_capacity(batch.len());

        for (&date, event) in batch {
            if state.is_settled() {
                return Err(MortgageError::LoanSettled { date });
            }

            let prior_due = self.calendar.prior(date);
            let prior_rest = if prior_due == self.terms.origin_date {
                Money::ZERO
            } else {
                match staged_rests.get(&prior_due).copied().or_else(|| self.ledger.carry_rest_at(prior_due)) {
                    Some(rest) => rest,
                    None => {
                        warn!("no period recorded for {}, carrying no rest into {}", prior_due, date);
                        Money::ZERO
                    }
                }
            };

            let period = self.compute_period(&mut state, date, event, prior_due, prior_rest)?;
            staged_rests.insert(date, period.record.carry_rest);
            periods.push(period);
        }

        Ok((periods, state))
    }

    /// one billing period: interest, principal, then carry or overpayment
    fn compute_period(
        &self,
        state: &mut LoanState,
        date: NaiveDate,
        event: &PaymentEvent,
        prior_due: NaiveDate,
        prior_rest: Money,
    ) -> Result<StagedPeriod> {
        let annuity = state.annuity;
        let balance_before = state.balance;

        let bank_interest = Money::from_decimal(
            balance_before.as_decimal() * self.rate.as_decimal() * self.calendar.ratio(prior_due),
        );
        let principal_portion = annuity - bank_interest;
        state.balance = balance_before - principal_portion;

        let paid = event.total();
        let closes = closes_loan(paid, balance_before + bank_interest);
        let difference = Money::from_decimal(
            paid.as_decimal() - annuity.as_decimal() + prior_rest.as_decimal() * CARRY_OVER_FACTOR,
        );

        let (carry_rest, overpayment, profit) = if event.recalc {
            state.balance = state.balance - difference;
            state.period_months = self.remaining_periods(date)?;
            let profit = profit_from_overpayment(difference, self.rate, state.period_months)?;
            state.annuity = annuity_payment(state.balance, self.rate, state.period_months)?;
            (Money::ZERO, difference, profit)
        } else {
            (difference, Money::ZERO, Money::ZERO)
        };
        state.current_date = date;
        state.closed = closes;

        debug!(
            "{}: paid {} interest {} principal {} balance {} rest {} overpayment {}",
            date, paid, bank_interest, principal_portion, state.balance, carry_rest, overpayment
        );

        Ok(StagedPeriod {
            record: PaymentRecord {
                due_date: date,
                payments: event.payments.clone(),
                recalc: event.recalc,
                annuity,
                bank_interest,
                principal_portion,
                balance_after: state.balance,
                period_after: state.period_months,
                carry_rest,
                overpayment,
                profit,
                closes_loan: closes,
            },
            balance_before,
            prior_rest,
            annuity_after: state.annuity,
        })
    }

    /// full term less the periods elapsed up to `date`
    fn remaining_periods(&self, date: NaiveDate) -> Result<u32> {
        let elapsed = self.calendar.period_index(date);
        u32::try_from(self.terms.period_months as i64 - elapsed as i64).map_err(|_| {
            MortgageError::BeyondTerm {
                date,
                maturity: self.terms.maturity_date(),
            }
        })
    }

    fn commit(&mut self, period: StagedPeriod) {
        let record = period.record;
        self.events.emit(Event::PaymentApplied {
            loan_id: self.id,
            due_date: record.due_date,
            total_paid: record.total_paid(),
            bank_interest: record.bank_interest,
            principal_portion: record.principal_portion,
            balance_after: record.balance_after,
            branch: record.branch(),
        });

        if record.recalc {
            self.events.emit(Event::AnnuityRecalculated {
                loan_id: self.id,
                due_date: record.due_date,
                overpayment: record.overpayment,
                old_annuity: record.annuity,
                new_annuity: period.annuity_after,
                period_months: record.period_after,
                profit: record.profit,
            });
        }

        if record.closes_loan || !record.balance_after.is_positive() {
            info!("loan closed on {}", record.due_date);
            self.events.emit(Event::LoanClosed {
                loan_id: self.id,
                due_date: record.due_date,
            });
        }

        self.ledger.insert(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::PeriodOutcome;
    use rust_decimal_macros::dec;
    use test_log::test;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn money(s: &str) -> Money {
        Money::from_str_exact(s).unwrap()
    }

    fn payers(first: i64, second: i64, recalc: bool) -> PaymentEvent {
        PaymentEvent::new(vec![Money::from_major(first), Money::from_major(second)], recalc)
    }

    fn sample_engine() -> AmortizationEngine {
        AmortizationEngine::new(ymd(2013, 7, 3), Money::from_major(900_000), dec!(14.5), 120).unwrap()
    }

    fn sample_history() -> Vec<(NaiveDate, PaymentEvent)> {
        vec![
            (ymd(2013, 8, 3), payers(65_000, 0, true)),
            (ymd(2013, 9, 3), payers(18_000, 0, true)),
            (ymd(2013, 10, 3), payers(13_373, 0, false)),
            (ymd(2013, 11, 3), payers(19_637, 0, true)),
            (ymd(2013, 12, 3), payers(47_400, 10_000, true)),
            (ymd(2014, 1, 3), payers(30_000, 40_000, true)),
            (ymd(2014, 2, 3), payers(32_000, 10_000, true)),
            (ymd(2014, 3, 3), payers(30_000, 50_000, true)),
            (ymd(2014, 4, 3), payers(14_000, 10_000, true)),
            (ymd(2014, 5, 3), payers(10_000, 0, false)),
            (ymd(2014, 6, 3), payers(14_000, 11_000, true)),
        ]
    }

    fn small_engine() -> AmortizationEngine {
        AmortizationEngine::new(ymd(2013, 7, 3), Money::from_major(100_000), dec!(12), 12).unwrap()
    }

    #[test]
    fn test_initial_annuity() {
        let engine = sample_engine();
        assert_eq!(engine.annuity(), money("14245.81"));
        assert_eq!(engine.balance(), Money::from_major(900_000));
        assert_eq!(engine.period_months(), 120);
        assert_eq!(engine.current_date(), ymd(2013, 7, 3));
        assert_eq!(engine.next_due_date(), ymd(2013, 8, 3));
        assert!(engine.ledger().is_empty());
    }

    #[test]
    fn test_rejects_degenerate_terms() {
        let result = AmortizationEngine::new(ymd(2013, 7, 3), Money::from_major(900_000), dec!(14.5), 0);
        assert!(matches!(result, Err(MortgageError::InvalidConfiguration { .. })));

        let result = AmortizationEngine::new(ymd(2013, 7, 3), Money::from_major(900_000), dec!(100), 1_200);
        assert!(matches!(result, Err(MortgageError::CalculationError { .. })));
    }

    #[test]
    fn test_sample_history_reproduced() {
        let mut engine = sample_engine();
        engine.process_payments(sample_history()).unwrap();
        engine
            .process_payments(vec![(ymd(2014, 7, 3), payers(30_000, 0, true))])
            .unwrap();

        // due date, annuity, interest, principal, balance, period, rest, overpayment, profit
        let expected = [
            ((2013, 8), "14245.81", "11083.56", "3162.25", "846083.56", 119, "0", "50754.19", "45206.22"),
            ((2013, 9), "13442.73", "10419.58", "3023.15", "838503.14", 118, "0", "4557.27", "4018.97"),
            ((2013, 10), "13373.18", "9993.12", "3380.06", "835123.08", 118, "-0.18", "0", "0"),
            ((2013, 11), "13373.18", "10284.60", "3088.58", "825770.86", 116, "0", "6263.64", "5415.24"),
            ((2013, 12), "13273.35", "9841.38", "3431.97", "778212.24", 115, "0", "44126.65", "37768.30"),
            ((2014, 1), "12559.01", "9583.74", "2975.27", "717795.98", 114, "0", "57440.99", "48666.79"),
            ((2014, 2), "11631.16", "8839.71", "2791.45", "684635.69", 113, "0", "30368.84", "25467.85"),
            ((2014, 3), "11139.74", "7615.40", "3524.34", "612251.09", 112, "0", "68860.26", "57155.42"),
            ((2014, 4), "10003.86", "7539.91", "2463.95", "595791.00", 111, "0", "13996.14", "11497.23"),
            ((2014, 5), "9776.52", "7100.52", "2676.00", "593115.00", 111, "223.48", "0", "0"),
            ((2014, 6), "9776.52", "7304.25", "2472.27", "575194.65", 109, "0", "15448.08", "12425.40"),
            ((2014, 7), "9521.42", "6855.06", "2666.36", "552049.71", 108, "0", "20478.58", "16296.50"),
        ];

        assert_eq!(engine.ledger().len(), expected.len());
        for (((y, m), annuity, interest, principal, balance, period, rest, over, profit), record) in
            expected.iter().zip(engine.ledger().iter())
        {
            assert_eq!(record.due_date, ymd(*y, *m, 3));
            assert_eq!(record.annuity, money(annuity), "annuity on {}", record.due_date);
            assert_eq!(record.bank_interest, money(interest), "interest on {}", record.due_date);
            assert_eq!(record.principal_portion, money(principal), "principal on {}", record.due_date);
            assert_eq!(record.balance_after, money(balance), "balance on {}", record.due_date);
            assert_eq!(record.period_after, *period, "period on {}", record.due_date);
            assert_eq!(record.carry_rest, money(rest), "rest on {}", record.due_date);
            assert_eq!(record.overpayment, money(over), "overpayment on {}", record.due_date);
            assert_eq!(record.profit, money(profit), "profit on {}", record.due_date);
        }

        assert_eq!(engine.annuity(), money("9179.33"));
        assert_eq!(engine.balance(), money("552049.71"));
        assert_eq!(engine.period_months(), 108);
        assert_eq!(engine.current_date(), ymd(2014, 7, 3));
    }

    #[test]
    fn test_branch_invariant() {
        let mut engine = sample_engine();
        engine.process_payments(sample_history()).unwrap();

        for record in engine.ledger() {
            if record.recalc {
                assert!(record.carry_rest.is_zero());
            } else {
                assert!(record.overpayment.is_zero());
                assert!(record.profit.is_zero());
            }
        }
    }

    #[test]
    fn test_input_order_is_normalized() {
        let mut forward = sample_engine();
        forward.process_payments(sample_history()).unwrap();

        let mut reversed = sample_engine();
        reversed.process_payments(sample_history().into_iter().rev()).unwrap();

        assert_eq!(forward.state(), reversed.state());
        assert_eq!(forward.ledger(), reversed.ledger());
    }

    #[test]
    fn test_balance_never_increases_with_valid_payments() {
        let mut engine = sample_engine();
        engine.process_payments(sample_history()).unwrap();

        let mut previous = engine.initial_state().balance;
        for record in engine.ledger() {
            assert!(record.balance_after <= previous);
            previous = record.balance_after;
        }
    }

    #[test]
    fn test_rollback_restores_prior_state() {
        let mut engine = sample_engine();
        let history = sample_history();
        engine.process_payments(history[..9].to_vec()).unwrap();
        let before = engine.state();

        let batch = history[9..].to_vec();
        engine.process_payments(batch.clone()).unwrap();
        assert_ne!(engine.state(), before);

        let removed = engine.remove_payments(batch[0].0).unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(engine.state(), before);
        assert_eq!(engine.ledger().len(), 9);
    }

    #[test]
    fn test_rollback_onto_normal_period_keeps_its_annuity() {
        let mut engine = sample_engine();
        let history = sample_history();
        engine.process_payments(history[..10].to_vec()).unwrap();
        let before = engine.state();
        assert_eq!(before.annuity, money("9776.52"));

        engine.process_payments(history[10..].to_vec()).unwrap();
        engine.remove_payments(ymd(2014, 6, 3)).unwrap();
        assert_eq!(engine.state(), before);
    }

    #[test]
    fn test_rollback_to_origination() {
        let mut engine = sample_engine();
        engine.process_payments(sample_history()).unwrap();

        engine.remove_payments(ymd(2013, 8, 3)).unwrap();
        assert!(engine.ledger().is_empty());
        assert_eq!(engine.state(), engine.initial_state());
        assert_eq!(engine.annuity(), money("14245.81"));
    }

    #[test]
    fn test_remove_past_latest_is_noop() {
        let mut engine = sample_engine();
        engine.process_payments(sample_history()).unwrap();
        let before = engine.state();
        engine.take_events();

        let removed = engine.remove_payments(ymd(2015, 1, 3)).unwrap();
        assert!(removed.is_empty());
        assert_eq!(engine.state(), before);
        assert!(engine.events().is_empty());
    }

    #[test]
    fn test_carry_rest_accumulates_until_recalc() {
        let mut engine = small_engine();
        let annuity = engine.annuity();
        assert_eq!(annuity, money("8884.88"));

        let short = annuity - Money::from_major(1);
        engine
            .process_payments(vec![
                (ymd(2013, 8, 3), PaymentEvent::single(short, false)),
                (ymd(2013, 9, 3), PaymentEvent::single(short, false)),
                (ymd(2013, 10, 3), PaymentEvent::single(short, false)),
            ])
            .unwrap();

        let rests: Vec<Money> = engine.ledger().iter().map(|r| r.carry_rest).collect();
        assert_eq!(rests, vec![money("-1.00"), money("-2.00"), money("-3.01")]);
        assert!(rests.windows(2).all(|w| w[1] < w[0]));
        assert_eq!(engine.annuity(), annuity);
        assert_eq!(engine.period_months(), 12);

        engine
            .process_payments(vec![(ymd(2013, 11, 3), PaymentEvent::single(annuity, true))])
            .unwrap();
        let record = engine.ledger().latest().unwrap();
        assert!(record.carry_rest.is_zero());
        assert_eq!(record.overpayment, money("-3.03"));
        assert_eq!(record.profit, money("-0.17"));
        assert_eq!(record.period_after, 8);
        assert_eq!(record.balance_after, money("68027.99"));
    }

    #[test]
    fn test_missing_prior_period_carries_nothing() {
        let mut engine = sample_engine();
        engine
            .process_payments(vec![(ymd(2013, 9, 3), PaymentEvent::single(Money::from_major(14_000), false))])
            .unwrap();

        let record = engine.ledger().latest().unwrap();
        assert_eq!(record.carry_rest, Money::from_major(14_000) - money("14245.81"));
    }

    #[test]
    fn test_loan_closure() {
        let mut engine = small_engine();
        let first = ymd(2013, 8, 3);
        let probe = engine
            .preview_payments(vec![(first, PaymentEvent::single(engine.annuity(), true))])
            .unwrap();
        let interest = probe.records[0].bank_interest;
        assert_eq!(interest, money("1019.18"));

        let payoff = engine.balance() + interest;
        let checks = engine
            .check_payments(vec![(first, PaymentEvent::single(payoff, true))])
            .unwrap();
        assert_eq!(checks[0].outcome, PeriodOutcome::ClosesLoan);

        let too_much = payoff + Money::from_major(1);
        assert!(matches!(
            engine.check_payments(vec![(first, PaymentEvent::single(too_much, true))]),
            Err(MortgageError::ExceedsOutstandingDebt { .. })
        ));

        engine
            .process_payments(vec![(first, PaymentEvent::single(payoff, true))])
            .unwrap();
        assert_eq!(engine.balance(), Money::ZERO);
        assert!(engine.is_settled());
        assert!(engine
            .events()
            .iter()
            .any(|e| matches!(e, Event::LoanClosed { due_date, .. } if *due_date == first)));

        let later = engine.process_payments(vec![(ymd(2013, 9, 3), PaymentEvent::single(Money::from_major(100), false))]);
        assert!(matches!(later, Err(MortgageError::LoanSettled { .. })));
    }

    #[test]
    fn test_whole_unit_payment_settles_loan() {
        let mut engine = small_engine();
        let first = ymd(2013, 8, 3);
        let payoff = PaymentEvent::single(Money::from_major(101_019), true);

        let checks = engine.check_payments(vec![(first, payoff.clone())]).unwrap();
        assert_eq!(checks[0].outcome, PeriodOutcome::ClosesLoan);

        engine.process_payments(vec![(first, payoff.clone())]).unwrap();
        assert_eq!(engine.balance(), money("0.18"));
        assert!(engine.is_settled());
        assert!(engine.ledger().latest().unwrap().closes_loan);
        assert!(engine.events().iter().any(|e| matches!(e, Event::LoanClosed { .. })));

        let later = engine.process_payments(vec![(ymd(2013, 9, 3), PaymentEvent::single(money("0.18"), false))]);
        assert!(matches!(later, Err(MortgageError::LoanSettled { .. })));
        assert_eq!(engine.ledger().len(), 1);

        // rolling the closing period back reopens the loan
        engine.remove_payments(first).unwrap();
        assert!(!engine.is_settled());
        engine
            .process_payments(vec![(first, PaymentEvent::single(engine.annuity(), false))])
            .unwrap();
        assert!(!engine.is_settled());
    }

    #[test]
    fn test_check_payments_flags_uncovered_shortfall() {
        let engine = sample_engine();
        let checks = engine
            .check_payments(vec![(ymd(2013, 8, 3), payers(65_000, 0, true))])
            .unwrap();
        assert_eq!(checks[0].outcome, PeriodOutcome::Accepted { covered_from_rest: false });

        let result = engine.check_payments(vec![(ymd(2013, 8, 3), payers(14_000, 0, false))]);
        match result {
            Err(MortgageError::ShortfallNotCovered { required, .. }) => assert_eq!(required, money("14245.81")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_failed_batch_commits_nothing() {
        let mut engine = sample_engine();
        let result = engine.process_payments(vec![
            (ymd(2013, 8, 3), payers(65_000, 0, true)),
            (ymd(2013, 9, 15), payers(18_000, 0, true)),
        ]);
        assert!(matches!(result, Err(MortgageError::InvalidDate { .. })));
        assert!(engine.ledger().is_empty());
        assert_eq!(engine.state(), engine.initial_state());
        assert!(engine.events().is_empty());

        let at_origin = engine.process_payments(vec![(ymd(2013, 7, 3), payers(1, 0, false))]);
        assert!(matches!(at_origin, Err(MortgageError::InvalidDate { .. })));

        let beyond = engine.process_payments(vec![(ymd(2023, 8, 3), payers(1, 0, false))]);
        assert!(matches!(beyond, Err(MortgageError::BeyondTerm { .. })));
    }

    #[test]
    fn test_preview_does_not_mutate() {
        let engine = sample_engine();
        let preview = engine.preview_payments(sample_history()).unwrap();

        assert_eq!(preview.records.len(), 11);
        assert_eq!(preview.state.balance, money("575194.65"));
        assert_eq!(engine.state(), engine.initial_state());
        assert!(engine.ledger().is_empty());
    }

    #[test]
    fn test_snapshot_restore() {
        let mut engine = sample_engine();
        engine.process_payments(sample_history()[..4].to_vec()).unwrap();
        let snapshot = engine.snapshot();

        engine.process_payments(sample_history()[4..].to_vec()).unwrap();
        assert_eq!(engine.ledger().len(), 11);

        engine.restore(snapshot.clone()).unwrap();
        assert_eq!(engine.state(), snapshot.state);
        assert_eq!(engine.ledger().len(), 4);
        assert_eq!(engine.current_date(), ymd(2013, 11, 3));

        let mut other = sample_engine();
        assert!(matches!(other.restore(snapshot), Err(MortgageError::InvalidArgument { .. })));
    }

    #[test]
    fn test_events_emitted() {
        let mut engine = sample_engine();
        engine.process_payments(sample_history()).unwrap();

        let events = engine.take_events();
        let applied = events.iter().filter(|e| matches!(e, Event::PaymentApplied { .. })).count();
        let recalculated: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                Event::AnnuityRecalculated { new_annuity, .. } => Some(*new_annuity),
                _ => None,
            })
            .collect();
        assert_eq!(applied, 11);
        assert_eq!(recalculated.len(), 9);
        assert_eq!(recalculated[0], money("13442.73"));
        assert!(engine.events().is_empty());

        engine.remove_payments(ymd(2014, 1, 3)).unwrap();
        assert!(matches!(
            engine.events(),
            [Event::PaymentsRemoved { removed: 6, .. }]
        ));
    }

    #[test]
    fn test_zero_rate_loan() {
        let mut engine =
            AmortizationEngine::new(ymd(2013, 7, 3), Money::from_major(120_000), Decimal::ZERO, 12).unwrap();
        assert_eq!(engine.annuity(), Money::from_major(10_000));

        engine
            .process_payments(vec![(ymd(2013, 8, 3), PaymentEvent::single(Money::from_major(10_000), false))])
            .unwrap();
        let record = engine.ledger().latest().unwrap();
        assert_eq!(record.bank_interest, Money::ZERO);
        assert_eq!(record.balance_after, Money::from_major(110_000));
        assert!(record.carry_rest.is_zero());
    }

    #[test]
    fn test_end_of_month_origination() {
        let mut engine =
            AmortizationEngine::new(ymd(2015, 1, 31), Money::from_major(100_000), dec!(12), 12).unwrap();
        assert_eq!(engine.next_due_date(), ymd(2015, 2, 28));

        let annuity = engine.annuity();
        engine
            .process_payments(vec![
                (ymd(2015, 2, 28), PaymentEvent::single(annuity, false)),
                (ymd(2015, 3, 31), PaymentEvent::single(annuity, false)),
            ])
            .unwrap();
        assert_eq!(engine.current_date(), ymd(2015, 3, 31));

        let stuck = engine.process_payments(vec![(ymd(2015, 4, 28), PaymentEvent::single(annuity, false))]);
        assert!(matches!(stuck, Err(MortgageError::InvalidDate { .. })));
    }
}
