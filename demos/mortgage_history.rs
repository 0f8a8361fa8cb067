/// mortgage history - replay a payment history, then plan an early repayment
use std::collections::BTreeMap;

use mortgage_history::chrono::NaiveDate;
use mortgage_history::{AmortizationEngine, Decimal, Money, PaymentEvent};

fn date(y: i32, m: u32, d: u32) -> Result<NaiveDate, Box<dyn std::error::Error>> {
    NaiveDate::from_ymd_opt(y, m, d).ok_or_else(|| format!("bad date {}-{}-{}", y, m, d).into())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    println!("=== mortgage history ===\n");

    let mut engine = AmortizationEngine::new(
        date(2013, 7, 3)?,
        Money::from_major(900_000),
        Decimal::new(145, 1),
        120,
    )?;
    println!("initial annuity: {}", engine.annuity());

    // two payers per month; months marked true re-derive the annuity
    let history = [
        ((2013, 8), 65_000, 0, true),
        ((2013, 9), 18_000, 0, true),
        ((2013, 10), 13_373, 0, false),
        ((2013, 11), 19_637, 0, true),
        ((2013, 12), 47_400, 10_000, true),
        ((2014, 1), 30_000, 40_000, true),
        ((2014, 2), 32_000, 10_000, true),
        ((2014, 3), 30_000, 50_000, true),
        ((2014, 4), 14_000, 10_000, true),
        ((2014, 5), 10_000, 0, false),
        ((2014, 6), 14_000, 11_000, true),
    ];

    let mut batch = BTreeMap::new();
    for ((y, m), first, second, recalc) in history {
        batch.insert(
            date(y, m, 3)?,
            PaymentEvent::new(vec![Money::from_major(first), Money::from_major(second)], recalc),
        );
    }
    engine.process_payments(batch)?;
    engine.process_payments([(
        date(2014, 7, 3)?,
        PaymentEvent::new(vec![Money::from_major(30_000), Money::ZERO], true),
    )])?;

    println!(
        "\n{:<12}{:>12}{:>12}{:>12}{:>14}{:>6}{:>10}{:>12}{:>12}",
        "date", "paid", "annuity", "interest", "balance", "n", "rest", "overpaid", "profit"
    );
    for record in engine.ledger() {
        println!(
            "{:<12}{:>12}{:>12}{:>12}{:>14}{:>6}{:>10}{:>12}{:>12}",
            record.due_date.to_string(),
            record.total_paid().to_string(),
            record.annuity.to_string(),
            record.bank_interest.to_string(),
            record.balance_after.to_string(),
            record.period_after,
            record.carry_rest.to_string(),
            record.overpayment.to_string(),
            record.profit.to_string(),
        );
    }

    let target = date(2015, 8, 3)?;
    let payment = engine.solve_repayment_payment_for_date(target)?;
    println!("\nto repay by {} pay {} monthly", target, payment);

    let repaid_on = engine.solve_repayment_date_for_payment(payment)?;
    println!("paying {} monthly repays on {}", payment, repaid_on);

    println!("current annuity: {}", engine.annuity());

    let progress = engine.progress();
    println!(
        "repaid {}%, by annuity alone {}%",
        progress.repaid_fraction * Decimal::ONE_HUNDRED,
        progress.scheduled_fraction * Decimal::ONE_HUNDRED
    );

    Ok(())
}
