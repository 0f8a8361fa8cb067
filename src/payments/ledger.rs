use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;

use super::PaymentRecord;

/// processed periods keyed and ordered by due date
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Ledger {
    records: BTreeMap<NaiveDate, PaymentRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, due_date: NaiveDate) -> Option<&PaymentRecord> {
        self.records.get(&due_date)
    }

    /// insert a record, returning the one it replaced
    pub fn insert(&mut self, record: PaymentRecord) -> Option<PaymentRecord> {
        self.records.insert(record.due_date, record)
    }

    pub fn latest(&self) -> Option<&PaymentRecord> {
        self.records.values().next_back()
    }

    pub fn earliest(&self) -> Option<&PaymentRecord> {
        self.records.values().next()
    }

    /// latest record strictly before `date`
    pub fn latest_before(&self, date: NaiveDate) -> Option<&PaymentRecord> {
        self.records.range(..date).next_back().map(|(_, r)| r)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &PaymentRecord> {
        self.records.values()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.records.keys().copied()
    }

    /// records on or after `date`
    pub fn range_from(&self, date: NaiveDate) -> impl Iterator<Item = &PaymentRecord> {
        self.records.range(date..).map(|(_, r)| r)
    }

    /// remove and return every record on or after `date`, in date order
    pub fn remove_from(&mut self, date: NaiveDate) -> Vec<PaymentRecord> {
        let tail = self.records.split_off(&date);
        tail.into_values().collect()
    }

    pub fn carry_rest_at(&self, due_date: NaiveDate) -> Option<Money> {
        self.get(due_date).map(|r| r.carry_rest)
    }

    pub fn total_paid(&self) -> Money {
        self.iter().map(|r| r.total_paid()).sum()
    }

    pub fn total_interest(&self) -> Money {
        self.iter().map(|r| r.bank_interest).sum()
    }

    pub fn total_principal(&self) -> Money {
        self.iter().map(|r| r.principal_portion).sum()
    }

    pub fn total_overpayment(&self) -> Money {
        self.iter().map(|r| r.overpayment).sum()
    }

    pub fn total_profit(&self) -> Money {
        self.iter().map(|r| r.profit).sum()
    }
}

impl<'a> IntoIterator for &'a Ledger {
    type Item = &'a PaymentRecord;
    type IntoIter = std::collections::btree_map::Values<'a, NaiveDate, PaymentRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.values()
    }
}
