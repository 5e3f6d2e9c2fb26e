//! Grouped sums over settled entries.
//!
//! Every grouping returns a `BTreeMap`, so iteration order is the key's
//! `Ord`. For months that is [`MonthKey`], which orders by (year, month) and
//! never by its display label.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{EntryKind, Id, LedgerEntry};

/// Signed sum of the settled entries.
pub fn total<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> Decimal {
    entries
        .into_iter()
        .filter(|e| e.settled)
        .fold(Decimal::ZERO, |sum, e| sum.saturating_add(e.amount))
}

/// Running figures for one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupStats {
    pub total: Decimal,
    pub count: usize,
    /// Earliest `occurred_at` among the group's entries.
    pub first_at: DateTime<Utc>,
}

/// Group settled entries by `key_fn`, keeping totals, counts and first dates.
pub fn aggregate_stats<'a, K, F>(
    entries: impl IntoIterator<Item = &'a LedgerEntry>,
    key_fn: F,
) -> BTreeMap<K, GroupStats>
where
    K: Ord,
    F: Fn(&LedgerEntry) -> K,
{
    let mut groups: BTreeMap<K, GroupStats> = BTreeMap::new();
    for entry in entries.into_iter().filter(|e| e.settled) {
        groups
            .entry(key_fn(entry))
            .and_modify(|g| {
                g.total = g.total.saturating_add(entry.amount);
                g.count += 1;
                g.first_at = g.first_at.min(entry.occurred_at);
            })
            .or_insert(GroupStats {
                total: entry.amount,
                count: 1,
                first_at: entry.occurred_at,
            });
    }
    groups
}

/// Group settled entries by `key_fn` and sum their signed amounts.
pub fn aggregate<'a, K, F>(
    entries: impl IntoIterator<Item = &'a LedgerEntry>,
    key_fn: F,
) -> BTreeMap<K, Decimal>
where
    K: Ord,
    F: Fn(&LedgerEntry) -> K,
{
    aggregate_stats(entries, key_fn)
        .into_iter()
        .map(|(k, g)| (k, g.total))
        .collect()
}

/// Calendar month in a given time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn of(at: DateTime<Utc>, tz: Tz) -> Self {
        let local = at.with_timezone(&tz);
        Self::new(local.year(), local.month())
    }

    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).expect("valid date")
    }

    pub fn next(self) -> Self {
        if self.month == 12 {
            Self::new(self.year + 1, 1)
        } else {
            Self::new(self.year, self.month + 1)
        }
    }

    /// Display label such as `"Jan 2024"`. Not suitable for sorting.
    pub fn label(self) -> String {
        self.first_day().format("%b %Y").to_string()
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

pub fn by_month(tz: Tz) -> impl Fn(&LedgerEntry) -> MonthKey {
    move |e| MonthKey::of(e.occurred_at, tz)
}

/// Expense category; revenue entries fall in the `None` bucket.
pub fn by_category(entry: &LedgerEntry) -> Option<String> {
    entry.category.clone()
}

pub fn by_counterparty(entry: &LedgerEntry) -> Option<Id> {
    entry.counterparty_id.clone()
}

pub fn by_payment_method(entry: &LedgerEntry) -> Option<String> {
    entry.payment_method.clone()
}

pub fn by_kind(entry: &LedgerEntry) -> EntryKind {
    entry.kind
}

/// One month of the trend series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyPoint {
    pub month: MonthKey,
    pub label: String,
    pub revenue: Decimal,
    /// Positive magnitude.
    pub expenses: Decimal,
    pub net: Decimal,
    pub entry_count: usize,
}

impl MonthlyPoint {
    fn empty(month: MonthKey) -> Self {
        Self {
            month,
            label: month.label(),
            revenue: Decimal::ZERO,
            expenses: Decimal::ZERO,
            net: Decimal::ZERO,
            entry_count: 0,
        }
    }
}

/// Chronological revenue/expense/net series of settled entries.
///
/// With `include_empty`, months between the first and last populated month
/// that have no entries appear with zero figures.
pub fn monthly_series(entries: &[LedgerEntry], tz: Tz, include_empty: bool) -> Vec<MonthlyPoint> {
    let mut points: BTreeMap<MonthKey, MonthlyPoint> = BTreeMap::new();
    for entry in entries.iter().filter(|e| e.settled) {
        let month = MonthKey::of(entry.occurred_at, tz);
        let point = points
            .entry(month)
            .or_insert_with(|| MonthlyPoint::empty(month));
        if entry.is_revenue() {
            point.revenue = point.revenue.saturating_add(entry.amount);
        } else {
            point.expenses = point.expenses.saturating_sub(entry.amount);
        }
        point.net = point.net.saturating_add(entry.amount);
        point.entry_count += 1;
    }

    if include_empty {
        let bounds = points.keys().next().copied().zip(points.keys().next_back().copied());
        if let Some((first, last)) = bounds {
            let mut month = first;
            while month < last {
                points
                    .entry(month)
                    .or_insert_with(|| MonthlyPoint::empty(month));
                month = month.next();
            }
        }
    }

    points.into_values().collect()
}
