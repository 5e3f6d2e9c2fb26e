//! Headline figures derived from a ledger and a window.
//!
//! Every function here is total: empty input yields zeroed output,
//! percentages fall back to zero instead of dividing by zero, and sums
//! saturate at the `Decimal` bounds instead of overflowing.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{EntryKind, Id, LedgerEntry};

use super::aggregate::{aggregate_stats, by_counterparty, GroupStats};
use super::window::TimeWindow;

/// Settled revenue split by where it came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KindTotals {
    pub sales: Decimal,
    pub repairs: Decimal,
    pub deposits: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KpiSet {
    pub total_revenue: Decimal,
    /// Positive magnitude, although expense entries are stored negated.
    pub total_expenses: Decimal,
    pub net_profit: Decimal,
    /// Percent of revenue kept as profit; `0` when there is no revenue.
    pub profit_margin: Decimal,
    pub revenue_by_kind: KindTotals,
    pub settled_count: usize,
    pub unsettled_count: usize,
    /// Revenue recorded but not yet settled (receivables).
    pub outstanding_revenue: Decimal,
}

impl KpiSet {
    pub fn is_empty(&self) -> bool {
        self.settled_count == 0 && self.unsettled_count == 0
    }
}

pub fn compute_kpis(entries: &[LedgerEntry], window: &TimeWindow) -> KpiSet {
    let mut kpis = KpiSet::default();

    for entry in entries.iter().filter(|e| window.contains(e.occurred_at)) {
        if !entry.settled {
            kpis.unsettled_count += 1;
            if entry.is_revenue() {
                kpis.outstanding_revenue = kpis.outstanding_revenue.saturating_add(entry.amount);
            }
            continue;
        }

        kpis.settled_count += 1;
        let bucket = match entry.kind {
            EntryKind::Sale => &mut kpis.revenue_by_kind.sales,
            EntryKind::Repair => &mut kpis.revenue_by_kind.repairs,
            EntryKind::Deposit => &mut kpis.revenue_by_kind.deposits,
            EntryKind::Expense => {
                kpis.total_expenses = kpis.total_expenses.saturating_sub(entry.amount);
                continue;
            }
        };
        *bucket = bucket.saturating_add(entry.amount);
        kpis.total_revenue = kpis.total_revenue.saturating_add(entry.amount);
    }

    kpis.net_profit = kpis.total_revenue.saturating_sub(kpis.total_expenses);
    kpis.profit_margin = profit_margin(kpis.net_profit, kpis.total_revenue);
    kpis
}

pub fn profit_margin(net_profit: Decimal, revenue: Decimal) -> Decimal {
    percent_of(net_profit, revenue)
}

/// Percent change from `prior` to `current`; `0` when `prior` is zero.
///
/// Divides by `|prior|` so that a loss shrinking towards zero reads as
/// positive growth.
pub fn growth(current: Decimal, prior: Decimal) -> Decimal {
    percent_of(current.saturating_sub(prior), prior.abs())
}

fn percent_of(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        return Decimal::ZERO;
    }
    numerator
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|scaled| scaled.checked_div(denominator))
        .unwrap_or(Decimal::ZERO)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodComparison {
    pub current_window: TimeWindow,
    pub prior_window: TimeWindow,
    pub current: KpiSet,
    pub prior: KpiSet,
    pub revenue_growth: Decimal,
    pub expense_growth: Decimal,
    pub profit_growth: Decimal,
}

pub fn compare_periods(
    entries: &[LedgerEntry],
    current_window: &TimeWindow,
    prior_window: &TimeWindow,
) -> PeriodComparison {
    let current = compute_kpis(entries, current_window);
    let prior = compute_kpis(entries, prior_window);
    PeriodComparison {
        current_window: *current_window,
        prior_window: *prior_window,
        revenue_growth: growth(current.total_revenue, prior.total_revenue),
        expense_growth: growth(current.total_expenses, prior.total_expenses),
        profit_growth: growth(current.net_profit, prior.net_profit),
        current,
        prior,
    }
}

/// A group in a top-N ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedGroup<K> {
    pub key: K,
    pub total: Decimal,
    pub count: usize,
    pub first_at: DateTime<Utc>,
}

/// Clients ranked by settled revenue. Ties go to the earliest first transaction.
pub fn top_counterparties(entries: &[LedgerEntry], n: usize) -> Vec<RankedGroup<Id>> {
    let groups = aggregate_stats(entries.iter().filter(|e| e.is_revenue()), by_counterparty);
    rank(
        groups
            .into_iter()
            .filter_map(|(key, stats)| key.map(|k| (k, stats))),
        n,
    )
}

/// Expense categories ranked by settled spend (as positive magnitudes).
pub fn top_categories(entries: &[LedgerEntry], n: usize) -> Vec<RankedGroup<String>> {
    let groups = aggregate_stats(
        entries.iter().filter(|e| e.kind == EntryKind::Expense),
        |e| e.category.clone(),
    );
    rank(
        groups.into_iter().filter_map(|(key, stats)| {
            key.map(|k| {
                (
                    k,
                    GroupStats {
                        total: -stats.total,
                        ..stats
                    },
                )
            })
        }),
        n,
    )
}

fn rank<K: Ord>(groups: impl Iterator<Item = (K, GroupStats)>, n: usize) -> Vec<RankedGroup<K>> {
    let mut ranked: Vec<RankedGroup<K>> = groups
        .map(|(key, stats)| RankedGroup {
            key,
            total: stats.total,
            count: stats.count,
            first_at: stats.first_at,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.first_at.cmp(&b.first_at))
            .then_with(|| a.key.cmp(&b.key))
    });
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn client_sale(id: &str, client: &str, when: DateTime<Utc>, amount: i64) -> LedgerEntry {
        LedgerEntry::revenue(id, EntryKind::Sale, when, Decimal::from(amount), true)
            .with_counterparty(Some(Id::from(client)))
    }

    #[test]
    fn margin_and_growth_are_zero_for_zero_denominators() {
        assert_eq!(profit_margin(Decimal::from(-50), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(growth(Decimal::from(100), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(growth(Decimal::ZERO, Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn sums_saturate_instead_of_overflowing() {
        let entries = vec![
            LedgerEntry::revenue("s1", EntryKind::Sale, at(2024, 1, 2), Decimal::MAX, true),
            LedgerEntry::revenue("s2", EntryKind::Sale, at(2024, 1, 3), Decimal::MAX, true),
            LedgerEntry::expense("e1", at(2024, 1, 4), Decimal::MAX, true, "Rent"),
            LedgerEntry::expense("e2", at(2024, 1, 5), Decimal::MAX, true, "Rent"),
        ];

        let kpis = compute_kpis(&entries, &TimeWindow::ALL_TIME);

        assert_eq!(kpis.total_revenue, Decimal::MAX);
        assert_eq!(kpis.revenue_by_kind.sales, Decimal::MAX);
        assert_eq!(kpis.total_expenses, Decimal::MAX);
        assert_eq!(kpis.net_profit, Decimal::ZERO);
        assert_eq!(growth(Decimal::MAX, Decimal::MIN), Decimal::ZERO);
    }

    #[test]
    fn growth_is_relative_to_prior() {
        assert_eq!(growth(Decimal::from(150), Decimal::from(100)), Decimal::from(50));
        assert_eq!(growth(Decimal::from(50), Decimal::from(100)), Decimal::from(-50));
        // A loss of 100 shrinking to a loss of 50 is an improvement.
        assert_eq!(growth(Decimal::from(-50), Decimal::from(-100)), Decimal::from(50));
    }

    #[test]
    fn unsettled_revenue_is_outstanding() {
        let entries = vec![
            LedgerEntry::revenue("r1", EntryKind::Repair, at(2024, 1, 2), Decimal::from(50), false),
            LedgerEntry::expense("e1", at(2024, 1, 2), Decimal::from(9), false, "Parts"),
        ];
        let kpis = compute_kpis(&entries, &TimeWindow::ALL_TIME);
        assert_eq!(kpis.total_revenue, Decimal::ZERO);
        assert_eq!(kpis.outstanding_revenue, Decimal::from(50));
        assert_eq!(kpis.unsettled_count, 2);
        assert!(!kpis.is_empty());
    }

    #[test]
    fn revenue_is_split_by_kind() {
        let entries = vec![
            client_sale("s1", "c1", at(2024, 1, 2), 10),
            LedgerEntry::revenue("r1", EntryKind::Repair, at(2024, 1, 2), Decimal::from(80), true),
            LedgerEntry::revenue("r1-deposit", EntryKind::Deposit, at(2024, 1, 1), Decimal::from(20), true),
        ];
        let kpis = compute_kpis(&entries, &TimeWindow::ALL_TIME);
        assert_eq!(
            kpis.revenue_by_kind,
            KindTotals {
                sales: Decimal::from(10),
                repairs: Decimal::from(80),
                deposits: Decimal::from(20),
            }
        );
        assert_eq!(kpis.total_revenue, Decimal::from(110));
        assert_eq!(kpis.profit_margin, Decimal::from(100));
    }

    #[test]
    fn top_counterparties_break_ties_by_first_transaction() {
        let entries = vec![
            client_sale("s1", "late", at(2024, 3, 1), 100),
            client_sale("s2", "early", at(2024, 1, 1), 60),
            client_sale("s3", "early", at(2024, 4, 1), 40),
            client_sale("s4", "big", at(2024, 2, 1), 500),
            LedgerEntry::revenue("s5", EntryKind::Sale, at(2024, 2, 1), Decimal::from(900), true),
        ];
        let top = top_counterparties(&entries, 2);
        let keys: Vec<&str> = top.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["big", "early"]);
        assert_eq!(top[1].total, Decimal::from(100));
        assert_eq!(top[1].count, 2);
    }

    #[test]
    fn top_categories_rank_expense_magnitudes() {
        let entries = vec![
            LedgerEntry::expense("e1", at(2024, 1, 1), Decimal::from(30), true, "Rent"),
            LedgerEntry::expense("e2", at(2024, 1, 2), Decimal::from(45), true, "Parts"),
            LedgerEntry::expense("e3", at(2024, 1, 3), Decimal::from(500), false, "Tools"),
        ];
        let top = top_categories(&entries, 5);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].key, "Parts");
        assert_eq!(top[0].total, Decimal::from(45));
        assert_eq!(top[1].key, "Rent");
    }

    #[test]
    fn rankings_of_empty_input_are_empty() {
        assert!(top_counterparties(&[], 3).is_empty());
        assert!(top_categories(&[], 3).is_empty());
    }
}
