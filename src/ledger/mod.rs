//! Financial reconciliation core: normalization, windows, aggregation and KPIs.

pub mod aggregate;
pub mod consistency;
pub mod kpi;
pub mod normalize;
pub mod window;

pub use aggregate::{
    aggregate, aggregate_stats, by_category, by_counterparty, by_kind, by_month,
    by_payment_method, monthly_series, total, GroupStats, MonthKey, MonthlyPoint,
};
pub use consistency::{
    verify_kpis, verify_monthly_series, verify_partition, verify_signs, ConsistencyError,
};
pub use kpi::{
    compare_periods, compute_kpis, growth, profit_margin, top_categories, top_counterparties,
    KindTotals, KpiSet, PeriodComparison, RankedGroup,
};
pub use normalize::{
    normalize, normalize_with_settlements, resolve_deposit_settlements, DepositSettlement,
    LookupFailure, NormalizeOptions, Normalized, DEFAULT_EXPENSE_CATEGORY,
};
pub use window::{filter, CalendarEnd, TimeWindow, WeekStart, WindowPreset, WindowRules};

use crate::models::LedgerEntry;

/// Entries inside `window`, newest first. Ties are ordered by id so the
/// listing is stable across runs.
pub fn transaction_ledger(entries: &[LedgerEntry], window: &TimeWindow) -> Vec<LedgerEntry> {
    let mut rows = window.filter(entries);
    rows.sort_by(|a, b| {
        b.occurred_at
            .cmp(&a.occurred_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    rows
}
