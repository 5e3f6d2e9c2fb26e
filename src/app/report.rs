use std::collections::BTreeMap;
use std::fmt::Display;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::ResolvedConfig;
use crate::format::{format_money, format_money_display, format_percent};
use crate::ledger::{
    aggregate, by_category, by_counterparty, by_kind, by_payment_method, compare_periods,
    compute_kpis, monthly_series, normalize, top_categories, top_counterparties, verify_kpis,
    verify_monthly_series, verify_partition, verify_signs, ConsistencyError, KpiSet,
    MonthlyPoint, PeriodComparison, RankedGroup, TimeWindow, WindowPreset,
};
use crate::models::{EntryKind, Id, LedgerEntry};
use crate::source::{PaymentLookup, RecordSource};

use super::types::{
    timestamp, ComparisonOutput, GroupOutput, KindTotalsOutput, KpiOutput, MonthlyOutput,
    RankedOutput, ReportOutput, WindowOutput,
};

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub window: WindowPreset,
    /// Include a comparison against the prior comparable window.
    pub compare: bool,
    pub top: usize,
    pub include_empty_months: bool,
}

impl ReportOptions {
    /// Options taken from `[reporting]`: trailing window, comparison on.
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self {
            window: WindowPreset::TrailingDays(config.reporting.trailing_days),
            compare: true,
            top: config.reporting.top,
            include_empty_months: config.reporting.include_empty_months,
        }
    }
}

/// Normalized entries for one report request, plus whatever went missing
/// while reading them.
#[derive(Debug, Clone)]
pub struct LoadedLedger {
    pub taken_at: DateTime<Utc>,
    pub entries: Vec<LedgerEntry>,
    pub degraded: bool,
    pub warnings: Vec<String>,
}

/// Snapshot `source` and normalize it, resolving deposits through `payments`.
///
/// Never fails: unreadable collections and failed lookups are reported as
/// warnings and flip `degraded`.
pub async fn load_ledger(
    source: &dyn RecordSource,
    payments: &dyn PaymentLookup,
    config: &ResolvedConfig,
    now: DateTime<Utc>,
) -> LoadedLedger {
    let snapshot = source.snapshot(now).await;
    debug!(
        sales = snapshot.sales.len(),
        repairs = snapshot.repairs.len(),
        expenses = snapshot.expenses.len(),
        "source snapshot taken"
    );

    let normalized = normalize(&snapshot, payments, &config.normalize_options()).await;

    let mut warnings: Vec<String> = snapshot
        .failures
        .iter()
        .map(|f| format!("Could not read {}: {}", f.collection, f.message))
        .collect();
    warnings.extend(
        snapshot
            .skipped
            .iter()
            .map(|s| format!("Skipped {} invalid {} record(s)", s.count, s.collection)),
    );
    warnings.extend(normalized.lookup_failures.iter().map(|f| {
        format!(
            "Deposit of repair {} left unsettled, payment history unavailable: {}",
            f.repair_id, f.reason
        )
    }));

    let mut degraded = snapshot.is_degraded() || normalized.is_degraded();
    if normalized.entries.is_empty() {
        warnings.push("No financial records available".to_string());
        degraded = true;
    }

    LoadedLedger {
        taken_at: snapshot.taken_at,
        entries: normalized.entries,
        degraded,
        warnings,
    }
}

/// Every figure of a report, before formatting.
#[derive(Debug, Clone)]
pub struct FinancialReport {
    pub generated_at: DateTime<Utc>,
    pub preset: WindowPreset,
    pub window: TimeWindow,
    pub kpis: KpiSet,
    pub comparison: Option<PeriodComparison>,
    pub monthly: Vec<MonthlyPoint>,
    pub by_category: BTreeMap<Option<String>, Decimal>,
    pub by_counterparty: BTreeMap<Option<Id>, Decimal>,
    pub by_payment_method: BTreeMap<Option<String>, Decimal>,
    pub by_kind: BTreeMap<EntryKind, Decimal>,
    pub top_counterparties: Vec<RankedGroup<Id>>,
    pub top_categories: Vec<RankedGroup<String>>,
    pub degraded: bool,
    pub warnings: Vec<String>,
}

/// Compute a report over the window chosen in `opts`.
///
/// Fails only when the computed tables disagree with each other; the error
/// then downcasts to [`ConsistencyError`].
pub async fn build_report(
    source: &dyn RecordSource,
    payments: &dyn PaymentLookup,
    config: &ResolvedConfig,
    clock: &dyn Clock,
    opts: &ReportOptions,
) -> Result<FinancialReport> {
    let now = clock.now();
    let rules = config.window_rules();
    let loaded = load_ledger(source, payments, config, now).await;

    let window = opts.window.resolve(now, &rules);
    let scoped = window.filter(&loaded.entries);

    let comparison = if opts.compare {
        opts.window
            .previous(now, &rules)
            .map(|prior| compare_periods(&loaded.entries, &window, &prior))
    } else {
        None
    };

    let report = FinancialReport {
        generated_at: now,
        preset: opts.window,
        window,
        kpis: compute_kpis(&loaded.entries, &window),
        comparison,
        monthly: monthly_series(&scoped, rules.tz, opts.include_empty_months),
        by_category: aggregate(&scoped, by_category),
        by_counterparty: aggregate(&scoped, by_counterparty),
        by_payment_method: aggregate(&scoped, by_payment_method),
        by_kind: aggregate(&scoped, by_kind),
        top_counterparties: top_counterparties(&scoped, opts.top),
        top_categories: top_categories(&scoped, opts.top),
        degraded: loaded.degraded,
        warnings: loaded.warnings,
    };

    verify_report(&loaded.entries, &report).context("Report failed its consistency checks")?;

    if report.degraded {
        warn!(warnings = report.warnings.len(), "report built from incomplete data");
    }
    info!(
        window = %opts.window,
        entries = scoped.len(),
        net_profit = %report.kpis.net_profit,
        "financial report built"
    );
    Ok(report)
}

/// Check that every table of `report` reconstructs the settled total of the
/// entries inside its window, and that the KPIs of both the current and the
/// prior window agree with their entries.
pub fn verify_report(entries: &[LedgerEntry], report: &FinancialReport) -> Result<(), ConsistencyError> {
    let scoped = report.window.filter(entries);
    verify_signs(&scoped)?;
    verify_partition("category", &scoped, &report.by_category)?;
    verify_partition("client", &scoped, &report.by_counterparty)?;
    verify_partition("payment method", &scoped, &report.by_payment_method)?;
    verify_partition("kind", &scoped, &report.by_kind)?;
    verify_monthly_series(&scoped, &report.monthly)?;
    verify_kpis(&scoped, &report.kpis)?;
    if let Some(comparison) = &report.comparison {
        let prior = comparison.prior_window.filter(entries);
        verify_signs(&prior)?;
        verify_kpis(&prior, &comparison.prior)?;
    }
    Ok(())
}

/// Build a report and render it for JSON output.
pub async fn financial_report(
    source: &dyn RecordSource,
    payments: &dyn PaymentLookup,
    config: &ResolvedConfig,
    clock: &dyn Clock,
    opts: &ReportOptions,
) -> Result<ReportOutput> {
    let report = build_report(source, payments, config, clock, opts).await?;
    Ok(render_report(&report, config))
}

pub fn render_report(report: &FinancialReport, config: &ResolvedConfig) -> ReportOutput {
    let dp = config.display.currency_decimals;

    ReportOutput {
        currency: config.reporting_currency.clone(),
        timezone: config.timezone.name().to_string(),
        generated_at: timestamp(report.generated_at),
        window: WindowOutput::new(report.preset.to_string(), &report.window),
        kpis: kpi_output(&report.kpis, config),
        comparison: report.comparison.as_ref().map(|c| ComparisonOutput {
            prior_window: WindowOutput::new("prior", &c.prior_window),
            prior: kpi_output(&c.prior, config),
            revenue_growth: format_percent(c.revenue_growth),
            expense_growth: format_percent(c.expense_growth),
            profit_growth: format_percent(c.profit_growth),
        }),
        monthly: report
            .monthly
            .iter()
            .map(|p| MonthlyOutput {
                month: p.month.to_string(),
                label: p.label.clone(),
                revenue: format_money(p.revenue, dp),
                expenses: format_money(p.expenses, dp),
                net: format_money(p.net, dp),
                entry_count: p.entry_count,
            })
            .collect(),
        by_category: group_rows(&report.by_category, "uncategorized", dp),
        by_client: group_rows(&report.by_counterparty, "unassigned", dp),
        by_payment_method: group_rows(&report.by_payment_method, "unspecified", dp),
        by_kind: report
            .by_kind
            .iter()
            .map(|(kind, total)| GroupOutput {
                key: kind.to_string(),
                total: format_money(*total, dp),
            })
            .collect(),
        top_clients: ranked_rows(&report.top_counterparties, dp),
        top_categories: ranked_rows(&report.top_categories, dp),
        degraded: report.degraded,
        warnings: report.warnings.clone(),
    }
}

fn kpi_output(kpis: &KpiSet, config: &ResolvedConfig) -> KpiOutput {
    let dp = config.display.currency_decimals;
    KpiOutput {
        total_revenue: format_money(kpis.total_revenue, dp),
        total_expenses: format_money(kpis.total_expenses, dp),
        net_profit: format_money(kpis.net_profit, dp),
        profit_margin: format_percent(kpis.profit_margin),
        outstanding_revenue: format_money(kpis.outstanding_revenue, dp),
        revenue_by_kind: KindTotalsOutput {
            sales: format_money(kpis.revenue_by_kind.sales, dp),
            repairs: format_money(kpis.revenue_by_kind.repairs, dp),
            deposits: format_money(kpis.revenue_by_kind.deposits, dp),
        },
        settled_count: kpis.settled_count,
        unsettled_count: kpis.unsettled_count,
        total_revenue_display: format_money_display(kpis.total_revenue, &config.display),
        total_expenses_display: format_money_display(kpis.total_expenses, &config.display),
        net_profit_display: format_money_display(kpis.net_profit, &config.display),
    }
}

fn group_rows<K: Display>(
    groups: &BTreeMap<Option<K>, Decimal>,
    missing_label: &str,
    dp: Option<u32>,
) -> Vec<GroupOutput> {
    groups
        .iter()
        .map(|(key, total)| GroupOutput {
            key: key
                .as_ref()
                .map(|k| k.to_string())
                .unwrap_or_else(|| missing_label.to_string()),
            total: format_money(*total, dp),
        })
        .collect()
}

fn ranked_rows<K: Display>(groups: &[RankedGroup<K>], dp: Option<u32>) -> Vec<RankedOutput> {
    groups
        .iter()
        .map(|g| RankedOutput {
            key: g.key.to_string(),
            total: format_money(g.total, dp),
            count: g.count,
            first_at: timestamp(g.first_at),
        })
        .collect()
}
