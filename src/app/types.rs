use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ledger::TimeWindow;

/// JSON output for the resolved report window. Absent ends are unbounded.
#[derive(Debug, Serialize)]
pub struct WindowOutput {
    pub preset: String,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl WindowOutput {
    pub fn new(preset: impl Into<String>, window: &TimeWindow) -> Self {
        Self {
            preset: preset.into(),
            start: window.start.map(timestamp),
            end: window.end.map(timestamp),
        }
    }
}

pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}

#[derive(Debug, Serialize)]
pub struct KindTotalsOutput {
    pub sales: String,
    pub repairs: String,
    pub deposits: String,
}

/// JSON output for a KPI set
#[derive(Debug, Serialize)]
pub struct KpiOutput {
    pub total_revenue: String,
    pub total_expenses: String,
    pub net_profit: String,
    /// Percent, two decimals.
    pub profit_margin: String,
    pub outstanding_revenue: String,
    pub revenue_by_kind: KindTotalsOutput,
    pub settled_count: usize,
    pub unsettled_count: usize,
    pub total_revenue_display: String,
    pub total_expenses_display: String,
    pub net_profit_display: String,
}

#[derive(Debug, Serialize)]
pub struct ComparisonOutput {
    pub prior_window: WindowOutput,
    pub prior: KpiOutput,
    pub revenue_growth: String,
    pub expense_growth: String,
    pub profit_growth: String,
}

#[derive(Debug, Serialize)]
pub struct MonthlyOutput {
    /// `YYYY-MM`, sortable.
    pub month: String,
    /// `Jan 2024`, for display only.
    pub label: String,
    pub revenue: String,
    pub expenses: String,
    pub net: String,
    pub entry_count: usize,
}

#[derive(Debug, Serialize)]
pub struct GroupOutput {
    pub key: String,
    pub total: String,
}

#[derive(Debug, Serialize)]
pub struct RankedOutput {
    pub key: String,
    pub total: String,
    pub count: usize,
    pub first_at: String,
}

/// JSON output for a full financial report
#[derive(Debug, Serialize)]
pub struct ReportOutput {
    pub currency: String,
    pub timezone: String,
    pub generated_at: String,
    pub window: WindowOutput,
    pub kpis: KpiOutput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonOutput>,
    pub monthly: Vec<MonthlyOutput>,
    pub by_category: Vec<GroupOutput>,
    pub by_client: Vec<GroupOutput>,
    pub by_payment_method: Vec<GroupOutput>,
    pub by_kind: Vec<GroupOutput>,
    pub top_clients: Vec<RankedOutput>,
    pub top_categories: Vec<RankedOutput>,
    pub degraded: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// JSON output for one ledger row
#[derive(Debug, Serialize)]
pub struct LedgerRowOutput {
    pub id: String,
    pub kind: String,
    pub occurred_at: String,
    pub amount: String,
    pub settled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
}

/// JSON output for the transaction ledger view
#[derive(Debug, Serialize)]
pub struct LedgerOutput {
    pub currency: String,
    pub timezone: String,
    pub window: WindowOutput,
    pub entry_count: usize,
    /// Signed sum of the settled rows.
    pub settled_total: String,
    pub entries: Vec<LedgerRowOutput>,
    pub degraded: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}
