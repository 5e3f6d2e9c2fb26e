mod config;
mod ledger;
mod report;
mod types;

pub use config::config_output;
pub use ledger::transaction_ledger_report;
pub use report::{
    build_report, financial_report, load_ledger, render_report, verify_report, FinancialReport,
    LoadedLedger, ReportOptions,
};
pub use types::{
    ComparisonOutput, GroupOutput, KindTotalsOutput, KpiOutput, LedgerOutput, LedgerRowOutput,
    MonthlyOutput, RankedOutput, ReportOutput, WindowOutput,
};
