use anyhow::Result;
use tracing::info;

use crate::clock::Clock;
use crate::config::ResolvedConfig;
use crate::format::format_money;
use crate::ledger::{total, transaction_ledger, WindowPreset};
use crate::source::{PaymentLookup, RecordSource};

use super::report::load_ledger;
use super::types::{timestamp, LedgerOutput, LedgerRowOutput, WindowOutput};

/// Entries of one window, newest first, rendered for export.
pub async fn transaction_ledger_report(
    source: &dyn RecordSource,
    payments: &dyn PaymentLookup,
    config: &ResolvedConfig,
    clock: &dyn Clock,
    window: WindowPreset,
) -> Result<LedgerOutput> {
    let now = clock.now();
    let resolved = window.resolve(now, &config.window_rules());
    let loaded = load_ledger(source, payments, config, now).await;
    let rows = transaction_ledger(&loaded.entries, &resolved);
    let dp = config.display.currency_decimals;

    info!(window = %window, rows = rows.len(), "transaction ledger built");

    Ok(LedgerOutput {
        currency: config.reporting_currency.clone(),
        timezone: config.timezone.name().to_string(),
        window: WindowOutput::new(window.to_string(), &resolved),
        entry_count: rows.len(),
        settled_total: format_money(total(&rows), dp),
        entries: rows
            .into_iter()
            .map(|e| LedgerRowOutput {
                id: e.id.to_string(),
                kind: e.kind.to_string(),
                occurred_at: timestamp(e.occurred_at),
                amount: format_money(e.amount, dp),
                settled: e.settled,
                client_id: e.counterparty_id.map(|id| id.to_string()),
                category: e.category,
                payment_method: e.payment_method,
            })
            .collect(),
        degraded: loaded.degraded,
        warnings: loaded.warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::Config;
    use crate::ledger::TimeWindow;
    use crate::models::{ExpenseRecord, ExpenseStatus, SaleRecord, SaleStatus};
    use crate::source::MemorySource;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use std::path::PathBuf;

    #[tokio::test]
    async fn ledger_rows_are_newest_first_within_window() -> anyhow::Result<()> {
        let day = |d| Utc.with_ymd_and_hms(2024, 3, d, 9, 0, 0).unwrap();
        let source = MemorySource::new();
        source
            .add_sales([
                SaleRecord::new("s1", Decimal::from(40), SaleStatus::Completed, day(1)),
                SaleRecord::new("s2", Decimal::from(15), SaleStatus::Pending, day(4)),
            ])
            .await;
        source
            .add_expenses([ExpenseRecord::new(
                "e1",
                Decimal::new(1250, 2),
                ExpenseStatus::Paid,
                day(3),
            )])
            .await;

        let config = ResolvedConfig::from_config(Config::default(), PathBuf::from("/tmp"))?;
        let clock = FixedClock::new(day(5));
        let window = WindowPreset::Custom(TimeWindow::between(day(2), day(5)));
        let output = transaction_ledger_report(&source, &source, &config, &clock, window).await?;

        let ids: Vec<&str> = output.entries.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["s2", "e1"]);
        assert_eq!(output.entries[1].amount, "-12.5");
        assert_eq!(output.entries[1].category.as_deref(), Some("General"));
        assert_eq!(output.settled_total, "-12.5");
        assert!(!output.degraded);
        Ok(())
    }
}
