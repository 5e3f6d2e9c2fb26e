mod support;

use anyhow::Result;
use shopledger::app::{financial_report, ReportOptions};
use shopledger::clock::FixedClock;
use shopledger::ledger::WindowPreset;
use shopledger::models::{Collection, Id, SkippedRecords};
use shopledger::source::{JsonFileSource, PaymentLookup, RecordSource};
use support::{at, default_config};
use tempfile::TempDir;

const SNAPSHOT: &str = r#"{
    "sales": [
        {"id": "s1", "total": "100", "status": "completed", "createdAt": "2024-01-05T09:30:00Z"},
        {"id": "s2", "total": "40", "status": null, "createdAt": "2024-01-06"},
        {"id": "s3", "total": "25", "status": "completed", "createdAt": "last tuesday"},
        {"id": "s4", "total": "60", "status": "completed", "createdAt": "2024-01-07"}
    ],
    "repairs": [
        {"id": "r1", "totalPrice": 80, "deposit": 20, "isPaid": true,
         "status": "completed", "createdAt": "2024-01-08"},
        {"id": "r2", "totalPrice": 50, "deposit": 10, "isPaid": false,
         "status": "in_progress", "createdAt": "2024-01-09"}
    ],
    "expenses": [
        {"id": "e1", "amount": "30", "status": "paid", "expenseDate": "2024-01-10"},
        "not a record"
    ],
    "payments": {
        "r1": [
            {"paymentType": "deposit", "createdAt": "2024-01-02T10:00:00Z"}
        ],
        "r2": [
            {"paymentType": "deposit", "createdAt": "2024-01-03T10:00:00Z"},
            {"paymentType": "final", "createdAt": "not a date"}
        ]
    }
}"#;

fn write_snapshot(dir: &TempDir) -> Result<JsonFileSource> {
    std::fs::write(dir.path().join(JsonFileSource::SNAPSHOT_FILE), SNAPSHOT)?;
    Ok(JsonFileSource::new(dir.path()))
}

#[tokio::test]
async fn snapshot_skips_invalid_records() -> Result<()> {
    let dir = TempDir::new()?;
    let source = write_snapshot(&dir)?;

    let snapshot = source.snapshot(at(2024, 2, 1)).await;

    let sale_ids: Vec<&str> = snapshot.sales.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(sale_ids, vec!["s1", "s4"]);
    assert_eq!(snapshot.repairs.len(), 2);
    assert_eq!(snapshot.expenses.len(), 1);
    assert!(snapshot.failures.is_empty());
    assert_eq!(
        snapshot.skipped,
        vec![
            SkippedRecords {
                collection: Collection::Sales,
                count: 2,
            },
            SkippedRecords {
                collection: Collection::Expenses,
                count: 1,
            },
        ]
    );
    assert!(snapshot.is_degraded());
    Ok(())
}

#[tokio::test]
async fn list_sales_skips_invalid_records() -> Result<()> {
    let dir = TempDir::new()?;
    let source = write_snapshot(&dir)?;

    let sales = source.list_sales().await?;
    assert_eq!(sales.len(), 2);
    Ok(())
}

#[tokio::test]
async fn invalid_payment_only_fails_its_own_repair() -> Result<()> {
    let dir = TempDir::new()?;
    let source = write_snapshot(&dir)?;

    let r1 = source.payments_for_repair(&Id::from("r1")).await?;
    assert_eq!(r1.len(), 1);

    let err = source
        .payments_for_repair(&Id::from("r2"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("r2"));

    assert!(source
        .payments_for_repair(&Id::from("r3"))
        .await?
        .is_empty());
    Ok(())
}

#[tokio::test]
async fn report_keeps_valid_records_and_flags_skipped_ones() -> Result<()> {
    let dir = TempDir::new()?;
    let source = write_snapshot(&dir)?;
    let config = default_config()?;
    let clock = FixedClock::new(at(2024, 2, 1));
    let opts = ReportOptions {
        window: WindowPreset::AllTime,
        compare: false,
        top: 5,
        include_empty_months: false,
    };

    let output = financial_report(&source, &source, &config, &clock, &opts).await?;

    // s1 + s4 + r1 + r1's deposit; r2 is neither paid nor confirmed.
    assert_eq!(output.kpis.total_revenue, "260");
    assert_eq!(output.kpis.total_expenses, "30");
    assert!(output.degraded);
    assert!(output
        .warnings
        .iter()
        .any(|w| w == "Skipped 2 invalid sales record(s)"));
    assert!(output
        .warnings
        .iter()
        .any(|w| w.contains("Deposit of repair r2")));
    Ok(())
}
