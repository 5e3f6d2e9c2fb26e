mod support;

use anyhow::Result;
use shopledger::app::{financial_report, ReportOptions};
use shopledger::clock::FixedClock;
use shopledger::ledger::WindowPreset;
use shopledger::models::{Collection, Id, PaymentType};
use shopledger::source::{JsonFileSource, PaymentLookup, RecordSource};
use support::{at, dec, default_config};
use tempfile::TempDir;

const SNAPSHOT: &str = r#"{
    "sales": [
        {"id": "s1", "clientId": "c1", "total": "120.50", "status": "completed",
         "createdAt": "2024-01-05T09:30:00Z", "paymentMethod": "card"},
        {"id": "s2", "total": null, "status": "completed", "createdAt": "2024-01-06"},
        {"id": "s3", "total": 15, "status": "voided", "createdAt": "2024-01-07"}
    ],
    "repairs": [
        {"id": "r1", "clientId": "c2", "totalPrice": 80, "deposit": "20", "isPaid": true,
         "status": "completed", "createdAt": "2024-01-08T14:00:00Z"}
    ],
    "expenses": [
        {"id": "e1", "amount": "30", "status": "paid", "expenseDate": "2024-01-10",
         "tags": ["  ", "Rent"]},
        {"id": "e2", "amount": "abc", "status": "paid", "expenseDate": "2024-01-11"}
    ],
    "payments": {
        "r1": [
            {"paymentType": "final", "createdAt": "2024-01-09T10:00:00Z"},
            {"paymentType": "deposit", "createdAt": "2024-01-02T10:00:00Z", "paymentMethod": "cash"}
        ]
    }
}"#;

fn write_snapshot(dir: &TempDir, content: &str) -> Result<()> {
    std::fs::write(dir.path().join(JsonFileSource::SNAPSHOT_FILE), content)?;
    Ok(())
}

#[tokio::test]
async fn reads_collections_leniently() -> Result<()> {
    let dir = TempDir::new()?;
    write_snapshot(&dir, SNAPSHOT)?;
    let source = JsonFileSource::new(dir.path());

    let snapshot = source.snapshot(at(2024, 2, 1)).await;
    assert!(!snapshot.is_degraded());
    assert_eq!(snapshot.sales.len(), 3);
    assert_eq!(snapshot.sales[0].total, Some(dec("120.50")));
    assert_eq!(snapshot.sales[1].total, None);
    assert_eq!(snapshot.repairs[0].deposit, Some(dec("20")));
    assert_eq!(snapshot.expenses[1].amount, None);
    Ok(())
}

#[tokio::test]
async fn payments_come_from_the_same_file() -> Result<()> {
    let dir = TempDir::new()?;
    write_snapshot(&dir, SNAPSHOT)?;
    let source = JsonFileSource::new(dir.path());

    let payments = source.payments_for_repair(&Id::from("r1")).await?;
    assert_eq!(payments.len(), 2);
    assert_eq!(payments[1].payment_type, PaymentType::Deposit);

    let none = source.payments_for_repair(&Id::from("r404")).await?;
    assert!(none.is_empty());
    Ok(())
}

#[tokio::test]
async fn malformed_collection_fails_alone() -> Result<()> {
    let dir = TempDir::new()?;
    write_snapshot(
        &dir,
        r#"{
            "sales": [{"id": "s1", "total": 10, "status": "completed", "createdAt": "2024-01-05"}],
            "repairs": "not a list",
            "expenses": []
        }"#,
    )?;
    let source = JsonFileSource::new(dir.path());

    let snapshot = source.snapshot(at(2024, 2, 1)).await;
    assert!(snapshot.is_degraded());
    assert_eq!(snapshot.failures.len(), 1);
    assert_eq!(snapshot.failures[0].collection, Collection::Repairs);
    assert_eq!(snapshot.sales.len(), 1);
    Ok(())
}

#[tokio::test]
async fn missing_file_gives_degraded_zero_report() -> Result<()> {
    let dir = TempDir::new()?;
    let source = JsonFileSource::new(dir.path());
    let config = default_config()?;
    let clock = FixedClock::new(at(2024, 2, 1));
    let opts = ReportOptions {
        window: WindowPreset::Month,
        compare: true,
        top: 5,
        include_empty_months: false,
    };

    let output = financial_report(&source, &source, &config, &clock, &opts).await?;

    assert!(output.degraded);
    assert_eq!(output.kpis.total_revenue, "0");
    assert_eq!(output.kpis.profit_margin, "0");
    assert_eq!(output.warnings.len(), 4);
    assert!(output.warnings[0].contains("sales"));
    Ok(())
}

#[tokio::test]
async fn report_from_snapshot_file() -> Result<()> {
    let dir = TempDir::new()?;
    write_snapshot(&dir, SNAPSHOT)?;
    let source = JsonFileSource::new(dir.path());
    let config = default_config()?;
    let clock = FixedClock::new(at(2024, 2, 1));
    let opts = ReportOptions {
        window: WindowPreset::AllTime,
        compare: false,
        top: 5,
        include_empty_months: false,
    };

    let output = financial_report(&source, &source, &config, &clock, &opts).await?;

    // 120.50 + 0 (null total) + 80 + 20 deposit; the "voided" sale is unsettled.
    assert_eq!(output.kpis.total_revenue, "220.5");
    assert_eq!(output.kpis.revenue_by_kind.deposits, "20");
    // Unparseable expense amount counts as zero.
    assert_eq!(output.kpis.total_expenses, "30");
    assert_eq!(output.kpis.net_profit, "190.5");
    assert!(!output.degraded);

    let rent = output.by_category.iter().find(|g| g.key == "Rent");
    assert_eq!(rent.map(|g| g.total.as_str()), Some("-30"));
    let cash = output.by_payment_method.iter().find(|g| g.key == "cash");
    assert_eq!(cash.map(|g| g.total.as_str()), Some("20"));
    assert_eq!(output.monthly.len(), 1);
    assert_eq!(output.monthly[0].month, "2024-01");
    assert_eq!(output.kpis.unsettled_count, 1);
    assert_eq!(output.kpis.outstanding_revenue, "15");
    Ok(())
}
