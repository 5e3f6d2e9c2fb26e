#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use shopledger::config::{Config, ResolvedConfig};
use shopledger::models::{
    ExpenseRecord, ExpenseStatus, Id, PaymentRecord, PaymentType, RepairRecord, RepairStatus,
    SaleRecord, SaleStatus,
};
use shopledger::source::{MemorySource, PaymentLookup, RecordSource};

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

pub fn dec(value: &str) -> Decimal {
    value.parse().unwrap()
}

pub fn default_config() -> Result<ResolvedConfig> {
    ResolvedConfig::from_config(Config::default(), PathBuf::from("/tmp/shopledger-test"))
}

pub fn config_with(edit: impl FnOnce(&mut Config)) -> Result<ResolvedConfig> {
    let mut config = Config::default();
    edit(&mut config);
    ResolvedConfig::from_config(config, PathBuf::from("/tmp/shopledger-test"))
}

/// A small but complete month of workshop activity:
/// two sales, a paid repair with a confirmed deposit, an open repair with an
/// unconfirmed deposit, and three expenses.
pub async fn workshop_source() -> MemorySource {
    let source = MemorySource::new();
    source
        .add_sales([
            SaleRecord::new("sale-1", dec("100"), SaleStatus::Completed, at(2024, 1, 5))
                .with_client("client-a")
                .with_payment_method("card"),
            SaleRecord::new("sale-2", dec("45.50"), SaleStatus::Pending, at(2024, 1, 6))
                .with_client("client-b"),
        ])
        .await;
    source
        .add_repairs([
            RepairRecord::new("repair-1", dec("80"), RepairStatus::Completed, at(2024, 1, 8))
                .with_client("client-b")
                .with_deposit(dec("20"))
                .with_payment_method("cash")
                .paid(),
            RepairRecord::new("repair-2", dec("150"), RepairStatus::InProgress, at(2024, 1, 20))
                .with_client("client-c")
                .with_deposit(dec("50")),
        ])
        .await;
    source
        .add_expenses([
            ExpenseRecord::new("exp-1", dec("30"), ExpenseStatus::Paid, at(2024, 1, 10))
                .with_tags(["Rent"]),
            ExpenseRecord::new("exp-2", dec("12.25"), ExpenseStatus::Paid, at(2024, 1, 11))
                .with_tags(["Parts", "Screens"])
                .with_payment_method("card"),
            ExpenseRecord::new("exp-3", dec("99"), ExpenseStatus::Pending, at(2024, 1, 12)),
        ])
        .await;
    source
        .add_payment(
            &Id::from("repair-1"),
            PaymentRecord::new(PaymentType::Deposit, at(2024, 1, 3)).with_payment_method("card"),
        )
        .await;
    source
}

#[derive(Debug, Clone)]
pub enum LookupBehavior {
    Respond(Vec<PaymentRecord>),
    Fail(String),
    Delay(Duration, Vec<PaymentRecord>),
}

/// Payment lookup with scripted per-repair behavior. Tracks how many lookups
/// run at the same time.
#[derive(Debug, Default)]
pub struct ScriptedLookup {
    behaviors: HashMap<Id, LookupBehavior>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl ScriptedLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, repair_id: &str, behavior: LookupBehavior) -> Self {
        self.behaviors.insert(Id::from(repair_id), behavior);
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentLookup for ScriptedLookup {
    async fn payments_for_repair(&self, repair_id: &Id) -> Result<Vec<PaymentRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let result = match self.behaviors.get(repair_id).cloned() {
            None => Ok(Vec::new()),
            Some(LookupBehavior::Respond(payments)) => Ok(payments),
            Some(LookupBehavior::Fail(message)) => Err(anyhow::anyhow!(message)),
            Some(LookupBehavior::Delay(delay, payments)) => {
                tokio::time::sleep(delay).await;
                Ok(payments)
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Record source that reads through to a [`MemorySource`] but fails the
/// collections it is told to.
pub struct FailingSource {
    pub inner: MemorySource,
    pub fail_sales: bool,
    pub fail_repairs: bool,
    pub fail_expenses: bool,
}

impl FailingSource {
    pub fn new(inner: MemorySource) -> Self {
        Self {
            inner,
            fail_sales: false,
            fail_repairs: false,
            fail_expenses: false,
        }
    }
}

#[async_trait]
impl RecordSource for FailingSource {
    async fn list_sales(&self) -> Result<Vec<SaleRecord>> {
        if self.fail_sales {
            anyhow::bail!("sales store unreachable");
        }
        self.inner.list_sales().await
    }

    async fn list_repairs(&self) -> Result<Vec<RepairRecord>> {
        if self.fail_repairs {
            anyhow::bail!("repairs store unreachable");
        }
        self.inner.list_repairs().await
    }

    async fn list_expenses(&self) -> Result<Vec<ExpenseRecord>> {
        if self.fail_expenses {
            anyhow::bail!("expenses store unreachable");
        }
        self.inner.list_expenses().await
    }
}
