//! In-memory record source, used by tests and by embedders that already hold the records.

use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::models::{
    ExpenseRecord, Id, PaymentRecord, RepairRecord, SaleRecord, SourceSnapshot,
};

use super::{PaymentLookup, RecordSource};

#[derive(Default)]
struct Collections {
    sales: Vec<SaleRecord>,
    repairs: Vec<RepairRecord>,
    expenses: Vec<ExpenseRecord>,
    payments: HashMap<Id, Vec<PaymentRecord>>,
}

/// All collections live behind one lock, so a snapshot never mixes states.
pub struct MemorySource {
    inner: Mutex<Collections>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Collections::default()),
        }
    }

    pub async fn add_sales(&self, sales: impl IntoIterator<Item = SaleRecord>) {
        self.inner.lock().await.sales.extend(sales);
    }

    pub async fn add_repairs(&self, repairs: impl IntoIterator<Item = RepairRecord>) {
        self.inner.lock().await.repairs.extend(repairs);
    }

    pub async fn add_expenses(&self, expenses: impl IntoIterator<Item = ExpenseRecord>) {
        self.inner.lock().await.expenses.extend(expenses);
    }

    pub async fn add_payment(&self, repair_id: &Id, payment: PaymentRecord) {
        self.inner
            .lock()
            .await
            .payments
            .entry(repair_id.clone())
            .or_default()
            .push(payment);
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RecordSource for MemorySource {
    async fn list_sales(&self) -> Result<Vec<SaleRecord>> {
        Ok(self.inner.lock().await.sales.clone())
    }

    async fn list_repairs(&self) -> Result<Vec<RepairRecord>> {
        Ok(self.inner.lock().await.repairs.clone())
    }

    async fn list_expenses(&self) -> Result<Vec<ExpenseRecord>> {
        Ok(self.inner.lock().await.expenses.clone())
    }

    async fn snapshot(&self, taken_at: DateTime<Utc>) -> SourceSnapshot {
        let guard = self.inner.lock().await;
        SourceSnapshot::new(taken_at)
            .with_sales(guard.sales.clone())
            .with_repairs(guard.repairs.clone())
            .with_expenses(guard.expenses.clone())
    }
}

#[async_trait::async_trait]
impl PaymentLookup for MemorySource {
    async fn payments_for_repair(&self, repair_id: &Id) -> Result<Vec<PaymentRecord>> {
        let guard = self.inner.lock().await;
        Ok(guard.payments.get(repair_id).cloned().unwrap_or_default())
    }
}
