//! Where source records come from.
//!
//! A report reads sales, repairs and expenses through [`RecordSource`] and
//! the per-repair payment history through [`PaymentLookup`].

#[cfg(feature = "http")]
mod http;
mod json_file;
mod memory;

#[cfg(feature = "http")]
pub use http::HttpPaymentLookup;
pub use json_file::JsonFileSource;
pub use memory::MemorySource;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::models::{
    Collection, ExpenseRecord, Id, PaymentRecord, RepairRecord, SaleRecord, SourceFailure,
    SourceSnapshot,
};

/// Read access to the workshop's record collections.
#[async_trait::async_trait]
pub trait RecordSource: Send + Sync {
    async fn list_sales(&self) -> Result<Vec<SaleRecord>>;
    async fn list_repairs(&self) -> Result<Vec<RepairRecord>>;
    async fn list_expenses(&self) -> Result<Vec<ExpenseRecord>>;

    /// Read every collection for one report.
    ///
    /// The default reads the collections one after another, so a store that
    /// changes between reads can leak mixed points in time into the snapshot.
    /// Sources that can read atomically override this. A collection that
    /// fails to load is replaced by an empty one and recorded in
    /// [`SourceSnapshot::failures`].
    async fn snapshot(&self, taken_at: DateTime<Utc>) -> SourceSnapshot {
        let mut snapshot = SourceSnapshot::new(taken_at);
        match self.list_sales().await {
            Ok(sales) => snapshot.sales = sales,
            Err(e) => record_failure(&mut snapshot, Collection::Sales, &e),
        }
        match self.list_repairs().await {
            Ok(repairs) => snapshot.repairs = repairs,
            Err(e) => record_failure(&mut snapshot, Collection::Repairs, &e),
        }
        match self.list_expenses().await {
            Ok(expenses) => snapshot.expenses = expenses,
            Err(e) => record_failure(&mut snapshot, Collection::Expenses, &e),
        }
        snapshot
    }
}

/// Payment history of a single repair.
#[async_trait::async_trait]
pub trait PaymentLookup: Send + Sync {
    async fn payments_for_repair(&self, repair_id: &Id) -> Result<Vec<PaymentRecord>>;
}

pub(crate) fn record_failure(
    snapshot: &mut SourceSnapshot,
    collection: Collection,
    error: &anyhow::Error,
) {
    warn!(%collection, error = %format!("{error:#}"), "source collection unavailable, using empty set");
    snapshot.failures.push(SourceFailure {
        collection,
        message: format!("{error:#}"),
    });
}
