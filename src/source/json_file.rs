use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::fs;
use tokio::sync::OnceCell;
use tracing::warn;

use crate::models::{
    Collection, ExpenseRecord, Id, PaymentRecord, RepairRecord, SaleRecord, SkippedRecords,
    SourceSnapshot,
};

use super::{record_failure, PaymentLookup, RecordSource};

/// Snapshot exported from the data store as a single JSON document.
///
/// ```text
/// data/
///   snapshot.json   { "sales": [...], "repairs": [...], "expenses": [...],
///                     "payments": { "<repairId>": [...] } }
/// ```
///
/// The whole document is read at once, so all collections reflect the same
/// export. Records are decoded one by one: an invalid record is logged and
/// skipped, and a collection that is not a list fails without taking the
/// others down with it.
pub struct JsonFileSource {
    base_path: PathBuf,
    payments: OnceCell<PaymentIndex>,
}

#[derive(Debug, Default)]
struct PaymentIndex {
    by_repair: HashMap<Id, Vec<PaymentRecord>>,
    /// Repairs whose history held records that could not be decoded.
    invalid: HashMap<Id, usize>,
}

struct Decoded<T> {
    records: Vec<T>,
    skipped: usize,
}

impl JsonFileSource {
    pub const SNAPSHOT_FILE: &'static str = "snapshot.json";

    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            payments: OnceCell::new(),
        }
    }

    pub fn snapshot_file(&self) -> PathBuf {
        self.base_path.join(Self::SNAPSHOT_FILE)
    }

    async fn read_document(&self) -> Result<Value> {
        let path = self.snapshot_file();
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read snapshot file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON from {}", path.display()))
    }

    async fn read_collection<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>> {
        let document = self.read_document().await?;
        Ok(decode_collection(&document, collection)?.records)
    }

    async fn payments(&self) -> Result<&PaymentIndex> {
        self.payments
            .get_or_try_init(|| async {
                let document = self.read_document().await?;
                decode_payments(&document)
            })
            .await
    }
}

fn decode_records<T: DeserializeOwned>(items: &[Value], what: &str) -> Decoded<T> {
    let mut decoded = Decoded {
        records: Vec::with_capacity(items.len()),
        skipped: 0,
    };
    for (index, item) in items.iter().enumerate() {
        match serde_json::from_value::<T>(item.clone()) {
            Ok(record) => decoded.records.push(record),
            Err(e) => {
                let id = item.get("id").and_then(Value::as_str).unwrap_or("?");
                warn!(collection = what, index, id, error = %e, "skipping invalid record");
                decoded.skipped += 1;
            }
        }
    }
    decoded
}

fn decode_collection<T: DeserializeOwned>(
    document: &Value,
    collection: Collection,
) -> Result<Decoded<T>> {
    let key = collection.to_string();
    match document.get(&key) {
        None | Some(Value::Null) => Ok(Decoded {
            records: Vec::new(),
            skipped: 0,
        }),
        Some(Value::Array(items)) => Ok(decode_records(items, &key)),
        Some(_) => anyhow::bail!("Failed to decode {key}: expected a list of records"),
    }
}

fn decode_payments(document: &Value) -> Result<PaymentIndex> {
    let mut index = PaymentIndex::default();
    let histories = match document.get("payments") {
        None | Some(Value::Null) => return Ok(index),
        Some(Value::Object(histories)) => histories,
        Some(_) => anyhow::bail!("Failed to decode payments: expected an object keyed by repair id"),
    };

    for (repair_id, history) in histories {
        let repair_id = Id::from(repair_id.as_str());
        let decoded = match history {
            Value::Array(items) => decode_records::<PaymentRecord>(items, "payments"),
            _ => {
                warn!(repair = %repair_id, "payment history is not a list, skipping it");
                Decoded {
                    records: Vec::new(),
                    skipped: 1,
                }
            }
        };
        if decoded.skipped > 0 {
            index.invalid.insert(repair_id.clone(), decoded.skipped);
        }
        index.by_repair.insert(repair_id, decoded.records);
    }
    Ok(index)
}

/// Decode one collection into `snapshot`'s bookkeeping, returning its records.
fn take_collection<T: DeserializeOwned>(
    snapshot: &mut SourceSnapshot,
    document: &Value,
    collection: Collection,
) -> Vec<T> {
    match decode_collection(document, collection) {
        Ok(decoded) => {
            if decoded.skipped > 0 {
                snapshot.skipped.push(SkippedRecords {
                    collection,
                    count: decoded.skipped,
                });
            }
            decoded.records
        }
        Err(e) => {
            record_failure(snapshot, collection, &e);
            Vec::new()
        }
    }
}

#[async_trait::async_trait]
impl RecordSource for JsonFileSource {
    async fn list_sales(&self) -> Result<Vec<SaleRecord>> {
        self.read_collection(Collection::Sales).await
    }

    async fn list_repairs(&self) -> Result<Vec<RepairRecord>> {
        self.read_collection(Collection::Repairs).await
    }

    async fn list_expenses(&self) -> Result<Vec<ExpenseRecord>> {
        self.read_collection(Collection::Expenses).await
    }

    async fn snapshot(&self, taken_at: DateTime<Utc>) -> SourceSnapshot {
        let mut snapshot = SourceSnapshot::new(taken_at);
        let document = match self.read_document().await {
            Ok(document) => document,
            Err(e) => {
                for collection in [Collection::Sales, Collection::Repairs, Collection::Expenses] {
                    record_failure(&mut snapshot, collection, &e);
                }
                return snapshot;
            }
        };

        let sales = take_collection(&mut snapshot, &document, Collection::Sales);
        let repairs = take_collection(&mut snapshot, &document, Collection::Repairs);
        let expenses = take_collection(&mut snapshot, &document, Collection::Expenses);
        snapshot.sales = sales;
        snapshot.repairs = repairs;
        snapshot.expenses = expenses;
        snapshot
    }
}

#[async_trait::async_trait]
impl PaymentLookup for JsonFileSource {
    /// A repair whose stored history contains undecodable records fails
    /// its lookup; the valid records alone could hide its deposit.
    async fn payments_for_repair(&self, repair_id: &Id) -> Result<Vec<PaymentRecord>> {
        let index = self.payments().await?;
        if let Some(count) = index.invalid.get(repair_id) {
            anyhow::bail!("Payment history of repair {repair_id} has {count} invalid record(s)");
        }
        Ok(index
            .by_repair
            .get(repair_id)
            .cloned()
            .unwrap_or_default())
    }
}
