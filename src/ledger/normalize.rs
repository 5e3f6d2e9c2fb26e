//! Turns raw source records into [`LedgerEntry`] values.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

use crate::duration::format_duration;
use crate::models::{
    EntryKind, ExpenseRecord, ExpenseStatus, Id, LedgerEntry, PaymentRecord, PaymentType,
    RepairRecord, RepairStatus, SaleRecord, SaleStatus, SourceSnapshot,
};
use crate::source::PaymentLookup;

/// Bucket for expenses that carry no tag.
pub const DEFAULT_EXPENSE_CATEGORY: &str = "General";

#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    pub default_category: String,
    pub max_concurrent_lookups: usize,
    pub lookup_timeout: Duration,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            default_category: DEFAULT_EXPENSE_CATEGORY.to_string(),
            max_concurrent_lookups: 8,
            lookup_timeout: Duration::from_secs(5),
        }
    }
}

/// Outcome of looking up whether a repair's deposit was actually paid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepositSettlement {
    /// A deposit payment exists.
    Confirmed {
        at: DateTime<Utc>,
        payment_method: Option<String>,
    },
    /// The history was read and holds no deposit payment.
    Unconfirmed,
    /// The history could not be read (error or timeout).
    Unavailable { reason: String },
}

impl DepositSettlement {
    /// The earliest deposit-type payment confirms the deposit.
    pub fn from_payments(payments: &[PaymentRecord]) -> Self {
        payments
            .iter()
            .filter(|p| p.payment_type == PaymentType::Deposit)
            .min_by_key(|p| p.settled_at())
            .map(|p| DepositSettlement::Confirmed {
                at: p.settled_at(),
                payment_method: p.payment_method.clone(),
            })
            .unwrap_or(DepositSettlement::Unconfirmed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupFailure {
    pub repair_id: Id,
    pub reason: String,
}

/// Normalized entry set plus the lookups that had to fall back.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub entries: Vec<LedgerEntry>,
    pub lookup_failures: Vec<LookupFailure>,
}

impl Normalized {
    pub fn is_degraded(&self) -> bool {
        !self.lookup_failures.is_empty()
    }
}

/// Normalize a snapshot, resolving deposit settlements through `lookup`.
///
/// Lookups run concurrently (bounded by `max_concurrent_lookups`), each under
/// `lookup_timeout`. All of them finish, or fail, before entries are built.
pub async fn normalize(
    snapshot: &SourceSnapshot,
    lookup: &dyn PaymentLookup,
    options: &NormalizeOptions,
) -> Normalized {
    let settlements = resolve_deposit_settlements(&snapshot.repairs, lookup, options).await;

    let mut lookup_failures: Vec<LookupFailure> = settlements
        .iter()
        .filter_map(|(repair_id, s)| match s {
            DepositSettlement::Unavailable { reason } => Some(LookupFailure {
                repair_id: repair_id.clone(),
                reason: reason.clone(),
            }),
            _ => None,
        })
        .collect();
    lookup_failures.sort_by(|a, b| a.repair_id.cmp(&b.repair_id));

    Normalized {
        entries: normalize_with_settlements(snapshot, &settlements, options),
        lookup_failures,
    }
}

/// Look up the payment history of every repair that carries a deposit.
pub async fn resolve_deposit_settlements(
    repairs: &[RepairRecord],
    lookup: &dyn PaymentLookup,
    options: &NormalizeOptions,
) -> HashMap<Id, DepositSettlement> {
    let mut seen = HashSet::new();
    let repair_ids: Vec<Id> = repairs
        .iter()
        .filter(|r| r.positive_deposit().is_some())
        .filter(|r| seen.insert(r.id.clone()))
        .map(|r| r.id.clone())
        .collect();

    if repair_ids.is_empty() {
        return HashMap::new();
    }

    let timeout = options.lookup_timeout;
    debug!(
        lookups = repair_ids.len(),
        concurrency = options.max_concurrent_lookups,
        "resolving deposit settlements"
    );

    stream::iter(repair_ids)
        .map(|repair_id| async move {
            let settlement =
                match tokio::time::timeout(timeout, lookup.payments_for_repair(&repair_id)).await {
                    Ok(Ok(payments)) => DepositSettlement::from_payments(&payments),
                    Ok(Err(e)) => {
                        warn!(repair_id = %repair_id, error = %format!("{e:#}"), "payment lookup failed");
                        DepositSettlement::Unavailable {
                            reason: format!("{e:#}"),
                        }
                    }
                    Err(_) => {
                        warn!(repair_id = %repair_id, timeout = %format_duration(timeout), "payment lookup timed out");
                        DepositSettlement::Unavailable {
                            reason: format!("timed out after {}", format_duration(timeout)),
                        }
                    }
                };
            (repair_id, settlement)
        })
        .buffer_unordered(options.max_concurrent_lookups.max(1))
        .collect()
        .await
}

/// Build the entry list from a snapshot and already-resolved deposit settlements.
///
/// Order follows the snapshot: sales, then each repair followed by its
/// deposit, then expenses. Repairs missing from `settlements` get an
/// unsettled deposit dated at the repair's creation.
pub fn normalize_with_settlements(
    snapshot: &SourceSnapshot,
    settlements: &HashMap<Id, DepositSettlement>,
    options: &NormalizeOptions,
) -> Vec<LedgerEntry> {
    let mut entries =
        Vec::with_capacity(snapshot.sales.len() + snapshot.repairs.len() * 2 + snapshot.expenses.len());

    entries.extend(snapshot.sales.iter().map(sale_entry));
    for repair in &snapshot.repairs {
        entries.push(repair_entry(repair));
        if let Some(deposit) = repair.positive_deposit() {
            entries.push(deposit_entry(repair, deposit, settlements.get(&repair.id)));
        }
    }
    entries.extend(
        snapshot
            .expenses
            .iter()
            .map(|e| expense_entry(e, &options.default_category)),
    );

    let mut ids = HashSet::with_capacity(entries.len());
    for entry in &entries {
        if !ids.insert(&entry.id) {
            warn!(id = %entry.id, kind = %entry.kind, "duplicate ledger entry id");
        }
    }

    entries
}

/// Missing amounts count as zero; negative ones are data-entry errors and use their magnitude.
fn money(id: &Id, raw: Option<Decimal>) -> Decimal {
    let value = raw.unwrap_or(Decimal::ZERO);
    if value.is_sign_negative() && !value.is_zero() {
        warn!(id = %id, amount = %value, "negative source amount, using its magnitude");
    }
    value.abs()
}

fn sale_entry(sale: &SaleRecord) -> LedgerEntry {
    LedgerEntry::revenue(
        sale.id.clone(),
        EntryKind::Sale,
        sale.created_at,
        money(&sale.id, sale.total),
        sale.status == SaleStatus::Completed,
    )
    .with_counterparty(sale.client_id.clone())
    .with_payment_method(sale.payment_method.clone())
}

fn repair_entry(repair: &RepairRecord) -> LedgerEntry {
    let settled = repair.is_paid == Some(true) && repair.status == RepairStatus::Completed;
    LedgerEntry::revenue(
        repair.id.clone(),
        EntryKind::Repair,
        repair.created_at,
        money(&repair.id, repair.total_price),
        settled,
    )
    .with_counterparty(repair.client_id.clone())
    .with_payment_method(repair.payment_method.clone())
}

fn deposit_entry(
    repair: &RepairRecord,
    deposit: Decimal,
    settlement: Option<&DepositSettlement>,
) -> LedgerEntry {
    let (occurred_at, settled, payment_method) = match settlement {
        Some(DepositSettlement::Confirmed { at, payment_method }) => (
            *at,
            true,
            payment_method.clone().or_else(|| repair.payment_method.clone()),
        ),
        _ => (repair.created_at, false, repair.payment_method.clone()),
    };
    LedgerEntry::revenue(
        Id::deposit_of(&repair.id),
        EntryKind::Deposit,
        occurred_at,
        deposit,
        settled,
    )
    .with_counterparty(repair.client_id.clone())
    .with_payment_method(payment_method)
}

fn expense_entry(expense: &ExpenseRecord, default_category: &str) -> LedgerEntry {
    let category = expense
        .tags
        .iter()
        .map(|t| t.trim())
        .find(|t| !t.is_empty())
        .unwrap_or(default_category);
    LedgerEntry::expense(
        expense.id.clone(),
        expense.expense_date,
        money(&expense.id, expense.amount),
        expense.status == ExpenseStatus::Paid,
        category,
    )
    .with_payment_method(expense.payment_method.clone())
}
