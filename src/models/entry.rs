use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Sale,
    Repair,
    Deposit,
    Expense,
}

impl EntryKind {
    pub fn is_revenue(self) -> bool {
        !matches!(self, EntryKind::Expense)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Sale => "sale",
            EntryKind::Repair => "repair",
            EntryKind::Deposit => "deposit",
            EntryKind::Expense => "expense",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized financial event.
///
/// Revenue kinds carry non-negative amounts and expenses carry negated ones,
/// so the signed sum of settled entries is net profit. Use the constructors:
/// they enforce the sign from the kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Id,
    pub kind: EntryKind,
    pub occurred_at: DateTime<Utc>,
    pub amount: Decimal,
    pub settled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
}

impl LedgerEntry {
    /// Revenue entry (sale, repair or deposit). The magnitude of `amount` is used.
    pub fn revenue(
        id: impl Into<Id>,
        kind: EntryKind,
        occurred_at: DateTime<Utc>,
        amount: Decimal,
        settled: bool,
    ) -> Self {
        debug_assert!(kind.is_revenue());
        Self {
            id: id.into(),
            kind,
            occurred_at,
            amount: amount.abs(),
            settled,
            counterparty_id: None,
            category: None,
            payment_method: None,
        }
    }

    /// Expense entry. `amount` is the positive cost; it is stored negated.
    pub fn expense(
        id: impl Into<Id>,
        occurred_at: DateTime<Utc>,
        amount: Decimal,
        settled: bool,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: EntryKind::Expense,
            occurred_at,
            amount: -amount.abs(),
            settled,
            counterparty_id: None,
            category: Some(category.into()),
            payment_method: None,
        }
    }

    pub fn with_counterparty(mut self, counterparty_id: Option<Id>) -> Self {
        self.counterparty_id = counterparty_id;
        self
    }

    pub fn with_payment_method(mut self, method: Option<String>) -> Self {
        self.payment_method = method;
        self
    }

    pub fn is_revenue(&self) -> bool {
        self.kind.is_revenue()
    }

    /// True when the amount's sign matches the kind's polarity.
    pub fn has_valid_sign(&self) -> bool {
        if self.is_revenue() {
            self.amount >= Decimal::ZERO
        } else {
            self.amount <= Decimal::ZERO
        }
    }
}
