//! Raw records as delivered by the workshop's data store.
//!
//! Field names follow the store's camelCase JSON. Money fields are lenient:
//! numbers, numeric strings and `null` are all accepted, and anything that
//! cannot be read as a decimal becomes `None` (treated as zero downstream).

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize};

use super::Id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    Completed,
    Pending,
    Cancelled,
    Refunded,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairStatus {
    Pending,
    #[serde(alias = "in-progress", alias = "inProgress")]
    InProgress,
    Completed,
    Delivered,
    Cancelled,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    Paid,
    Pending,
    Cancelled,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Deposit,
    Partial,
    #[serde(alias = "full", alias = "balance")]
    Final,
    Refund,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRecord {
    pub id: Id,
    #[serde(default)]
    pub client_id: Option<Id>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub total: Option<Decimal>,
    pub status: SaleStatus,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub payment_method: Option<String>,
}

impl SaleRecord {
    pub fn new(
        id: impl Into<Id>,
        total: Decimal,
        status: SaleStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            client_id: None,
            total: Some(total),
            status,
            created_at,
            payment_method: None,
        }
    }

    pub fn with_client(mut self, client_id: impl Into<Id>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_payment_method(mut self, method: impl Into<String>) -> Self {
        self.payment_method = Some(method.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairRecord {
    pub id: Id,
    #[serde(default)]
    pub client_id: Option<Id>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub total_price: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub deposit: Option<Decimal>,
    #[serde(default)]
    pub is_paid: Option<bool>,
    pub status: RepairStatus,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub payment_method: Option<String>,
}

impl RepairRecord {
    pub fn new(
        id: impl Into<Id>,
        total_price: Decimal,
        status: RepairStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            client_id: None,
            total_price: Some(total_price),
            deposit: None,
            is_paid: None,
            status,
            created_at,
            payment_method: None,
        }
    }

    pub fn with_client(mut self, client_id: impl Into<Id>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_deposit(mut self, deposit: Decimal) -> Self {
        self.deposit = Some(deposit);
        self
    }

    pub fn paid(mut self) -> Self {
        self.is_paid = Some(true);
        self
    }

    pub fn with_payment_method(mut self, method: impl Into<String>) -> Self {
        self.payment_method = Some(method.into());
        self
    }

    /// Deposit amount, if the repair carries a positive one.
    pub fn positive_deposit(&self) -> Option<Decimal> {
        self.deposit.filter(|d| *d > Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRecord {
    pub id: Id,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: Option<Decimal>,
    pub status: ExpenseStatus,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub expense_date: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
}

impl ExpenseRecord {
    pub fn new(
        id: impl Into<Id>,
        amount: Decimal,
        status: ExpenseStatus,
        expense_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            amount: Some(amount),
            status,
            expense_date,
            tags: Vec::new(),
            payment_method: None,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_payment_method(mut self, method: impl Into<String>) -> Self {
        self.payment_method = Some(method.into());
        self
    }
}

/// One entry of a repair's payment history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub payment_type: PaymentType,
    #[serde(default, deserialize_with = "lenient_timestamp_opt")]
    pub payment_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub payment_method: Option<String>,
}

impl PaymentRecord {
    pub fn new(payment_type: PaymentType, created_at: DateTime<Utc>) -> Self {
        Self {
            payment_type,
            payment_date: None,
            created_at,
            amount: None,
            payment_method: None,
        }
    }

    pub fn with_payment_date(mut self, date: DateTime<Utc>) -> Self {
        self.payment_date = Some(date);
        self
    }

    pub fn with_payment_method(mut self, method: impl Into<String>) -> Self {
        self.payment_method = Some(method.into());
        self
    }

    /// When the money actually changed hands.
    pub fn settled_at(&self) -> DateTime<Utc> {
        self.payment_date.unwrap_or(self.created_at)
    }
}

/// Largest magnitude accepted for a single source amount.
pub fn max_source_amount() -> Decimal {
    Decimal::from(1_000_000_000_000_000_i64)
}

/// Read a money value from a JSON number or numeric string. Returns `None`
/// for `null`, booleans, blanks, anything that does not parse and magnitudes
/// above [`max_source_amount`].
pub fn parse_lenient_amount(value: &serde_json::Value) -> Option<Decimal> {
    let raw = match value {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    if raw.is_empty() {
        return None;
    }
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .ok()
        .filter(|amount| amount.abs() <= max_source_amount())
}

fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    let parsed = value.as_ref().and_then(parse_lenient_amount);
    if parsed.is_none() {
        if let Some(raw) = value.filter(|v| !v.is_null()) {
            tracing::debug!(%raw, "unreadable amount coerced to zero");
        }
    }
    Ok(parsed)
}

/// Parse an RFC 3339 timestamp, a naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC),
/// or a bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_timestamp(&s).ok_or_else(|| de::Error::custom(format!("Invalid timestamp: {s}")))
}

fn lenient_timestamp_opt<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt {
        Some(s) if !s.trim().is_empty() => parse_timestamp(&s)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("Invalid timestamp: {s}"))),
        _ => Ok(None),
    }
}
